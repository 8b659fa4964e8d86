use sha2::{Digest, Sha256};

use crate::error::AdapterError;

/// Resolves a tenant's effective source config: explicit override preferred,
/// else the process-wide default, else `None` (no adapter runs for this
/// tenant).
pub fn resolve(explicit: Option<serde_json::Value>, default: Option<serde_json::Value>) -> Option<serde_json::Value> {
    explicit.or(default)
}

/// Parses a resolved `{type, sourceConfig}` JSON value into a
/// [`gateway_types::SourceConfig`].
pub fn parse(value: &serde_json::Value) -> Result<gateway_types::SourceConfig, AdapterError> {
    Ok(serde_json::from_value(value.clone())?)
}

/// Stable content hash of a resolved source config, used by the
/// reconciliation loop to detect changes without a structural diff.
pub fn hash(config: &gateway_types::SourceConfig) -> Result<String, AdapterError> {
    let canonical = serde_json::to_vec(config)?;
    let digest = Sha256::digest(&canonical);
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use gateway_types::{SourceConfig, StreamConsumerConfig};

    use super::*;

    #[test]
    fn explicit_override_wins_over_default() {
        let explicit = Some(serde_json::json!({"a": 1}));
        let default = Some(serde_json::json!({"a": 2}));
        assert_eq!(resolve(explicit.clone(), default), explicit);
    }

    #[test]
    fn falls_back_to_default_when_no_override() {
        let default = Some(serde_json::json!({"a": 2}));
        assert_eq!(resolve(None, default.clone()), default);
    }

    #[test]
    fn hash_is_stable_for_equal_configs_and_differs_on_change() {
        let a = SourceConfig::StreamConsumer(StreamConsumerConfig { topic: "orders".to_string(), consumer_group: "g1".to_string() });
        let b = SourceConfig::StreamConsumer(StreamConsumerConfig { topic: "orders".to_string(), consumer_group: "g2".to_string() });
        assert_eq!(hash(&a).unwrap(), hash(&a).unwrap());
        assert_ne!(hash(&a).unwrap(), hash(&b).unwrap());
    }
}
