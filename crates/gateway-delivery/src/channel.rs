use async_trait::async_trait;
use serde_json::Value;

/// Dispatches a transformed payload through a non-HTTP channel
/// (email/SMS/...). Provider-specific adapters (Gmail, Twilio, ...) are a
/// pluggable implementation behind this trait, same posture as the
/// source-adapter manager's stream-consumer seam; none ship here.
#[async_trait]
pub trait ChannelAdapterRegistry: Send + Sync {
    /// Sends `payload` over `channel`/`provider`. `provider_key` is the
    /// already-lowercased, prefix-stripped provider key (e.g. `GMAIL_OAUTH`
    /// → `gmail`); the registry looks up its adapter by that key.
    /// Returns the provider's message id on success.
    async fn send(&self, channel: &str, provider_key: &str, payload: &Value, adapter_config: &Value) -> Result<String, String>;
}

/// Derives the adapter-registry lookup key from a configured provider
/// string, e.g. `GMAIL_OAUTH` → `gmail`.
pub fn provider_key(provider: &str) -> String {
    provider.split('_').next().unwrap_or(provider).to_lowercase()
}

/// A registry with no adapters configured; every send fails. Useful as a
/// default when an integration's communication channels are untested.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChannelAdapters;

#[async_trait]
impl ChannelAdapterRegistry for NoChannelAdapters {
    async fn send(&self, channel: &str, provider_key: &str, _payload: &Value, _adapter_config: &Value) -> Result<String, String> {
        Err(format!("no adapter registered for channel={channel} provider={provider_key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_key_strips_suffix_and_lowercases() {
        assert_eq!(provider_key("GMAIL_OAUTH"), "gmail");
        assert_eq!(provider_key("TWILIO"), "twilio");
    }
}
