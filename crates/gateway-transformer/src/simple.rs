use chrono::DateTime;
use gateway_types::json_path;
use gateway_types::{SimpleMapping, StaticField, TransformKind};
use serde_json::Value;

use crate::error::TransformError;
use crate::lookup_provider::LookupProvider;

/// Applies SIMPLE-mode field mappings then static fields, in order.
/// `source` is read but never mutated; the output starts empty rather than
/// as a shallow copy, since mappings name every field they intend to carry
/// over explicitly.
pub fn apply_simple(
    mappings: &[SimpleMapping],
    static_fields: &[StaticField],
    source: &Value,
    lookups: &dyn LookupProvider,
) -> Result<Value, TransformError> {
    let mut out = Value::Object(Default::default());
    for mapping in mappings {
        let resolved = json_path::get(source, &mapping.source_field).cloned();
        let value = apply_kind(&mapping.transform, resolved, mapping, lookups)?;
        json_path::set(&mut out, &mapping.target_field, value);
    }
    for field in static_fields {
        json_path::set(&mut out, &field.key, field.value.clone());
    }
    Ok(out)
}

fn apply_kind(
    kind: &TransformKind,
    resolved: Option<Value>,
    mapping: &SimpleMapping,
    lookups: &dyn LookupProvider,
) -> Result<Value, TransformError> {
    match kind {
        TransformKind::Identity => Ok(resolved.unwrap_or(Value::Null)),
        TransformKind::Trim => Ok(match resolved {
            Some(Value::String(s)) => Value::String(s.trim().to_string()),
            other => other.unwrap_or(Value::Null),
        }),
        TransformKind::Upper => Ok(match resolved {
            Some(Value::String(s)) => Value::String(s.to_uppercase()),
            other => other.unwrap_or(Value::Null),
        }),
        TransformKind::Lower => Ok(match resolved {
            Some(Value::String(s)) => Value::String(s.to_lowercase()),
            other => other.unwrap_or(Value::Null),
        }),
        TransformKind::Date => match &resolved {
            Some(Value::String(s)) => parse_date(s)
                .map(Value::String)
                .ok_or_else(|| TransformError::TransformationError(format!("unparseable date: {s}"))),
            other => Ok(other.clone().unwrap_or(Value::Null)),
        },
        TransformKind::Default => Ok(resolved.unwrap_or_else(|| mapping.default_value.clone().unwrap_or(Value::Null))),
        TransformKind::Lookup => {
            let lookup_type = mapping.lookup_type.as_deref().unwrap_or_default();
            let key = resolved.clone().unwrap_or(Value::Null);
            Ok(lookups.resolve(lookup_type, &key).unwrap_or_else(|| resolved.unwrap_or(Value::Null)))
        }
    }
}

fn parse_date(input: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.to_rfc3339());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.to_rfc3339());
    }
    input.parse::<i64>().ok().and_then(|millis| {
        DateTime::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup_provider::{MapLookups, NoLookups};
    use serde_json::json;
    use std::collections::HashMap;

    fn mapping(source: &str, target: &str, kind: TransformKind) -> SimpleMapping {
        SimpleMapping {
            source_field: source.to_string(),
            target_field: target.to_string(),
            transform: kind,
            default_value: None,
            lookup_type: None,
        }
    }

    #[test]
    fn identity_copies_value() {
        let source = json!({"a": "x"});
        let out = apply_simple(&[mapping("a", "b", TransformKind::Identity)], &[], &source, &NoLookups).unwrap();
        assert_eq!(out, json!({"b": "x"}));
    }

    #[test]
    fn trim_strips_whitespace() {
        let source = json!({"a": "  x  "});
        let out = apply_simple(&[mapping("a", "b", TransformKind::Trim)], &[], &source, &NoLookups).unwrap();
        assert_eq!(out, json!({"b": "x"}));
    }

    #[test]
    fn default_falls_back_when_missing() {
        let source = json!({});
        let m = SimpleMapping {
            source_field: "missing".to_string(),
            target_field: "out".to_string(),
            transform: TransformKind::Default,
            default_value: Some(json!("fallback")),
            lookup_type: None,
        };
        let out = apply_simple(&[m], &[], &source, &NoLookups).unwrap();
        assert_eq!(out, json!({"out": "fallback"}));
    }

    #[test]
    fn lookup_falls_back_to_source_on_miss() {
        let source = json!({"code": "ZZ"});
        let m = SimpleMapping {
            source_field: "code".to_string(),
            target_field: "country".to_string(),
            transform: TransformKind::Lookup,
            default_value: None,
            lookup_type: Some("country_codes".to_string()),
        };
        let out = apply_simple(&[m], &[], &source, &NoLookups).unwrap();
        assert_eq!(out, json!({"country": "ZZ"}));
    }

    #[test]
    fn lookup_hit_overrides_source() {
        let source = json!({"code": "US"});
        let m = SimpleMapping {
            source_field: "code".to_string(),
            target_field: "country".to_string(),
            transform: TransformKind::Lookup,
            default_value: None,
            lookup_type: Some("country_codes".to_string()),
        };
        let mut table = HashMap::new();
        table.insert("US".to_string(), json!("United States"));
        let mut tables = HashMap::new();
        tables.insert("country_codes".to_string(), table);
        let lookups = MapLookups(tables);
        let out = apply_simple(&[m], &[], &source, &lookups).unwrap();
        assert_eq!(out, json!({"country": "United States"}));
    }

    #[test]
    fn static_fields_override_mapped_fields() {
        let source = json!({"a": "x"});
        let m = mapping("a", "b", TransformKind::Identity);
        let s = StaticField { key: "b".to_string(), value: json!("forced") };
        let out = apply_simple(&[m], &[s], &source, &NoLookups).unwrap();
        assert_eq!(out, json!({"b": "forced"}));
    }
}
