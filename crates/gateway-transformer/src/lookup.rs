use gateway_types::json_path;
use gateway_types::{Lookup, LookupArrayAgreement, UnmappedBehavior};
use serde_json::Value;

use crate::error::TransformError;
use crate::lookup_provider::LookupProvider;

/// Applies post-transform `lookups`, in order, mutating `value` in place.
pub fn apply_lookups(value: &mut Value, lookups: &[Lookup], provider: &dyn LookupProvider) -> Result<(), TransformError> {
    for lookup in lookups {
        apply_one(value, lookup, provider)?;
    }
    Ok(())
}

fn apply_one(value: &mut Value, lookup: &Lookup, provider: &dyn LookupProvider) -> Result<(), TransformError> {
    let source_is_array = json_path::is_array_prefixed(&lookup.source_field);
    let target_is_array = json_path::is_array_prefixed(&lookup.target_field);
    let declared_array = lookup.array_agreement == LookupArrayAgreement::Array;

    if source_is_array != target_is_array || source_is_array != declared_array {
        return Err(TransformError::LookupAgreementMismatch { lookup_type: lookup.lookup_type.clone() });
    }

    if declared_array {
        apply_array(value, lookup, provider)
    } else {
        apply_scalar(value, lookup, provider)
    }
}

fn resolve_or_unmapped(
    resolved: Option<&Value>,
    lookup: &Lookup,
    provider: &dyn LookupProvider,
) -> Result<Option<Value>, TransformError> {
    let Some(key) = resolved else {
        return apply_unmapped(lookup);
    };
    match provider.resolve(&lookup.lookup_type, key) {
        Some(v) => Ok(Some(v)),
        None => apply_unmapped(lookup),
    }
}

fn apply_unmapped(lookup: &Lookup) -> Result<Option<Value>, TransformError> {
    match &lookup.unmapped_behavior {
        UnmappedBehavior::Passthrough => Ok(None),
        UnmappedBehavior::Fail => Err(TransformError::LookupUnmapped { lookup_type: lookup.lookup_type.clone() }),
        UnmappedBehavior::Default { value } => Ok(Some(value.clone())),
    }
}

fn apply_scalar(value: &mut Value, lookup: &Lookup, provider: &dyn LookupProvider) -> Result<(), TransformError> {
    let resolved = json_path::get(value, &lookup.source_field).cloned();
    if let Some(out) = resolve_or_unmapped(resolved.as_ref(), lookup, provider)? {
        json_path::set(value, &lookup.target_field, out);
    }
    Ok(())
}

fn apply_array(value: &mut Value, lookup: &Lookup, provider: &dyn LookupProvider) -> Result<(), TransformError> {
    let Some(resolved) = json_path::get_array(value, &lookup.source_field) else {
        return Ok(());
    };
    let mut outputs = Vec::with_capacity(resolved.len());
    for element in resolved {
        match resolve_or_unmapped(element, lookup, provider)? {
            Some(v) => outputs.push(v),
            None => outputs.push(Value::Null),
        }
    }
    json_path::set_array(value, &lookup.target_field, outputs);
    Ok(())
}
