use serde_json::Value;

/// Resolves a value against a named lookup table. Lookup-table CRUD itself
/// is out of scope (see Non-goals); this trait is the seam a caller wires a
/// concrete table source behind.
pub trait LookupProvider: Send + Sync {
    /// Looks up `key` in `lookup_type`, returning `None` on a miss.
    fn resolve(&self, lookup_type: &str, key: &Value) -> Option<Value>;
}

/// A `LookupProvider` with no tables configured; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookups;

impl LookupProvider for NoLookups {
    fn resolve(&self, _lookup_type: &str, _key: &Value) -> Option<Value> {
        None
    }
}

/// An in-memory `LookupProvider` for tests: `lookup_type -> (key string -> value)`.
#[derive(Debug, Clone, Default)]
pub struct MapLookups(pub std::collections::HashMap<String, std::collections::HashMap<String, Value>>);

impl LookupProvider for MapLookups {
    fn resolve(&self, lookup_type: &str, key: &Value) -> Option<Value> {
        let table = self.0.get(lookup_type)?;
        let key_str = match key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        table.get(&key_str).cloned()
    }
}
