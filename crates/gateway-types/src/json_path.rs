//! Dot-path navigation over [`serde_json::Value`], the typed replacement for
//! the source's ad-hoc `lodash.get`/`lodash.set` usage.
//!
//! Two shapes are supported: a plain dot-path (`"a.b.c"`) addressing a
//! scalar field, and an array-prefixed path (`"items[].name"`) addressing
//! the same field across every element of an array.

use serde_json::Value;

/// A parsed dot-path, either scalar or array-prefixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    /// Plain `a.b.c` navigation.
    Scalar(Vec<String>),
    /// `items[].a.b` — an array segment followed by a per-element path.
    ArrayPrefixed {
        /// Path to the array itself.
        array_path: Vec<String>,
        /// Path applied to each element of the array.
        element_path: Vec<String>,
    },
}

/// Parses a dot-path string, recognizing a single `[]` array-prefix marker
/// anywhere in the segment list.
pub fn parse(path: &str) -> ParsedPath {
    let segments: Vec<&str> = path.split('.').collect();
    if let Some(array_idx) = segments.iter().position(|s| s.ends_with("[]")) {
        let array_path = segments[..=array_idx]
            .iter()
            .map(|s| s.trim_end_matches("[]").to_string())
            .collect();
        let element_path = segments[array_idx + 1..].iter().map(|s| s.to_string()).collect();
        ParsedPath::ArrayPrefixed { array_path, element_path }
    } else {
        ParsedPath::Scalar(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// True iff `path` is array-prefixed (contains a `[]` segment).
pub fn is_array_prefixed(path: &str) -> bool {
    matches!(parse(path), ParsedPath::ArrayPrefixed { .. })
}

fn get_scalar<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Resolves a scalar dot-path, returning `None` on any missing segment or
/// non-object intermediate.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    match parse(path) {
        ParsedPath::Scalar(segments) => get_scalar(value, &segments),
        ParsedPath::ArrayPrefixed { .. } => None,
    }
}

/// Resolves a scalar dot-path, falling back to `default` when unresolved.
pub fn get_or<'a>(value: &'a Value, path: &str, default: &'a Value) -> &'a Value {
    get(value, path).unwrap_or(default)
}

/// Resolves an array-prefixed path, returning one resolved value (or
/// `None`) per element of the addressed array. Returns `None` for the
/// whole call if `path` is not array-prefixed, or the array itself is
/// missing.
pub fn get_array<'a>(value: &'a Value, path: &str) -> Option<Vec<Option<&'a Value>>> {
    let ParsedPath::ArrayPrefixed { array_path, element_path } = parse(path) else {
        return None;
    };
    let array = get_scalar(value, &array_path)?.as_array()?;
    Some(array.iter().map(|el| get_scalar(el, &element_path)).collect())
}

fn ensure_object<'a>(value: &'a mut Value, segment: &str) -> &'a mut Value {
    if !value.is_object() {
        *value = Value::Object(Default::default());
    }
    value
        .as_object_mut()
        .expect("just ensured object")
        .entry(segment.to_string())
        .or_insert(Value::Null)
}

/// Writes `new_value` at a scalar dot-path, creating intermediate objects
/// as needed. Array-prefixed paths are not supported by this function; use
/// [`set_array`].
pub fn set(value: &mut Value, path: &str, new_value: Value) {
    let ParsedPath::Scalar(segments) = parse(path) else {
        return;
    };
    let Some((last, rest)) = segments.split_last() else {
        return;
    };
    let mut current = value;
    for segment in rest {
        current = ensure_object(current, segment);
    }
    if !current.is_object() {
        *current = Value::Object(Default::default());
    }
    current
        .as_object_mut()
        .expect("just ensured object")
        .insert(last.clone(), new_value);
}

/// Writes one value per element of an array-prefixed path; `values` must
/// have the same length as the addressed array, element-for-element.
pub fn set_array(value: &mut Value, path: &str, values: Vec<Value>) {
    let ParsedPath::ArrayPrefixed { array_path, element_path } = parse(path) else {
        return;
    };
    let Some((last_array_seg, array_rest)) = array_path.split_last() else {
        return;
    };
    let mut current = value;
    for segment in array_rest {
        current = ensure_object(current, segment);
    }
    let array_slot = ensure_object(current, last_array_seg);
    if !array_slot.is_array() {
        return;
    }
    let array = array_slot.as_array_mut().expect("just checked array");
    for (element, new_value) in array.iter_mut().zip(values) {
        if element_path.is_empty() {
            *element = new_value;
        } else {
            set(element, &element_path.join("."), new_value);
        }
    }
}

/// Depth of the deepest branch of a JSON value, used to enforce the
/// transformer's "result too deep" cap. A scalar has depth 1.
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        Value::Array(arr) => 1 + arr.iter().map(depth).max().unwrap_or(0),
        _ => 1,
    }
}
