use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AdapterError;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_$]*$").expect("static regex"));

/// Validates a table or column name before it is interpolated into SQL.
/// Rejects anything that doesn't look like a bare identifier, including
/// names containing backticks, quotes, or whitespace.
pub fn validate_identifier(name: &str) -> Result<(), AdapterError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(AdapterError::InvalidIdentifier(name.to_string()))
    }
}

/// Quotes an already-validated identifier with backticks for interpolation.
pub fn quote_identifier(name: &str) -> String {
    format!("`{name}`")
}
