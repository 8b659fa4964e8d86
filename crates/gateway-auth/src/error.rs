/// Failures the auth builder can raise. Both variants map onto the
/// `AUTH_FAILED` / `AUTH_EXPIRED` error codes in the delivery taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Header construction failed outright (malformed config, encoding
    /// error).
    #[error("auth header construction failed: {0}")]
    Failed(String),
    /// A token-fetch call to an OAuth2/Custom endpoint failed.
    #[error("token fetch failed: {0}")]
    TokenFetch(String),
    /// `CUSTOM_HEADERS` declared an empty header name.
    #[error("custom header name must not be empty")]
    EmptyHeaderName,
}
