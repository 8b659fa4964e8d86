use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached OAuth2/Custom token, owned by the [`crate::IntegrationConfig`] it
/// was fetched for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokenCache {
    /// The bearer token value.
    pub token: String,
    /// When the token stops being usable.
    pub expires_at: DateTime<Utc>,
    /// Refresh token, when the provider issued one.
    pub refresh_token: Option<String>,
    /// When this cache entry was last (re)fetched.
    pub last_fetched_at: DateTime<Utc>,
}

impl AuthTokenCache {
    /// Safety margin subtracted from `expires_at` before a cached token is
    /// considered usable, per the OAuth2 cache invariant in the spec.
    pub const EXPIRY_SAFETY_MARGIN: chrono::Duration = chrono::Duration::seconds(300);

    /// True iff `now < expires_at - 300s`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Self::EXPIRY_SAFETY_MARGIN
    }
}
