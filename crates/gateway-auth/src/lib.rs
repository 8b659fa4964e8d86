#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-auth** – produces the auth headers one delivery attempt sends.
//!
//! [`AuthKind::None`]/`ApiKey`/`Basic`/`Bearer`/`CustomHeaders` resolve to a
//! header set with no I/O. `OAuth1` signs the request in-process. `OAuth2`
//! and `Custom` fetch and cache a bearer token against a
//! [`reqwest::Client`], mirroring the token/validator split `gateway-types`
//! already models with [`AuthTokenCache`].

mod error;
mod oauth1;

pub use error::AuthError;

use chrono::Utc;
use gateway_types::{AuthBlock, AuthKind, AuthTokenCache, TokenExpiryMarker};
use std::time::Duration;

const TOKEN_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Headers to attach to a delivery request, and the token cache entry to
/// persist back onto the integration config, if a fetch happened.
#[derive(Debug, Clone, Default)]
pub struct BuiltAuth {
    /// Header name/value pairs to attach to the outgoing request.
    pub headers: Vec<(String, String)>,
    /// Set when a token was fetched (or refetched) this call; the caller
    /// persists this onto the integration's `cached_token` field.
    pub refreshed_token: Option<AuthTokenCache>,
}

/// Builds auth headers for one request, fetching and caching tokens as
/// needed.
pub struct AuthBuilder {
    client: reqwest::Client,
}

impl Default for AuthBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthBuilder {
    /// Builds a new auth builder with its own HTTP client for token
    /// fetches.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(TOKEN_FETCH_TIMEOUT)
                .build()
                .expect("reqwest client with a fixed timeout never fails to build"),
        }
    }

    /// Produces headers for `auth`, against `method`/`url`, consulting and
    /// possibly refreshing `cached_token`.
    pub async fn build(
        &self,
        auth: &AuthBlock,
        method: &str,
        url: &str,
        cached_token: Option<&AuthTokenCache>,
    ) -> Result<BuiltAuth, AuthError> {
        match &auth.kind {
            AuthKind::None => Ok(BuiltAuth::default()),
            AuthKind::ApiKey { header_name, api_key } => {
                Ok(BuiltAuth { headers: vec![(header_name.clone(), api_key.clone())], refreshed_token: None })
            }
            AuthKind::Basic { username, password } => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
                Ok(BuiltAuth { headers: vec![("Authorization".to_string(), format!("Basic {encoded}"))], refreshed_token: None })
            }
            AuthKind::Bearer { token } => {
                Ok(BuiltAuth { headers: vec![("Authorization".to_string(), format!("Bearer {token}"))], refreshed_token: None })
            }
            AuthKind::CustomHeaders { headers } => {
                for name in headers.keys() {
                    if name.trim().is_empty() {
                        return Err(AuthError::EmptyHeaderName);
                    }
                }
                Ok(BuiltAuth { headers: headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect(), refreshed_token: None })
            }
            AuthKind::OAuth1 { consumer_key, consumer_secret, token, token_secret } => {
                let params = oauth1::Oauth1Params {
                    consumer_key: consumer_key.clone(),
                    consumer_secret: consumer_secret.clone(),
                    token: token.clone(),
                    token_secret: token_secret.clone(),
                };
                let timestamp = Utc::now().timestamp();
                let nonce = oauth1::generate_nonce();
                let signed = oauth1::build_signed_params(&params, method, url, timestamp, &nonce);
                let header = oauth1::authorization_header(&signed);
                Ok(BuiltAuth { headers: vec![("Authorization".to_string(), header)], refreshed_token: None })
            }
            AuthKind::OAuth2 { token_url, client_id, client_secret, scope } => {
                let now = Utc::now();
                if let Some(cached) = cached_token {
                    if cached.is_usable(now) {
                        return Ok(BuiltAuth {
                            headers: vec![("Authorization".to_string(), format!("Bearer {}", cached.token))],
                            refreshed_token: None,
                        });
                    }
                }
                let token = self.fetch_oauth2_token(token_url, client_id, client_secret, scope.as_deref()).await?;
                Ok(BuiltAuth {
                    headers: vec![("Authorization".to_string(), format!("Bearer {}", token.token))],
                    refreshed_token: Some(token),
                })
            }
            AuthKind::Custom {
                token_url,
                method: fetch_method,
                body,
                token_response_path,
                token_expires_in_path,
                header_name,
                header_prefix,
            } => {
                let now = Utc::now();
                if let Some(cached) = cached_token {
                    if cached.is_usable(now) {
                        return Ok(BuiltAuth {
                            headers: vec![(header_name.clone(), format!("{header_prefix} {}", cached.token).trim().to_string())],
                            refreshed_token: None,
                        });
                    }
                }
                let token = self
                    .fetch_custom_token(token_url, fetch_method, body, token_response_path, token_expires_in_path.as_deref())
                    .await?;
                let value = format!("{header_prefix} {}", token.token).trim().to_string();
                Ok(BuiltAuth { headers: vec![(header_name.clone(), value)], refreshed_token: Some(token) })
            }
        }
    }

    async fn fetch_oauth2_token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        scope: Option<&str>,
    ) -> Result<AuthTokenCache, AuthError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }
        let response = self
            .client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::TokenFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::TokenFetch(format!("token endpoint returned {}", response.status())));
        }
        let body: serde_json::Value = response.json().await.map_err(|e| AuthError::TokenFetch(e.to_string()))?;
        let token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::TokenFetch("response missing access_token".to_string()))?
            .to_string();
        let expires_in = body.get("expires_in").and_then(|v| v.as_i64()).unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let refresh_token = body.get("refresh_token").and_then(|v| v.as_str()).map(str::to_string);
        let now = Utc::now();
        Ok(AuthTokenCache { token, expires_at: now + chrono::Duration::seconds(expires_in), refresh_token, last_fetched_at: now })
    }

    async fn fetch_custom_token(
        &self,
        token_url: &str,
        method: &str,
        body: &serde_json::Value,
        token_response_path: &str,
        token_expires_in_path: Option<&str>,
    ) -> Result<AuthTokenCache, AuthError> {
        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| AuthError::TokenFetch(e.to_string()))?;
        let response = self
            .client
            .request(method, token_url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::TokenFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::TokenFetch(format!("token endpoint returned {}", response.status())));
        }
        let response_body: serde_json::Value = response.json().await.map_err(|e| AuthError::TokenFetch(e.to_string()))?;
        let token = gateway_types::json_path::get(&response_body, token_response_path)
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::TokenFetch(format!("response missing token at {token_response_path}")))?
            .to_string();
        let expires_in = token_expires_in_path
            .and_then(|path| gateway_types::json_path::get(&response_body, path))
            .and_then(|v| v.as_i64())
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let now = Utc::now();
        Ok(AuthTokenCache { token, expires_at: now + chrono::Duration::seconds(expires_in), refresh_token: None, last_fetched_at: now })
    }
}

/// True iff a delivery response should invalidate a cached OAuth2/Custom
/// token: either the response carries a 401/403, or the response body
/// matches a configured [`TokenExpiryMarker`].
pub fn should_invalidate_cache(marker: Option<&TokenExpiryMarker>, status: u16, response_body: Option<&serde_json::Value>) -> bool {
    if status == 401 || status == 403 {
        return true;
    }
    let (Some(marker), Some(body)) = (marker, response_body) else {
        return false;
    };
    let Some(value) = gateway_types::json_path::get(body, &marker.response_body_path) else {
        return false;
    };
    let as_string = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    marker.expiration_values.iter().any(|expected| expected == &as_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::AuthBlock;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn block(kind: AuthKind) -> AuthBlock {
        AuthBlock { kind, expiry_marker: None }
    }

    #[tokio::test]
    async fn none_produces_no_headers() {
        let builder = AuthBuilder::new();
        let built = builder.build(&block(AuthKind::None), "POST", "https://example.com", None).await.unwrap();
        assert!(built.headers.is_empty());
    }

    #[tokio::test]
    async fn api_key_sets_configured_header() {
        let builder = AuthBuilder::new();
        let kind = AuthKind::ApiKey { header_name: "X-Api-Key".to_string(), api_key: "secret".to_string() };
        let built = builder.build(&block(kind), "POST", "https://example.com", None).await.unwrap();
        assert_eq!(built.headers, vec![("X-Api-Key".to_string(), "secret".to_string())]);
    }

    #[tokio::test]
    async fn basic_encodes_username_password() {
        let builder = AuthBuilder::new();
        let kind = AuthKind::Basic { username: "u".to_string(), password: "p".to_string() };
        let built = builder.build(&block(kind), "POST", "https://example.com", None).await.unwrap();
        assert_eq!(built.headers[0].0, "Authorization");
        assert!(built.headers[0].1.starts_with("Basic "));
    }

    #[tokio::test]
    async fn bearer_sends_static_token() {
        let builder = AuthBuilder::new();
        let kind = AuthKind::Bearer { token: "tok".to_string() };
        let built = builder.build(&block(kind), "POST", "https://example.com", None).await.unwrap();
        assert_eq!(built.headers, vec![("Authorization".to_string(), "Bearer tok".to_string())]);
    }

    #[tokio::test]
    async fn custom_headers_rejects_empty_name() {
        let builder = AuthBuilder::new();
        let mut headers = BTreeMap::new();
        headers.insert(String::new(), "x".to_string());
        let kind = AuthKind::CustomHeaders { headers };
        let err = builder.build(&block(kind), "POST", "https://example.com", None).await.unwrap_err();
        assert!(matches!(err, AuthError::EmptyHeaderName));
    }

    #[tokio::test]
    async fn oauth1_signs_without_network_access() {
        let builder = AuthBuilder::new();
        let kind = AuthKind::OAuth1 {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            token: Some("tok".to_string()),
            token_secret: Some("ts".to_string()),
        };
        let built = builder.build(&block(kind), "POST", "https://example.com/hook", None).await.unwrap();
        assert_eq!(built.headers.len(), 1);
        assert!(built.headers[0].1.starts_with("OAuth "));
        assert!(built.headers[0].1.contains("oauth_signature="));
    }

    #[tokio::test]
    async fn oauth2_reuses_unexpired_cached_token() {
        let builder = AuthBuilder::new();
        let kind = AuthKind::OAuth2 {
            token_url: "https://example.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scope: None,
        };
        let cache = AuthTokenCache {
            token: "cached-token".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(3600),
            refresh_token: None,
            last_fetched_at: Utc::now(),
        };
        let built = builder.build(&block(kind), "POST", "https://example.com", Some(&cache)).await.unwrap();
        assert_eq!(built.headers, vec![("Authorization".to_string(), "Bearer cached-token".to_string())]);
        assert!(built.refreshed_token.is_none());
    }

    #[test]
    fn invalidates_on_401_regardless_of_marker() {
        assert!(should_invalidate_cache(None, 401, None));
    }

    #[test]
    fn invalidates_on_marker_match_even_with_2xx() {
        let marker = TokenExpiryMarker { response_body_path: "error".to_string(), expiration_values: vec!["token_expired".to_string()] };
        let body = json!({"error": "token_expired"});
        assert!(should_invalidate_cache(Some(&marker), 200, Some(&body)));
    }

    #[test]
    fn does_not_invalidate_on_2xx_with_no_marker_match() {
        let marker = TokenExpiryMarker { response_body_path: "error".to_string(), expiration_values: vec!["token_expired".to_string()] };
        let body = json!({"status": "ok"});
        assert!(!should_invalidate_cache(Some(&marker), 200, Some(&body)));
    }
}
