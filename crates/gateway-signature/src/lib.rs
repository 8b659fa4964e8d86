#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-signature** – HMAC-SHA256 payload signing with multi-secret
//! rotation.
//!
//! Produces the three headers attached to every signed delivery:
//! `X-Integration-Signature`, `X-Integration-Timestamp`, and
//! `X-Integration-ID`. The signed-content string and header format are a
//! bit-exact compatibility requirement — do not change the join characters
//! or header names without a compatibility review.

use base64::Engine;
use chrono::Utc;
use gateway_types::SigningSecret;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header name carrying the space-separated, head-first list of
/// `v1,<b64hmac>` signatures, one per active secret.
pub const SIGNATURE_HEADER: &str = "X-Integration-Signature";
/// Header name carrying the unix-seconds timestamp used in the signed
/// content string.
pub const TIMESTAMP_HEADER: &str = "X-Integration-Timestamp";
/// Header name carrying the per-delivery UUID v4 message id used in the
/// signed content string.
pub const MESSAGE_ID_HEADER: &str = "X-Integration-ID";

/// Tolerance applied by [`verify`] between the signed timestamp and now.
pub const TIMESTAMP_TOLERANCE_SECONDS: i64 = 300;

/// Generates a fresh signing secret, prefixed `whsec_` followed by
/// base64 of 32 random bytes.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("whsec_{}", base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// The three headers produced for one signed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value for [`SIGNATURE_HEADER`].
    pub signature: String,
    /// Value for [`TIMESTAMP_HEADER`].
    pub timestamp: String,
    /// Value for [`MESSAGE_ID_HEADER`].
    pub message_id: String,
}

fn hmac_b64(secret: &str, signed_content: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_content.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Builds the exact signed-content string `"{messageId}.{timestamp}.{payload}"`.
pub fn signed_content(message_id: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("{message_id}.{timestamp}.{}", String::from_utf8_lossy(payload))
}

/// Signs `payload` (the exact byte sequence about to be sent) with every
/// secret in `secrets`, head-first, producing the three headers to attach
/// to the outbound request.
///
/// `secrets` must be non-empty; callers should skip signing entirely (omit
/// all three headers) when an integration has none configured.
pub fn sign(secrets: &[SigningSecret], payload: &[u8]) -> SignedHeaders {
    let message_id = uuid::Uuid::new_v4().to_string();
    let timestamp = Utc::now().timestamp();
    let content = signed_content(&message_id, timestamp, payload);
    let signature = secrets
        .iter()
        .map(|s| format!("v1,{}", hmac_b64(&s.secret, &content)))
        .collect::<Vec<_>>()
        .join(" ");
    SignedHeaders { signature, timestamp: timestamp.to_string(), message_id }
}

/// Verifies a received signature header against `secrets`, returning true
/// iff at least one `v1,<hash>` entry matches at least one secret, via
/// constant-time comparison, and the timestamp is within
/// [`TIMESTAMP_TOLERANCE_SECONDS`] of now.
///
/// This is a documentation-target recipe for the receiving side; nothing
/// in the delivery pipeline calls it.
pub fn verify(signature_header: &str, timestamp_header: &str, message_id: &str, payload: &[u8], secrets: &[SigningSecret]) -> bool {
    let Ok(timestamp) = timestamp_header.parse::<i64>() else {
        return false;
    };
    if (Utc::now().timestamp() - timestamp).abs() > TIMESTAMP_TOLERANCE_SECONDS {
        return false;
    }
    let content = signed_content(message_id, timestamp, payload);
    let received: Vec<&str> = signature_header.split(' ').filter_map(|entry| entry.strip_prefix("v1,")).collect();

    secrets.iter().any(|secret| {
        let expected = hmac_b64(&secret.secret, &content);
        received.iter().any(|got| got.as_bytes().ct_eq(expected.as_bytes()).into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SigningSecret {
        SigningSecret { secret: value.to_string(), created_at: Utc::now() }
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let secrets = vec![secret("whsec_abc123")];
        let payload = br#"{"x":1}"#;
        let headers = sign(&secrets, payload);
        assert!(verify(&headers.signature, &headers.timestamp, &headers.message_id, payload, &secrets));
    }

    #[test]
    fn rotated_secret_still_verifies_with_old_key() {
        let old = secret("whsec_old");
        let new = secret("whsec_new");
        let payload = br#"{"x":1}"#;

        // Signed while `old` was still head-of-rotation.
        let headers = sign(&[old.clone()], payload);

        // Now the active list has rotated to put `new` first, `old` retained
        // for verification of still-in-flight signatures.
        let active = vec![new, old];
        assert!(verify(&headers.signature, &headers.timestamp, &headers.message_id, payload, &active));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let secrets = vec![secret("whsec_abc123")];
        let headers = sign(&secrets, br#"{"x":1}"#);
        assert!(!verify(&headers.signature, &headers.timestamp, &headers.message_id, br#"{"x":2}"#, &secrets));
    }

    #[test]
    fn stale_timestamp_fails_verification() {
        let secrets = vec![secret("whsec_abc123")];
        let payload = b"{}";
        let content = signed_content("msg-1", Utc::now().timestamp() - 10_000, payload);
        let sig = format!("v1,{}", hmac_b64("whsec_abc123", &content));
        let stale_ts = (Utc::now().timestamp() - 10_000).to_string();
        assert!(!verify(&sig, &stale_ts, "msg-1", payload, &secrets));
    }

    #[test]
    fn generated_secret_has_expected_prefix() {
        assert!(generate_secret().starts_with("whsec_"));
    }
}
