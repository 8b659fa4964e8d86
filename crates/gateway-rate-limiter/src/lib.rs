#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-rate-limiter** – per-integration sliding/fixed window quota
//! check.
//!
//! A denied check results in a `RETRYING` delivery status with
//! `responseStatus=429`; the delivery is never attempted. Defaults to the
//! sliding-window algorithm for the per-integration check.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gateway_types::{IntegrationId, RateLimitConfig, TenantId};

/// Which windowing strategy a rate-limit check uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAlgorithm {
    /// Counts requests in a window that resets at a fixed boundary.
    Fixed,
    /// Counts requests in a rolling window anchored to the first request.
    Sliding,
}

/// Identifies the bucket a rate-limit check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// The integration being checked.
    pub integration_id: IntegrationId,
    /// Owning tenant, kept alongside the integration id for key stability
    /// even if an integration id were ever reused across tenants.
    pub tenant_id: TenantId,
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests remaining in the current window after this check.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: DateTime<Utc>,
    /// Seconds to wait before retrying, present only when denied.
    pub retry_after_seconds: Option<i64>,
}

struct Bucket {
    window_start: DateTime<Utc>,
    count: u32,
}

/// In-memory rate-limit storage, keyed per integration.
#[derive(Default)]
pub struct InMemoryRateLimitStorage {
    buckets: DashMap<RateLimitKey, Bucket>,
}

/// Storage backing a [`RateLimiter`]. An async trait so a future durable
/// backend (for multi-instance deployments) can be swapped in without
/// changing call sites.
#[async_trait]
pub trait RateLimitStorage: Send + Sync {
    /// Checks and, if allowed, increments the counter for `key` under
    /// `cfg`/`algorithm`, evaluated at `now`.
    async fn check_and_increment(
        &self,
        key: RateLimitKey,
        cfg: RateLimitConfig,
        algorithm: RateLimitAlgorithm,
        now: DateTime<Utc>,
    ) -> RateLimitResult;
}

#[async_trait]
impl RateLimitStorage for InMemoryRateLimitStorage {
    async fn check_and_increment(
        &self,
        key: RateLimitKey,
        cfg: RateLimitConfig,
        algorithm: RateLimitAlgorithm,
        now: DateTime<Utc>,
    ) -> RateLimitResult {
        let window = chrono::Duration::seconds(cfg.window_seconds as i64);
        let mut entry = self.buckets.entry(key).or_insert_with(|| Bucket { window_start: now, count: 0 });

        let window_expired = match algorithm {
            RateLimitAlgorithm::Fixed => now >= entry.window_start + window,
            RateLimitAlgorithm::Sliding => now - entry.window_start >= window,
        };
        if window_expired {
            entry.window_start = now;
            entry.count = 0;
        }

        let reset_at = entry.window_start + window;
        if entry.count >= cfg.max_requests {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_at,
                retry_after_seconds: Some((reset_at - now).num_seconds().max(0)),
            };
        }

        entry.count += 1;
        RateLimitResult {
            allowed: true,
            remaining: cfg.max_requests.saturating_sub(entry.count),
            reset_at,
            retry_after_seconds: None,
        }
    }
}

/// Per-integration rate limiter. Cheap to clone; shares the underlying
/// storage.
#[derive(Clone)]
pub struct RateLimiter<S: RateLimitStorage> {
    storage: Arc<S>,
}

impl<S: RateLimitStorage> RateLimiter<S> {
    /// Builds a limiter over the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Checks `integration_id`'s rate limit. Integrations without a
    /// configured limit, or with `enabled = false`, always pass.
    pub async fn check(
        &self,
        integration_id: IntegrationId,
        tenant_id: TenantId,
        cfg: Option<RateLimitConfig>,
    ) -> RateLimitResult {
        let Some(cfg) = cfg.filter(|c| c.enabled) else {
            return RateLimitResult { allowed: true, remaining: u32::MAX, reset_at: Utc::now(), retry_after_seconds: None };
        };
        self.storage
            .check_and_increment(RateLimitKey { integration_id, tenant_id }, cfg, RateLimitAlgorithm::Sliding, Utc::now())
            .await
    }
}

impl RateLimiter<InMemoryRateLimitStorage> {
    /// Convenience constructor over the in-memory storage implementation.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRateLimitStorage::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(max: u32, window_s: u32) -> RateLimitConfig {
        RateLimitConfig { enabled: true, max_requests: max, window_seconds: window_s }
    }

    #[tokio::test]
    async fn allows_up_to_the_limit_then_denies() {
        let limiter = RateLimiter::in_memory();
        let integration = IntegrationId::new();
        let tenant = TenantId::new();
        for _ in 0..3 {
            let r = limiter.check(integration, tenant, Some(cfg(3, 60))).await;
            assert!(r.allowed);
        }
        let denied = limiter.check(integration, tenant, Some(cfg(3, 60))).await;
        assert!(!denied.allowed);
        assert!(denied.retry_after_seconds.is_some());
    }

    #[tokio::test]
    async fn disabled_config_always_allows() {
        let limiter = RateLimiter::in_memory();
        let integration = IntegrationId::new();
        let tenant = TenantId::new();
        let mut disabled = cfg(1, 60);
        disabled.enabled = false;
        for _ in 0..5 {
            assert!(limiter.check(integration, tenant, Some(disabled)).await.allowed);
        }
    }

    #[tokio::test]
    async fn no_config_always_allows() {
        let limiter = RateLimiter::in_memory();
        assert!(limiter.check(IntegrationId::new(), TenantId::new(), None).await.allowed);
    }

    #[tokio::test]
    async fn window_reset_allows_again() {
        let storage = Arc::new(InMemoryRateLimitStorage::default());
        let key = RateLimitKey { integration_id: IntegrationId::new(), tenant_id: TenantId::new() };
        let c = cfg(1, 1);
        let t0 = Utc::now();
        let first = storage.check_and_increment(key, c, RateLimitAlgorithm::Sliding, t0).await;
        assert!(first.allowed);
        let still_denied = storage.check_and_increment(key, c, RateLimitAlgorithm::Sliding, t0).await;
        assert!(!still_denied.allowed);
        let after_window = storage.check_and_increment(key, c, RateLimitAlgorithm::Sliding, t0 + chrono::Duration::seconds(2)).await;
        assert!(after_window.allowed);
    }
}
