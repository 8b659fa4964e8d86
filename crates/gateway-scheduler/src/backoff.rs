use std::time::Duration;

use rand::Rng;

/// Deterministic half of `backoff(a) = min(240, 10·2^(a-1)) + jitter(0..2s)`,
/// in seconds. Split out from the jittered form so it's testable without a
/// random source.
pub fn base_seconds(attempt: u32) -> u64 {
    let attempt = attempt.max(1);
    let exp = 10u64.saturating_mul(1u64 << (attempt - 1).min(63));
    exp.min(240)
}

/// Full backoff duration for `attempt`, including up to 2s of jitter.
pub fn duration(attempt: u32) -> Duration {
    let base = base_seconds(attempt);
    let jitter_ms = rand::thread_rng().gen_range(0..2_000);
    Duration::from_secs(base) + Duration::from_millis(jitter_ms)
}
