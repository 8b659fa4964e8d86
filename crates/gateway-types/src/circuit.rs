use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-integration circuit-breaker state machine: CLOSED ↔ OPEN ↔ HALF_OPEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    /// Deliveries proceed normally.
    Closed,
    /// Deliveries are skipped until the cool-down deadline passes.
    Open,
    /// Cool-down has elapsed; exactly one probe delivery is allowed through.
    HalfOpen,
}

/// Circuit state owned by an [`crate::IntegrationConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitState {
    /// Current breaker state.
    pub state: CircuitBreakerState,
    /// Consecutive infrastructure-class failures since the last success.
    pub consecutive_failures: u32,
    /// When the breaker last tripped open, if it is currently open.
    pub opened_at: Option<DateTime<Utc>>,
    /// Human-readable reason recorded at the last trip.
    pub reason: Option<String>,
    /// Cool-down deadline; the breaker may move to half-open once passed.
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            state: CircuitBreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            reason: None,
            cooldown_until: None,
        }
    }
}

impl CircuitState {
    /// Threshold of consecutive infrastructure failures before tripping open.
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

    /// Default cool-down duration once tripped.
    pub const DEFAULT_COOLDOWN: chrono::Duration = chrono::Duration::seconds(60);

    /// Records an infrastructure-class failure, tripping the breaker open if
    /// the consecutive-failure threshold is crossed. Returns true if this
    /// call caused the transition to `Open`.
    pub fn record_failure(&mut self, now: DateTime<Utc>, threshold: u32, reason: impl Into<String>) -> bool {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= threshold && self.state != CircuitBreakerState::Open {
            self.state = CircuitBreakerState::Open;
            self.opened_at = Some(now);
            self.reason = Some(reason.into());
            self.cooldown_until = Some(now + Self::DEFAULT_COOLDOWN);
            true
        } else {
            false
        }
    }

    /// Records a success: resets the counter and closes the circuit.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = CircuitBreakerState::Closed;
        self.opened_at = None;
        self.reason = None;
        self.cooldown_until = None;
    }

    /// True if a delivery should be skipped given `now`, unless force-delivered.
    ///
    /// Transitions `Open` to `HalfOpen` as a side effect once the cool-down
    /// has passed, allowing exactly one probe through.
    pub fn should_skip(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            CircuitBreakerState::Closed => false,
            CircuitBreakerState::HalfOpen => false,
            CircuitBreakerState::Open => {
                if self.cooldown_until.is_some_and(|deadline| now >= deadline) {
                    self.state = CircuitBreakerState::HalfOpen;
                    false
                } else {
                    true
                }
            }
        }
    }
}
