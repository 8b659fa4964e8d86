#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-circuit-breaker** – per-integration circuit breaker.
//!
//! Persists through `gateway-store-core`'s compare-and-swap update, so
//! concurrent delivery attempts against the same integration never lose a
//! trip or a reset. Only infrastructure-class failures (5xx, 429, network)
//! count toward the trip threshold; 4xx, transform, and URL-validation
//! failures never do.

use chrono::Utc;
use gateway_store_core::IntegrationConfigStore;
use gateway_types::{CircuitBreakerState, IntegrationId};

/// Result of checking whether a delivery should proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitCheck {
    /// True if the delivery should be skipped.
    pub is_open: bool,
    /// The breaker's current state.
    pub state: CircuitBreakerState,
}

/// Whether a recorded failure is the infrastructure class that counts
/// toward tripping the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureClass {
    /// True for 5xx, 429, and network-class errors; false for 4xx,
    /// transform, and URL-validation failures.
    pub should_trip_circuit: bool,
}

/// Maximum attempts a CAS retry loop makes before giving up, guarding
/// against livelock under pathological contention.
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Circuit breaker over an [`IntegrationConfigStore`]-backed integration.
pub struct CircuitBreaker<'a, S: IntegrationConfigStore> {
    store: &'a S,
}

impl<'a, S: IntegrationConfigStore> CircuitBreaker<'a, S> {
    /// Wraps a store reference.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// `checkCircuitState(integrationId) → {isOpen, state, reason}`. A
    /// half-open transition (cool-down elapsed) is persisted as a side
    /// effect so only one probe is let through.
    pub async fn check(&self, integration_id: &IntegrationId) -> Result<CircuitCheck, gateway_store_core::StoreError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let versioned = self.store.get(integration_id).await?;
            let mut circuit = versioned.value.circuit.clone();
            let now = Utc::now();
            let was_open = circuit.state == CircuitBreakerState::Open;
            let should_skip = circuit.should_skip(now);

            if was_open && circuit.state == CircuitBreakerState::HalfOpen {
                match self.store.update_circuit_if(integration_id, versioned.version, circuit.clone()).await {
                    Ok(_) => return Ok(CircuitCheck { is_open: should_skip, state: circuit.state }),
                    Err(gateway_store_core::StoreError::VersionConflict { .. }) => continue,
                    Err(e) => return Err(e),
                }
            }
            return Ok(CircuitCheck { is_open: should_skip, state: circuit.state });
        }
        // Contended past the retry budget: report the circuit as open so a
        // concurrent writer's view wins and no delivery is attempted on a
        // stale read.
        Ok(CircuitCheck { is_open: true, state: CircuitBreakerState::Open })
    }

    /// `recordDeliverySuccess(integrationId)`. Resets the failure counter
    /// and closes the circuit.
    pub async fn record_success(&self, integration_id: &IntegrationId) -> Result<(), gateway_store_core::StoreError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let versioned = self.store.get(integration_id).await?;
            let mut circuit = versioned.value.circuit.clone();
            circuit.record_success();
            match self.store.update_circuit_if(integration_id, versioned.version, circuit).await {
                Ok(_) => return Ok(()),
                Err(gateway_store_core::StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// `recordDeliveryFailure(integrationId, {shouldTripCircuit})`. A
    /// no-op when `class.should_trip_circuit` is false.
    pub async fn record_failure(
        &self,
        integration_id: &IntegrationId,
        class: FailureClass,
        reason: &str,
    ) -> Result<(), gateway_store_core::StoreError> {
        if !class.should_trip_circuit {
            return Ok(());
        }
        for _ in 0..MAX_CAS_ATTEMPTS {
            let versioned = self.store.get(integration_id).await?;
            let mut circuit = versioned.value.circuit.clone();
            circuit.record_failure(Utc::now(), gateway_types::CircuitState::DEFAULT_FAILURE_THRESHOLD, reason);
            match self.store.update_circuit_if(integration_id, versioned.version, circuit).await {
                Ok(_) => return Ok(()),
                Err(gateway_store_core::StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
