use std::time::Duration;

use async_trait::async_trait;

/// Acknowledgement contract a source adapter hands to the pipeline for one
/// event, mirroring the `{ack, nack(delayMs)}` shape every adapter variant
/// implements its `handler` callback against.
#[async_trait]
pub trait EventContext: Send + Sync {
    /// Confirms the event was handled (terminally, including a benign
    /// skip) and may be removed from the source's redelivery queue.
    async fn ack(&self);

    /// Hands the event back to the source for redelivery after `delay`,
    /// used only on an uncaught pipeline error.
    async fn nack(&self, delay: Duration);
}

/// An [`EventContext`] that records which call it received, for tests.
#[derive(Debug, Default)]
pub struct RecordingContext {
    acked: std::sync::atomic::AtomicBool,
    nacked: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl EventContext for RecordingContext {
    async fn ack(&self) {
        self.acked.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    async fn nack(&self, _delay: Duration) {
        self.nacked.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl RecordingContext {
    /// True once `ack` has been called.
    pub fn was_acked(&self) -> bool {
        self.acked.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// True once `nack` has been called.
    pub fn was_nacked(&self) -> bool {
        self.nacked.load(std::sync::atomic::Ordering::SeqCst)
    }
}
