use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

/// Shared stop/join bookkeeping for an adapter's background loop. Every
/// adapter variant that runs its own task (table-poll, stream-consumer)
/// owns one of these; HTTP-push has no loop of its own and doesn't need it.
#[derive(Default)]
pub struct LoopControl {
    stop: Arc<Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LoopControl {
    /// A fresh, unstarted control.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the stop signal, to be awaited inside the spawned loop
    /// alongside its own interval tick.
    pub fn stop_signal(&self) -> Arc<Notify> {
        self.stop.clone()
    }

    /// Records the spawned loop's handle, replacing any previous one.
    pub async fn set_handle(&self, handle: JoinHandle<()>) {
        *self.handle.lock().await = Some(handle);
    }

    /// Signals the loop to stop and awaits its shutdown.
    pub async fn stop(&self) {
        self.stop.notify_waiters();
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}
