//! Shutdown coordination for running sequences.

use std::future::Future;
use tokio::sync::broadcast;

use crate::error::{FlowError, FlowResult};

/// Coordinator for abandoning in-flight sequences.
///
/// Provides a broadcast channel that every running sequence can subscribe to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. A no-op when nothing is running.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Await `fut`, or fail with [`FlowError::Abandoned`] if shutdown fires first.
    pub async fn abandon_on_shutdown<T, F>(&self, fut: F) -> FlowResult<T>
    where
        F: Future<Output = FlowResult<T>>,
    {
        let mut signal = self.subscribe();
        tokio::select! {
            result = fut => result,
            _ = signal.recv() => {
                tracing::warn!("Shutdown requested, abandoning sequence");
                Err(FlowError::Abandoned)
            }
        }
    }

    /// Number of sequences still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
