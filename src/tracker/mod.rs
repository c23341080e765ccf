//! Tracker adapter subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator::begin
//!     → Tracker::start_tracking (failure or timeout → NoopHandle)
//! Sequencer transitions
//!     → TrackingHandle hooks via `best_effort` (bounded by the hook timeout;
//!       errors logged + counted, never propagated)
//! Consumer after a reload
//!     → TrackingHandle::get_transaction → TrackedTransaction::display_stage
//! ```

pub mod http;
pub mod memory;
pub mod types;

use alloy::primitives::TxHash;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::observability::metrics;

pub use http::HttpTracker;
pub use memory::MemoryTracker;
pub use types::{TrackedTransaction, TrackerError, TrackerResult, TrackingContext, TrackingStatus};

/// Creates durable tracking records.
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn start_tracking(&self, context: &TrackingContext)
        -> TrackerResult<Box<dyn TrackingHandle>>;
}

/// Hooks for one tracking record.
#[async_trait]
pub trait TrackingHandle: Send + Sync {
    /// Identifier of the record on the tracking service.
    fn id(&self) -> &str;

    async fn add_tx_hash(&self, tx_hash: TxHash) -> TrackerResult<()>;
    async fn mark_submitted(&self) -> TrackerResult<()>;
    async fn mark_pending(&self) -> TrackerResult<()>;
    async fn mark_confirmed(&self) -> TrackerResult<()>;
    async fn mark_failed(&self, reason: &str) -> TrackerResult<()>;
    async fn get_transaction(&self) -> TrackerResult<TrackedTransaction>;
}

/// Tracker used when tracking is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

#[async_trait]
impl Tracker for NoopTracker {
    async fn start_tracking(
        &self,
        _context: &TrackingContext,
    ) -> TrackerResult<Box<dyn TrackingHandle>> {
        Ok(Box::new(NoopHandle))
    }
}

/// Handle that accepts every hook and stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandle;

#[async_trait]
impl TrackingHandle for NoopHandle {
    fn id(&self) -> &str {
        ""
    }

    async fn add_tx_hash(&self, _tx_hash: TxHash) -> TrackerResult<()> {
        Ok(())
    }

    async fn mark_submitted(&self) -> TrackerResult<()> {
        Ok(())
    }

    async fn mark_pending(&self) -> TrackerResult<()> {
        Ok(())
    }

    async fn mark_confirmed(&self) -> TrackerResult<()> {
        Ok(())
    }

    async fn mark_failed(&self, _reason: &str) -> TrackerResult<()> {
        Ok(())
    }

    async fn get_transaction(&self) -> TrackerResult<TrackedTransaction> {
        Err(TrackerError::Disabled)
    }
}

/// Hook bound used when none is configured.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_millis(1500);

/// Start tracking, falling back to [`NoopHandle`] when the tracker fails or
/// does not answer within `limit`.
pub async fn start_or_noop(
    tracker: &dyn Tracker,
    context: &TrackingContext,
    limit: Duration,
) -> Box<dyn TrackingHandle> {
    let started = match timeout(limit, tracker.start_tracking(context)).await {
        Ok(result) => result,
        Err(_) => Err(TrackerError::Timeout(limit)),
    };
    match started {
        Ok(handle) => {
            tracing::debug!(
                sequence_id = %context.sequence_id,
                tracking_id = handle.id(),
                "Tracking started"
            );
            handle
        }
        Err(e) => {
            metrics::record_tracker_failure("start_tracking");
            tracing::warn!(
                sequence_id = %context.sequence_id,
                error = %e,
                "Tracking unavailable, continuing untracked"
            );
            Box::new(NoopHandle)
        }
    }
}

/// Await a tracker hook for at most `limit`, swallowing its error.
///
/// A hook that outlives `limit` is dropped and counted as a failure.
pub async fn best_effort<F>(hook: &'static str, limit: Duration, call: F)
where
    F: Future<Output = TrackerResult<()>>,
{
    let result = match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(TrackerError::Timeout(limit)),
    };
    if let Err(e) = result {
        metrics::record_tracker_failure(hook);
        tracing::warn!(hook, error = %e, "Tracker hook failed");
    }
}
