//! In-process tracker backed by a concurrent map.

use alloy::primitives::TxHash;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::tracker::types::{
    TrackedTransaction, TrackerError, TrackerResult, TrackingContext, TrackingStatus,
};
use crate::tracker::{Tracker, TrackingHandle};

/// Keeps tracking records in memory, keyed by sequence id.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracker {
    records: Arc<DashMap<String, TrackedTransaction>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<TrackedTransaction> {
        self.records.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl Tracker for MemoryTracker {
    async fn start_tracking(
        &self,
        context: &TrackingContext,
    ) -> TrackerResult<Box<dyn TrackingHandle>> {
        let id = context.sequence_id.to_string();
        self.records
            .insert(id.clone(), TrackedTransaction::new(id.clone()));
        Ok(Box::new(MemoryHandle {
            records: self.records.clone(),
            id,
        }))
    }
}

struct MemoryHandle {
    records: Arc<DashMap<String, TrackedTransaction>>,
    id: String,
}

impl MemoryHandle {
    fn update(&self, f: impl FnOnce(&mut TrackedTransaction)) -> TrackerResult<()> {
        let mut record = self
            .records
            .get_mut(&self.id)
            .ok_or_else(|| TrackerError::NotFound(self.id.clone()))?;
        f(record.value_mut());
        Ok(())
    }

    fn set_status(&self, status: TrackingStatus) -> TrackerResult<()> {
        self.update(|r| r.status = status)
    }
}

#[async_trait]
impl TrackingHandle for MemoryHandle {
    fn id(&self) -> &str {
        &self.id
    }

    async fn add_tx_hash(&self, tx_hash: TxHash) -> TrackerResult<()> {
        self.update(|r| {
            if !r.tx_hashes.contains(&tx_hash) {
                r.tx_hashes.push(tx_hash);
            }
        })
    }

    async fn mark_submitted(&self) -> TrackerResult<()> {
        self.set_status(TrackingStatus::Submitted)
    }

    async fn mark_pending(&self) -> TrackerResult<()> {
        self.set_status(TrackingStatus::Pending)
    }

    async fn mark_confirmed(&self) -> TrackerResult<()> {
        self.update(|r| {
            r.status = TrackingStatus::Confirmed;
            r.failure_reason = None;
        })
    }

    async fn mark_failed(&self, reason: &str) -> TrackerResult<()> {
        self.update(|r| {
            r.status = TrackingStatus::Failed;
            r.failure_reason = Some(reason.to_string());
        })
    }

    async fn get_transaction(&self) -> TrackerResult<TrackedTransaction> {
        self.records
            .get(&self.id)
            .map(|r| r.value().clone())
            .ok_or_else(|| TrackerError::NotFound(self.id.clone()))
    }
}
