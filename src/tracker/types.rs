//! Tracker data types.

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::prepare::{Action, Domain};
use crate::sequence::step::Stage;

/// Describes the user action being tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingContext {
    pub sequence_id: Uuid,
    pub domain: Domain,
    pub action: Action,
    pub chain_id: u64,
    pub user_address: Address,
    pub token: String,
    pub amount: String,
    pub step_count: usize,
}

/// Durable status held by the tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Started,
    Submitted,
    /// Still unconfirmed after the receipt wait gave up.
    Pending,
    Confirmed,
    Failed,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Started => "started",
            TrackingStatus::Submitted => "submitted",
            TrackingStatus::Pending => "pending",
            TrackingStatus::Confirmed => "confirmed",
            TrackingStatus::Failed => "failed",
        }
    }
}

/// Record returned by `get_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTransaction {
    pub id: String,
    pub status: TrackingStatus,
    #[serde(default)]
    pub tx_hashes: Vec<TxHash>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl TrackedTransaction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TrackingStatus::Started,
            tx_hashes: Vec::new(),
            failure_reason: None,
        }
    }

    /// Stage to show when recovering a sequence from the tracker alone.
    pub fn display_stage(&self) -> Stage {
        match self.status {
            TrackingStatus::Started => Stage::Queued,
            TrackingStatus::Submitted => Stage::Pending,
            TrackingStatus::Pending => Stage::Timeout,
            TrackingStatus::Confirmed => Stage::Confirmed,
            TrackingStatus::Failed => Stage::Failed,
        }
    }

    /// Most recent submission, if any.
    pub fn latest_hash(&self) -> Option<TxHash> {
        self.tx_hashes.last().copied()
    }
}

/// Tracker-layer errors. Never surfaced to the user flow.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker request failed: {0}")]
    Transport(String),

    #[error("Tracker returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Tracking record {0} not found")]
    NotFound(String),

    #[error("Invalid tracker response: {0}")]
    Decode(String),

    #[error("Tracking is disabled")]
    Disabled,

    #[error("Tracker did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
