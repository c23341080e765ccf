//! Step model: unsigned transactions and their per-sequence lifecycle records.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// Role of a step inside its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    /// Allowance/validation transaction that must be mined before the primary one.
    Approval,
    /// The business action itself.
    Primary,
}

impl StepRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepRole::Approval => "approval",
            StepRole::Primary => "primary",
        }
    }
}

/// One unsigned transaction. Immutable once prepared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub role: StepRole,
    /// Step key from the prepare response (e.g. "validation", "withdraw").
    pub label: String,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub chain_id: u64,
    /// Dispatch the next step as soon as this one is confirmed.
    pub requires_follow_up: bool,
}

/// Lifecycle stage of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    AwaitingWallet,
    Pending,
    Confirmed,
    Failed,
    Timeout,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Queued => "queued",
            Stage::AwaitingWallet => "awaiting_wallet",
            Stage::Pending => "pending",
            Stage::Confirmed => "confirmed",
            Stage::Failed => "failed",
            Stage::Timeout => "timeout",
        }
    }

    /// Waiting on the wallet or the chain.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Stage::AwaitingWallet | Stage::Pending)
    }

    /// Stages from which an explicit retry is accepted.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Stage::Failed | Stage::Timeout)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step plus its current lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub stage: Stage,
    pub tx_hash: Option<TxHash>,
    pub error: Option<ErrorKind>,
    /// Hashes of earlier submissions abandoned by a retry after timeout.
    pub superseded_hashes: Vec<TxHash>,
}

impl StepRecord {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            stage: Stage::Queued,
            tx_hash: None,
            error: None,
            superseded_hashes: Vec::new(),
        }
    }
}

/// Ordered steps for one user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub steps: Vec<StepRecord>,
    pub current_index: usize,
}

impl Sequence {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            id: Uuid::new_v4(),
            steps: steps.into_iter().map(StepRecord::new).collect(),
            current_index: 0,
        }
    }

    pub fn current(&self) -> Option<&StepRecord> {
        self.steps.get(self.current_index)
    }

    pub fn is_complete(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|r| r.stage == Stage::Confirmed)
    }

    /// Stage of the step in flight, or `Confirmed` once every step is.
    pub fn overall_stage(&self) -> Stage {
        if self.is_complete() {
            return Stage::Confirmed;
        }
        self.current().map(|r| r.stage).unwrap_or(Stage::Queued)
    }

    /// Number of steps currently awaiting the wallet or the chain.
    pub fn in_flight_count(&self) -> usize {
        self.steps.iter().filter(|r| r.stage.is_in_flight()).count()
    }

    /// All hashes ever recorded, in submission order.
    pub fn tx_hashes(&self) -> Vec<TxHash> {
        self.steps
            .iter()
            .flat_map(|r| r.superseded_hashes.iter().copied().chain(r.tx_hash))
            .collect()
    }
}
