//! Pure state transitions for a [`Sequence`].
//!
//! # Transitions (current step only)
//! ```text
//! queued          --Dispatch-->        awaiting_wallet
//! awaiting_wallet --Submitted(hash)--> pending
//! awaiting_wallet --WalletFailed-->    failed
//! pending         --Receipt-->         confirmed | failed | timeout
//! failed|timeout  --Retry-->           queued
//! timeout         --Recheck-->         pending (same hash)
//! ```
//! `confirmed` on a non-last step moves `current_index` to the next step,
//! which is left `queued`.

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::blockchain::receipt::ReceiptOutcome;
use crate::error::ErrorKind;
use crate::sequence::step::{Sequence, Stage};

/// Inputs to [`reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Dispatch,
    Submitted(TxHash),
    WalletFailed(ErrorKind),
    Receipt(ReceiptOutcome),
    Retry,
    Recheck,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Dispatch => "dispatch",
            Event::Submitted(_) => "submitted",
            Event::WalletFailed(_) => "wallet_failed",
            Event::Receipt(_) => "receipt",
            Event::Retry => "retry",
            Event::Recheck => "recheck",
        }
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Sequence has no steps")]
    NoCurrentStep,

    #[error("Sequence is already complete")]
    SequenceComplete,

    #[error("Retry is not allowed while the step is {stage}")]
    RetryNotAllowed { stage: Stage },

    #[error("Cannot apply '{event}' while the step is {stage}")]
    InvalidTransition { event: &'static str, stage: Stage },
}

/// Apply `event` to the current step, returning the next sequence value.
pub fn reduce(sequence: &Sequence, event: Event) -> Result<Sequence, TransitionError> {
    if sequence.is_complete() {
        return Err(TransitionError::SequenceComplete);
    }

    let mut next = sequence.clone();
    let index = next.current_index;
    let last = next.steps.len().saturating_sub(1);
    let record = next
        .steps
        .get_mut(index)
        .ok_or(TransitionError::NoCurrentStep)?;
    let stage = record.stage;

    match (stage, event) {
        (Stage::Queued, Event::Dispatch) => {
            record.stage = Stage::AwaitingWallet;
            record.error = None;
        }
        (Stage::AwaitingWallet, Event::Submitted(hash)) => {
            record.stage = Stage::Pending;
            record.tx_hash = Some(hash);
        }
        (Stage::AwaitingWallet, Event::WalletFailed(kind)) => {
            record.stage = Stage::Failed;
            record.error = Some(kind);
        }
        (Stage::Pending, Event::Receipt(outcome)) => match outcome {
            ReceiptOutcome::Confirmed => {
                record.stage = Stage::Confirmed;
                record.error = None;
                if index < last {
                    next.current_index = index + 1;
                }
            }
            ReceiptOutcome::Failed => {
                record.stage = Stage::Failed;
                record.error = Some(ErrorKind::TransactionReverted);
            }
            ReceiptOutcome::Timeout => {
                record.stage = Stage::Timeout;
                record.error = Some(ErrorKind::ReceiptTimeout);
            }
        },
        (Stage::Failed | Stage::Timeout, Event::Retry) => {
            let hash = record.tx_hash.take();
            if stage == Stage::Timeout {
                record.superseded_hashes.extend(hash);
            }
            record.stage = Stage::Queued;
            record.error = None;
        }
        (Stage::Timeout, Event::Recheck) if record.tx_hash.is_some() => {
            record.stage = Stage::Pending;
            record.error = None;
        }
        (stage, Event::Retry) => return Err(TransitionError::RetryNotAllowed { stage }),
        (stage, event) => {
            return Err(TransitionError::InvalidTransition {
                event: event.name(),
                stage,
            })
        }
    }

    Ok(next)
}
