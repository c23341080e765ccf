//! Error taxonomy for the transaction lifecycle.
//!
//! Every failure a user action can hit is one of the [`FlowError`] variants.
//! The Sequencer stores the copyable [`ErrorKind`] on the affected step so the
//! view layer can decide which actions to offer.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sequence::reducer::TransitionError;

/// Errors surfaced by preparation, wallet submission and receipt tracking.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Inputs are outside the supported domain (chain, token, amount).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The preparation backend asked us to slow down.
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Backend preparation or tracking outage.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// No wallet is connected or it cannot submit EVM transactions.
    #[error("Wallet incompatible: {0}")]
    WalletIncompatible(String),

    /// The wallet is on a different chain than the step targets.
    #[error("Wrong network: expected chain {expected}, wallet is on {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    /// The user declined the request inside the wallet.
    #[error("Transaction rejected in wallet")]
    UserRejected,

    /// The transaction was mined and reverted.
    #[error("Transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: TxHash },

    /// No receipt arrived before the deadline. The transaction may still land.
    #[error("No receipt for {tx_hash} before timeout")]
    ReceiptTimeout { tx_hash: TxHash },

    /// The requested state transition is not legal from the current stage.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The consumer of the sequence went away; results are discarded.
    #[error("Sequence abandoned by its consumer")]
    Abandoned,
}

const MALFORMED_PREPARE_RESPONSE: &str = "malformed prepare response";

impl FlowError {
    /// The backend answered, but the payload breaks the prepare contract.
    pub fn malformed_response(detail: impl std::fmt::Display) -> Self {
        FlowError::ServiceUnavailable(format!("{}: {}", MALFORMED_PREPARE_RESPONSE, detail))
    }

    /// Sending the same request again would get the same broken payload.
    pub fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            FlowError::ServiceUnavailable(reason) if reason.starts_with(MALFORMED_PREPARE_RESPONSE)
        )
    }

    /// Classification stored on step records.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Validation(_) => ErrorKind::Validation,
            FlowError::RateLimited { retry_after_secs } => ErrorKind::RateLimited {
                retry_after_secs: *retry_after_secs,
            },
            FlowError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            FlowError::WalletIncompatible(_) => ErrorKind::WalletIncompatible,
            FlowError::WrongNetwork { expected, actual } => ErrorKind::WrongNetwork {
                expected: *expected,
                actual: *actual,
            },
            FlowError::UserRejected => ErrorKind::UserRejected,
            FlowError::TransactionReverted { .. } => ErrorKind::TransactionReverted,
            FlowError::ReceiptTimeout { .. } => ErrorKind::ReceiptTimeout,
            FlowError::Transition(_) | FlowError::Abandoned => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same operation can succeed without new input.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Copyable error classification kept on a [`crate::sequence::StepRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    RateLimited { retry_after_secs: u64 },
    ServiceUnavailable,
    WalletIncompatible,
    WrongNetwork { expected: u64, actual: u64 },
    UserRejected,
    TransactionReverted,
    ReceiptTimeout,
    Internal,
}

impl ErrorKind {
    /// Retryable kinds. `WrongNetwork` counts: the user can retry after switching.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited { .. }
                | ErrorKind::ServiceUnavailable
                | ErrorKind::WrongNetwork { .. }
                | ErrorKind::UserRejected
                | ErrorKind::ReceiptTimeout
        )
    }

    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::RateLimited { .. } => "rate_limited",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::WalletIncompatible => "wallet_incompatible",
            ErrorKind::WrongNetwork { .. } => "wrong_network",
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::TransactionReverted => "transaction_reverted",
            ErrorKind::ReceiptTimeout => "receipt_timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Result type for orchestration operations.
pub type FlowResult<T> = Result<T, FlowError>;
