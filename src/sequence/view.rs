//! UI-facing projection of a [`Sequence`].

use serde::Serialize;

use crate::error::ErrorKind;
use crate::sequence::step::{Sequence, Stage};

pub const MAY_STILL_LAND: &str =
    "An earlier submission has not confirmed yet and may still land on-chain";

/// What a consumer renders for a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageView {
    pub stage: Stage,
    /// Short status label.
    pub label: &'static str,
    /// Backend step key of the current step.
    pub step: String,
    /// 1-based position of the current step.
    pub position: usize,
    pub total: usize,
    pub retry_enabled: bool,
    /// Chain to offer a network switch to.
    pub switch_network_to: Option<u64>,
    pub warning: Option<&'static str>,
    pub error: Option<ErrorKind>,
}

/// Derive the view for the current state.
pub fn describe(sequence: &Sequence) -> StageView {
    let stage = sequence.overall_stage();
    let total = sequence.steps.len();

    let Some(record) = sequence.current() else {
        return StageView {
            stage,
            label: stage_label(stage, None),
            step: String::new(),
            position: 0,
            total,
            retry_enabled: false,
            switch_network_to: None,
            warning: None,
            error: None,
        };
    };

    let switch_network_to = match record.error {
        Some(ErrorKind::WrongNetwork { expected, .. }) if stage == Stage::Failed => Some(expected),
        _ => None,
    };

    let warning = if stage == Stage::Timeout || !record.superseded_hashes.is_empty() {
        Some(MAY_STILL_LAND)
    } else {
        None
    };

    StageView {
        stage,
        label: stage_label(stage, record.error),
        step: record.step.label.clone(),
        position: sequence.current_index + 1,
        total,
        retry_enabled: stage.is_retryable(),
        switch_network_to,
        warning,
        error: record.error,
    }
}

/// Timed-out steps read as "Submitted": the transaction was sent and may confirm later.
pub fn stage_label(stage: Stage, error: Option<ErrorKind>) -> &'static str {
    match stage {
        Stage::Queued => "Ready",
        Stage::AwaitingWallet => "Confirm in wallet",
        Stage::Pending => "Pending",
        Stage::Confirmed => "Confirmed",
        Stage::Timeout => "Submitted",
        Stage::Failed => match error {
            Some(ErrorKind::UserRejected) => "Rejected",
            Some(ErrorKind::WrongNetwork { .. }) => "Wrong network",
            Some(ErrorKind::WalletIncompatible) => "Wallet not supported",
            Some(ErrorKind::TransactionReverted) => "Reverted",
            _ => "Failed",
        },
    }
}

impl std::fmt::Display for StageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} {}",
            self.position, self.total, self.step, self.label
        )?;
        if self.retry_enabled {
            f.write_str(" (retry available)")?;
        }
        if let Some(chain_id) = self.switch_network_to {
            write!(f, " (switch to chain {})", chain_id)?;
        }
        if let Some(warning) = self.warning {
            write!(f, " - {}", warning)?;
        }
        Ok(())
    }
}
