//! Async driver for one [`Sequence`].
//!
//! # Responsibilities
//! - Feed wallet and receipt results into the reducer, one step at a time
//! - Publish every new state on a `watch` channel
//! - Call the tracker hook matching each transition (best-effort, each call
//!   bounded by the hook timeout so a stalled tracker cannot hold a step)
//! - Dispatch a follow-up step only from the confirmed-transition path
//!
//! # Abandonment
//! Until the first [`Sequencer::subscribe`] the sequencer keeps its own
//! receiver and runs unobserved. Afterwards, once every receiver is dropped,
//! in-flight wallet or receipt results are discarded and every operation
//! returns [`FlowError::Abandoned`].

use alloy::primitives::TxHash;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::blockchain::receipt::{ReceiptOutcome, ReceiptWaiter};
use crate::error::{ErrorKind, FlowError, FlowResult};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::sequence::reducer::{reduce, Event, TransitionError};
use crate::sequence::step::{Sequence, Stage, Step};
use crate::sequence::view::{describe, StageView};
use crate::tracker::{
    best_effort, NoopHandle, TrackerResult, TrackingHandle, DEFAULT_HOOK_TIMEOUT,
};
use crate::wallet::WalletExecutor;

/// Drives a [`Sequence`] through the wallet and the chain.
pub struct Sequencer {
    sequence: Sequence,
    executor: WalletExecutor,
    waiter: ReceiptWaiter,
    receipt_timeout: Duration,
    tracker: Box<dyn TrackingHandle>,
    hook_timeout: Duration,
    state_tx: watch::Sender<Sequence>,
    /// Held until someone subscribes.
    _unobserved_rx: Option<watch::Receiver<Sequence>>,
    confirmed_reported: bool,
}

impl Sequencer {
    pub fn new(
        sequence: Sequence,
        executor: WalletExecutor,
        waiter: ReceiptWaiter,
        receipt_timeout: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(sequence.clone());
        Self {
            sequence,
            executor,
            waiter,
            receipt_timeout,
            tracker: Box::new(NoopHandle),
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            state_tx,
            _unobserved_rx: Some(state_rx),
            confirmed_reported: false,
        }
    }

    /// Attach a tracking record.
    pub fn with_tracker(mut self, tracker: Box<dyn TrackingHandle>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Bound on each tracker hook.
    pub fn with_hook_timeout(mut self, hook_timeout: Duration) -> Self {
        self.hook_timeout = hook_timeout;
        self
    }

    /// Receive every published state. Dropping all receivers abandons the sequence.
    pub fn subscribe(&mut self) -> watch::Receiver<Sequence> {
        let rx = self.state_tx.subscribe();
        self._unobserved_rx = None;
        rx
    }

    pub fn id(&self) -> Uuid {
        self.sequence.id
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn view(&self) -> StageView {
        describe(&self.sequence)
    }

    pub fn tracker(&self) -> &dyn TrackingHandle {
        self.tracker.as_ref()
    }

    pub fn is_abandoned(&self) -> bool {
        self.state_tx.is_closed()
    }

    /// Dispatch the current step if it is queued, following up automatically.
    ///
    /// Returns the overall stage once no further step can start on its own.
    pub async fn run(&mut self) -> FlowResult<Stage> {
        let record = self
            .sequence
            .current()
            .ok_or(TransitionError::NoCurrentStep)?;
        if record.stage == Stage::Queued && !self.sequence.is_complete() {
            self.drive().await
        } else {
            Ok(self.sequence.overall_stage())
        }
    }

    /// Dispatch a queued step that does not start on its own.
    pub async fn proceed(&mut self) -> FlowResult<Stage> {
        self.drive().await
    }

    /// Re-execute the current step after `failed` or `timeout`.
    ///
    /// Only the current step is touched: earlier confirmed steps are never
    /// re-run and the actions are not prepared again.
    pub async fn retry(&mut self) -> FlowResult<Stage> {
        self.apply(Event::Retry)?;
        self.drive().await
    }

    /// Poll the timed-out hash again without resubmitting.
    pub async fn recheck(&mut self) -> FlowResult<Stage> {
        self.apply(Event::Recheck)?;
        let Some((tx_hash, chain_id)) = self
            .sequence
            .current()
            .and_then(|r| r.tx_hash.map(|h| (h, r.step.chain_id)))
        else {
            return Err(TransitionError::NoCurrentStep.into());
        };

        let stage = self.await_receipt(tx_hash, chain_id).await?;
        if self.should_follow_up(stage) {
            self.drive().await
        } else {
            Ok(self.sequence.overall_stage())
        }
    }

    /// Ask the wallet to switch to the chain the failed step targets.
    ///
    /// The step stays `failed`; call [`Sequencer::retry`] afterwards.
    pub async fn switch_network(&mut self) -> FlowResult<()> {
        let view = self.view();
        let chain_id = view.switch_network_to.ok_or(TransitionError::InvalidTransition {
            event: "switch_network",
            stage: view.stage,
        })?;
        tracing::info!(sequence_id = %self.sequence.id, chain_id, "Switching wallet network");
        self.executor.switch_network(chain_id).await
    }

    /// [`Sequencer::run`], abandoned when `shutdown` fires first.
    pub async fn run_until_abandoned(&mut self, shutdown: &Shutdown) -> FlowResult<Stage> {
        shutdown.abandon_on_shutdown(self.run()).await
    }

    // ------------------------------------------------------------------------

    async fn drive(&mut self) -> FlowResult<Stage> {
        loop {
            let stage = self.execute_current().await?;
            if !self.should_follow_up(stage) {
                return Ok(self.sequence.overall_stage());
            }
        }
    }

    /// A step just confirmed and the one before the new current step asked for a follow-up.
    fn should_follow_up(&self, stage: Stage) -> bool {
        if stage != Stage::Confirmed || self.sequence.is_complete() {
            return false;
        }
        let index = self.sequence.current_index;
        index > 0
            && self.sequence.steps[index - 1].step.requires_follow_up
            && self.sequence.steps[index].stage == Stage::Queued
    }

    /// Run the current step from `queued` to its outcome. Returns that step's stage.
    async fn execute_current(&mut self) -> FlowResult<Stage> {
        self.apply(Event::Dispatch)?;
        let step: Step = match self.sequence.current() {
            Some(record) => record.step.clone(),
            None => return Err(TransitionError::NoCurrentStep.into()),
        };

        let submitted = self.until_abandoned(self.executor.execute(&step)).await?;
        match submitted {
            Ok(tx_hash) => {
                self.apply(Event::Submitted(tx_hash))?;
                self.hook("add_tx_hash", self.tracker.add_tx_hash(tx_hash)).await;
                self.hook("mark_submitted", self.tracker.mark_submitted()).await;
                self.await_receipt(tx_hash, step.chain_id).await
            }
            Err(e) => {
                let kind = e.kind();
                tracing::warn!(
                    sequence_id = %self.sequence.id,
                    step = %step.label,
                    error = %e,
                    "Wallet submission failed"
                );
                self.apply(Event::WalletFailed(kind))?;
                self.report_failure(kind).await;
                Ok(Stage::Failed)
            }
        }
    }

    async fn await_receipt(&mut self, tx_hash: TxHash, chain_id: u64) -> FlowResult<Stage> {
        let result = self
            .until_abandoned(
                self.waiter
                    .wait_for_receipt(tx_hash, chain_id, self.receipt_timeout),
            )
            .await?;

        self.apply(Event::Receipt(result.outcome))?;
        match result.outcome {
            ReceiptOutcome::Confirmed => {
                if self.sequence.is_complete() && !self.confirmed_reported {
                    self.confirmed_reported = true;
                    self.hook("mark_confirmed", self.tracker.mark_confirmed()).await;
                }
                Ok(Stage::Confirmed)
            }
            ReceiptOutcome::Failed => {
                self.report_failure(ErrorKind::TransactionReverted).await;
                Ok(Stage::Failed)
            }
            ReceiptOutcome::Timeout => {
                self.hook("mark_pending", self.tracker.mark_pending()).await;
                Ok(Stage::Timeout)
            }
        }
    }

    async fn report_failure(&self, kind: ErrorKind) {
        self.hook("mark_failed", self.tracker.mark_failed(kind.as_str())).await;
    }

    async fn hook<F>(&self, name: &'static str, call: F)
    where
        F: Future<Output = TrackerResult<()>>,
    {
        best_effort(name, self.hook_timeout, call).await;
    }

    /// Apply an event and publish the new state.
    fn apply(&mut self, event: Event) -> FlowResult<()> {
        if self.is_abandoned() {
            return Err(FlowError::Abandoned);
        }

        let index = self.sequence.current_index;
        let next = reduce(&self.sequence, event)?;
        let stage = next.steps[index].stage;
        self.sequence = next;

        metrics::record_stage_transition(stage.as_str());
        tracing::info!(
            sequence_id = %self.sequence.id,
            step = %self.sequence.steps[index].step.label,
            position = index + 1,
            event = event.name(),
            stage = %stage,
            "Step transition"
        );

        self.state_tx.send_replace(self.sequence.clone());
        Ok(())
    }

    /// Await `fut` unless every subscriber goes away first.
    async fn until_abandoned<F: Future>(&self, fut: F) -> FlowResult<F::Output> {
        tokio::select! {
            output = fut => Ok(output),
            _ = self.state_tx.closed() => {
                tracing::info!(sequence_id = %self.sequence.id, "Sequence abandoned, discarding in-flight result");
                Err(FlowError::Abandoned)
            }
        }
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("sequence", &self.sequence)
            .field("receipt_timeout", &self.receipt_timeout)
            .field("hook_timeout", &self.hook_timeout)
            .field("tracking_id", &self.tracker.id())
            .finish()
    }
}
