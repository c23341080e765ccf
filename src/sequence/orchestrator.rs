//! Entry point for a user action: prepare once, start tracking, hand back a
//! ready [`Sequencer`].

use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::receipt::{ReceiptSource, ReceiptWaiter};
use crate::config::{ReceiptConfig, RetryConfig, TxflowConfig};
use crate::error::FlowResult;
use crate::prepare::{ActionRequest, PrepareApi, RequestBuilder};
use crate::resilience::retries::prepare_with_retry;
use crate::sequence::sequencer::Sequencer;
use crate::sequence::step::Sequence;
use crate::tracker::{start_or_noop, NoopTracker, Tracker, TrackingContext, DEFAULT_HOOK_TIMEOUT};
use crate::wallet::WalletExecutor;

/// Shared wiring for every sequence started by one consumer.
#[derive(Clone)]
pub struct Orchestrator {
    builder: RequestBuilder,
    executor: WalletExecutor,
    receipts: Arc<dyn ReceiptSource>,
    tracker: Arc<dyn Tracker>,
    hook_timeout: Duration,
    receipt_config: ReceiptConfig,
    retry_policy: RetryConfig,
}

impl Orchestrator {
    pub fn new(
        builder: RequestBuilder,
        executor: WalletExecutor,
        receipts: Arc<dyn ReceiptSource>,
    ) -> Self {
        Self {
            builder,
            executor,
            receipts,
            tracker: Arc::new(NoopTracker),
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            receipt_config: ReceiptConfig::default(),
            retry_policy: RetryConfig::default(),
        }
    }

    /// Wire everything from a validated config.
    pub fn from_config(
        config: &TxflowConfig,
        api: Arc<dyn PrepareApi>,
        executor: WalletExecutor,
        receipts: Arc<dyn ReceiptSource>,
    ) -> Self {
        Self::new(RequestBuilder::from_config(api, config), executor, receipts)
            .with_receipts(config.receipts.clone())
            .with_retry_policy(config.retries.clone())
            .with_hook_timeout(Duration::from_millis(config.tracker.hook_timeout_ms))
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Bound on `start_tracking` and on each hook of the sequences it starts.
    pub fn with_hook_timeout(mut self, hook_timeout: Duration) -> Self {
        self.hook_timeout = hook_timeout;
        self
    }

    pub fn with_receipts(mut self, receipts: ReceiptConfig) -> Self {
        self.receipt_config = receipts;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryConfig) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Prepare the action and return a sequencer positioned at its first step.
    ///
    /// This is the only place `prepare` runs for the sequence; retries inside
    /// the sequencer reuse the prepared steps.
    pub async fn begin(&self, request: &ActionRequest) -> FlowResult<Sequencer> {
        let steps = prepare_with_retry(
            &self.builder,
            &self.retry_policy,
            request.action,
            &request.params,
        )
        .await?;
        let sequence = Sequence::new(steps);

        let context = TrackingContext {
            sequence_id: sequence.id,
            domain: request.domain(),
            action: request.action,
            chain_id: request.params.chain_id,
            user_address: request.params.user_address,
            token: request.params.token.clone(),
            amount: request.params.amount.clone(),
            step_count: sequence.steps.len(),
        };
        let handle = start_or_noop(self.tracker.as_ref(), &context, self.hook_timeout).await;

        tracing::info!(
            sequence_id = %sequence.id,
            action = request.action.as_str(),
            steps = sequence.steps.len(),
            tracking_id = handle.id(),
            "Sequence ready"
        );

        let waiter = ReceiptWaiter::new(
            self.receipts.clone(),
            Duration::from_millis(self.receipt_config.poll_interval_ms),
        );
        Ok(Sequencer::new(
            sequence,
            self.executor.clone(),
            waiter,
            Duration::from_secs(self.receipt_config.timeout_secs),
        )
        .with_tracker(handle)
        .with_hook_timeout(self.hook_timeout))
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("builder", &self.builder)
            .field("hook_timeout", &self.hook_timeout)
            .field("receipt_config", &self.receipt_config)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}
