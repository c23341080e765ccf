//! Receipt polling with a bounded deadline.
//!
//! # Responsibilities
//! - Poll the chain for a transaction receipt on a fixed interval
//! - Classify the outcome as confirmed, failed (reverted) or timeout
//! - Treat RPC errors as "no receipt yet"
//!
//! A `timeout` outcome does not mean the transaction is lost: it can still be
//! mined after we stop looking.

use alloy::primitives::TxHash;
use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

use crate::blockchain::types::{BlockchainResult, ReceiptStatus};
use crate::observability::metrics;

/// Anything that can answer "is there a receipt for this hash yet?".
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    async fn receipt_status(&self, tx_hash: TxHash, chain_id: u64)
        -> BlockchainResult<ReceiptStatus>;
}

/// Terminal classification of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptOutcome {
    Confirmed,
    Failed,
    Timeout,
}

impl ReceiptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptOutcome::Confirmed => "confirmed",
            ReceiptOutcome::Failed => "failed",
            ReceiptOutcome::Timeout => "timeout",
        }
    }
}

/// Result of [`ReceiptWaiter::wait_for_receipt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitResult {
    pub outcome: ReceiptOutcome,
    pub tx_hash: TxHash,
}

/// Items produced by [`ReceiptWaiter::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptPoll {
    /// Poll number `attempt` found no receipt.
    Waiting { attempt: u32 },
    /// Final item of the stream.
    Finished(WaitResult),
}

struct PollState {
    source: Arc<dyn ReceiptSource>,
    tx_hash: TxHash,
    chain_id: u64,
    poll_interval: Duration,
    started: Instant,
    deadline: Instant,
    attempt: u32,
    done: bool,
}

/// Polls a [`ReceiptSource`] until a terminal outcome or the deadline.
#[derive(Clone)]
pub struct ReceiptWaiter {
    source: Arc<dyn ReceiptSource>,
    poll_interval: Duration,
}

impl ReceiptWaiter {
    pub fn new(source: Arc<dyn ReceiptSource>, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval,
        }
    }

    /// Stream of poll results ending with exactly one `Finished` item.
    ///
    /// The first lookup happens immediately. Dropping the stream stops polling.
    pub fn watch(
        &self,
        tx_hash: TxHash,
        chain_id: u64,
        timeout: Duration,
    ) -> impl Stream<Item = ReceiptPoll> + Send + 'static {
        let started = Instant::now();
        let state = PollState {
            source: self.source.clone(),
            tx_hash,
            chain_id,
            poll_interval: self.poll_interval,
            started,
            deadline: started + timeout,
            attempt: 0,
            done: false,
        };

        stream::unfold(state, |mut st| async move {
            if st.done {
                return None;
            }
            st.attempt += 1;

            let lookup = st.source.receipt_status(st.tx_hash, st.chain_id);
            let outcome = match timeout_at(st.deadline, lookup).await {
                Ok(Ok(ReceiptStatus::Success)) => {
                    metrics::record_receipt_poll("success");
                    Some(ReceiptOutcome::Confirmed)
                }
                Ok(Ok(ReceiptStatus::Reverted)) => {
                    metrics::record_receipt_poll("reverted");
                    Some(ReceiptOutcome::Failed)
                }
                Ok(Ok(ReceiptStatus::NotFound)) => {
                    metrics::record_receipt_poll("not_found");
                    tracing::debug!(tx_hash = %st.tx_hash, attempt = st.attempt, "Transaction pending");
                    None
                }
                Ok(Err(e)) => {
                    metrics::record_receipt_poll("error");
                    tracing::warn!(
                        tx_hash = %st.tx_hash,
                        chain_id = st.chain_id,
                        error = %e,
                        "Receipt lookup failed, treating as pending"
                    );
                    None
                }
                Err(_) => None,
            };

            if let Some(outcome) = outcome {
                return Some((st.finish(outcome), st));
            }

            let now = Instant::now();
            if now >= st.deadline {
                return Some((st.finish(ReceiptOutcome::Timeout), st));
            }

            sleep(st.poll_interval.min(st.deadline - now)).await;
            let attempt = st.attempt;
            Some((ReceiptPoll::Waiting { attempt }, st))
        })
    }

    /// Wait for a terminal outcome.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        chain_id: u64,
        timeout: Duration,
    ) -> WaitResult {
        let mut polls = Box::pin(self.watch(tx_hash, chain_id, timeout));
        while let Some(poll) = polls.next().await {
            if let ReceiptPoll::Finished(result) = poll {
                return result;
            }
        }
        WaitResult {
            outcome: ReceiptOutcome::Timeout,
            tx_hash,
        }
    }
}

impl PollState {
    fn finish(&mut self, outcome: ReceiptOutcome) -> ReceiptPoll {
        self.done = true;
        let elapsed = self.started.elapsed();
        metrics::record_receipt_wait(outcome.as_str(), elapsed);
        tracing::info!(
            tx_hash = %self.tx_hash,
            chain_id = self.chain_id,
            outcome = outcome.as_str(),
            attempts = self.attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            "Receipt wait finished"
        );
        ReceiptPoll::Finished(WaitResult {
            outcome,
            tx_hash: self.tx_hash,
        })
    }
}

impl std::fmt::Debug for ReceiptWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptWaiter")
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::BlockchainError;
    use crate::mock::MockReceiptSource;

    const HASH: TxHash = TxHash::repeat_byte(0xaa);

    fn waiter(source: &Arc<MockReceiptSource>) -> ReceiptWaiter {
        ReceiptWaiter::new(source.clone(), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_confirmed_after_pending_polls() {
        let source = Arc::new(MockReceiptSource::new());
        source.push(Ok(ReceiptStatus::NotFound));
        source.push(Ok(ReceiptStatus::NotFound));
        source.push(Ok(ReceiptStatus::Success));

        let result = waiter(&source)
            .wait_for_receipt(HASH, 43114, Duration::from_secs(5))
            .await;
        assert_eq!(result.outcome, ReceiptOutcome::Confirmed);
        assert_eq!(result.tx_hash, HASH);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_reverted_is_failed() {
        let source = Arc::new(MockReceiptSource::new());
        source.push(Ok(ReceiptStatus::Reverted));

        let result = waiter(&source)
            .wait_for_receipt(HASH, 43114, Duration::from_secs(5))
            .await;
        assert_eq!(result.outcome, ReceiptOutcome::Failed);
    }

    #[tokio::test]
    async fn test_rpc_errors_are_not_failures() {
        let source = Arc::new(MockReceiptSource::new());
        source.push(Err(BlockchainError::Rpc("connection reset".into())));
        source.push(Err(BlockchainError::Timeout(1)));
        source.push(Ok(ReceiptStatus::Success));

        let result = waiter(&source)
            .wait_for_receipt(HASH, 43114, Duration::from_secs(5))
            .await;
        assert_eq!(result.outcome, ReceiptOutcome::Confirmed);
    }

    #[tokio::test]
    async fn test_timeout_without_receipt() {
        let source = Arc::new(MockReceiptSource::new());

        let result = waiter(&source)
            .wait_for_receipt(HASH, 43114, Duration::from_millis(40))
            .await;
        assert_eq!(result.outcome, ReceiptOutcome::Timeout);
        assert!(source.calls() >= 2);
    }

    #[tokio::test]
    async fn test_watch_yields_intermediate_states() {
        let source = Arc::new(MockReceiptSource::new());
        source.push(Ok(ReceiptStatus::NotFound));
        source.push(Ok(ReceiptStatus::Success));

        let polls: Vec<ReceiptPoll> = waiter(&source)
            .watch(HASH, 43114, Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(
            polls,
            vec![
                ReceiptPoll::Waiting { attempt: 1 },
                ReceiptPoll::Finished(WaitResult {
                    outcome: ReceiptOutcome::Confirmed,
                    tx_hash: HASH
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_polling() {
        let source = Arc::new(MockReceiptSource::new());
        {
            let mut polls = Box::pin(waiter(&source).watch(HASH, 43114, Duration::from_secs(5)));
            assert_eq!(polls.next().await, Some(ReceiptPoll::Waiting { attempt: 1 }));
        }
        let calls = source.calls();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.calls(), calls);
    }
}
