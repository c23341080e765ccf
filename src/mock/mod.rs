//! In-process test doubles for the external actors: wallet, RPC, prepare
//! backend and tracking service.
//!
//! Responses are queued and consumed in order; when a queue runs dry each mock
//! falls back to a benign default so tests only script what they care about.

use alloy::primitives::TxHash;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::blockchain::receipt::ReceiptSource;
use crate::blockchain::types::{BlockchainResult, ReceiptStatus};
use crate::error::{FlowError, FlowResult};
use crate::prepare::api::PrepareApi;
use crate::prepare::types::{Action, Domain, PrepareRequestBody, PrepareResponse};
use crate::tracker::types::{TrackedTransaction, TrackerError, TrackerResult, TrackingContext};
use crate::tracker::{MemoryTracker, Tracker, TrackingHandle};
use crate::wallet::sdk::{WalletError, WalletSdk, WalletTransaction};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Wallet
// ============================================================================

/// Scriptable [`WalletSdk`].
#[derive(Debug)]
pub struct MockWallet {
    chain_id: AtomicU64,
    evm_compatible: AtomicBool,
    send_results: Mutex<VecDeque<Result<TxHash, WalletError>>>,
    switch_results: Mutex<VecDeque<Result<(), WalletError>>>,
    sent: Mutex<Vec<WalletTransaction>>,
    hashes: Mutex<Vec<TxHash>>,
    switch_requests: Mutex<Vec<String>>,
    send_calls: AtomicUsize,
    chain_id_requests: AtomicUsize,
    next_hash: AtomicU64,
}

impl MockWallet {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: AtomicU64::new(chain_id),
            evm_compatible: AtomicBool::new(true),
            send_results: Mutex::default(),
            switch_results: Mutex::default(),
            sent: Mutex::default(),
            hashes: Mutex::default(),
            switch_requests: Mutex::default(),
            send_calls: AtomicUsize::new(0),
            chain_id_requests: AtomicUsize::new(0),
            next_hash: AtomicU64::new(1),
        }
    }

    pub fn set_evm_compatible(&self, compatible: bool) {
        self.evm_compatible.store(compatible, Ordering::SeqCst);
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    /// Queue the result of the next `send_transaction`. Unscripted sends succeed
    /// with a fresh hash.
    pub fn push_send_result(&self, result: Result<TxHash, WalletError>) {
        lock(&self.send_results).push_back(result);
    }

    pub fn push_switch_result(&self, result: Result<(), WalletError>) {
        lock(&self.switch_results).push_back(result);
    }

    /// Transactions that reached `send_transaction`, in order.
    pub fn sent(&self) -> Vec<WalletTransaction> {
        lock(&self.sent).clone()
    }

    /// Hashes returned by successful sends, in order.
    pub fn hashes(&self) -> Vec<TxHash> {
        lock(&self.hashes).clone()
    }

    pub fn last_hash(&self) -> Option<TxHash> {
        lock(&self.hashes).last().copied()
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn chain_id_requests(&self) -> usize {
        self.chain_id_requests.load(Ordering::SeqCst)
    }

    pub fn switch_requests(&self) -> Vec<String> {
        lock(&self.switch_requests).clone()
    }

    fn fresh_hash(&self) -> TxHash {
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        TxHash::left_padding_from(&n.to_be_bytes())
    }
}

#[async_trait]
impl WalletSdk for MockWallet {
    fn is_evm_compatible(&self) -> bool {
        self.evm_compatible.load(Ordering::SeqCst)
    }

    async fn request_chain_id(&self) -> Result<String, WalletError> {
        self.chain_id_requests.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{:#x}", self.chain_id.load(Ordering::SeqCst)))
    }

    async fn send_transaction(&self, tx: WalletTransaction) -> Result<TxHash, WalletError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.sent).push(tx);
        let scripted = lock(&self.send_results).pop_front();
        let hash = match scripted {
            Some(result) => result?,
            None => self.fresh_hash(),
        };
        lock(&self.hashes).push(hash);
        Ok(hash)
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> Result<(), WalletError> {
        lock(&self.switch_requests).push(chain_id_hex.to_string());
        if let Some(result) = lock(&self.switch_results).pop_front() {
            result?;
        }
        let chain_id = u64::from_str_radix(chain_id_hex.trim_start_matches("0x"), 16).map_err(
            |e| WalletError::Provider {
                code: None,
                message: e.to_string(),
            },
        )?;
        self.set_chain_id(chain_id);
        Ok(())
    }
}

// ============================================================================
// RPC
// ============================================================================

/// Scriptable [`ReceiptSource`]. Unscripted lookups return the default status.
#[derive(Debug)]
pub struct MockReceiptSource {
    responses: Mutex<VecDeque<BlockchainResult<ReceiptStatus>>>,
    default_status: Mutex<ReceiptStatus>,
    polled: Mutex<Vec<TxHash>>,
}

impl MockReceiptSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::default(),
            default_status: Mutex::new(ReceiptStatus::NotFound),
            polled: Mutex::default(),
        }
    }

    /// Every lookup succeeds immediately.
    pub fn always_success() -> Self {
        let source = Self::new();
        source.set_default(ReceiptStatus::Success);
        source
    }

    pub fn push(&self, response: BlockchainResult<ReceiptStatus>) {
        lock(&self.responses).push_back(response);
    }

    pub fn set_default(&self, status: ReceiptStatus) {
        *lock(&self.default_status) = status;
    }

    pub fn calls(&self) -> usize {
        lock(&self.polled).len()
    }

    /// Hashes looked up, one entry per poll.
    pub fn polled(&self) -> Vec<TxHash> {
        lock(&self.polled).clone()
    }
}

impl Default for MockReceiptSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReceiptSource for MockReceiptSource {
    async fn receipt_status(
        &self,
        tx_hash: TxHash,
        _chain_id: u64,
    ) -> BlockchainResult<ReceiptStatus> {
        lock(&self.polled).push(tx_hash);
        let scripted = lock(&self.responses).pop_front();
        scripted.unwrap_or_else(|| Ok(*lock(&self.default_status)))
    }
}

// ============================================================================
// Prepare backend
// ============================================================================

/// Scriptable [`PrepareApi`]. Unscripted calls fail with `ServiceUnavailable`.
#[derive(Debug, Default)]
pub struct MockPrepareApi {
    responses: Mutex<VecDeque<FlowResult<PrepareResponse>>>,
    requests: Mutex<Vec<(Domain, Action, PrepareRequestBody)>>,
}

impl MockPrepareApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: FlowResult<PrepareResponse>) {
        lock(&self.responses).push_back(response);
    }

    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<(Domain, Action, PrepareRequestBody)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl PrepareApi for MockPrepareApi {
    async fn prepare(
        &self,
        domain: Domain,
        action: Action,
        body: &PrepareRequestBody,
    ) -> FlowResult<PrepareResponse> {
        lock(&self.requests).push((domain, action, body.clone()));
        let scripted = lock(&self.responses).pop_front();
        scripted.unwrap_or_else(|| {
            Err(FlowError::ServiceUnavailable(
                "no prepare response scripted".into(),
            ))
        })
    }
}

// ============================================================================
// Tracking service
// ============================================================================

/// One observed tracker call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    Start,
    AddTxHash(TxHash),
    Submitted,
    Pending,
    Confirmed,
    Failed(String),
}

/// Tracker that stores records in memory and logs every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracker {
    inner: MemoryTracker,
    calls: Arc<Mutex<Vec<TrackerCall>>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, call: &TrackerCall) -> usize {
        lock(&self.calls).iter().filter(|c| *c == call).count()
    }

    pub fn records(&self) -> &MemoryTracker {
        &self.inner
    }
}

#[async_trait]
impl Tracker for RecordingTracker {
    async fn start_tracking(
        &self,
        context: &TrackingContext,
    ) -> TrackerResult<Box<dyn TrackingHandle>> {
        lock(&self.calls).push(TrackerCall::Start);
        let inner = self.inner.start_tracking(context).await?;
        Ok(Box::new(RecordingHandle {
            inner,
            calls: self.calls.clone(),
        }))
    }
}

struct RecordingHandle {
    inner: Box<dyn TrackingHandle>,
    calls: Arc<Mutex<Vec<TrackerCall>>>,
}

impl RecordingHandle {
    fn record(&self, call: TrackerCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl TrackingHandle for RecordingHandle {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn add_tx_hash(&self, tx_hash: TxHash) -> TrackerResult<()> {
        self.record(TrackerCall::AddTxHash(tx_hash));
        self.inner.add_tx_hash(tx_hash).await
    }

    async fn mark_submitted(&self) -> TrackerResult<()> {
        self.record(TrackerCall::Submitted);
        self.inner.mark_submitted().await
    }

    async fn mark_pending(&self) -> TrackerResult<()> {
        self.record(TrackerCall::Pending);
        self.inner.mark_pending().await
    }

    async fn mark_confirmed(&self) -> TrackerResult<()> {
        self.record(TrackerCall::Confirmed);
        self.inner.mark_confirmed().await
    }

    async fn mark_failed(&self, reason: &str) -> TrackerResult<()> {
        self.record(TrackerCall::Failed(reason.to_string()));
        self.inner.mark_failed(reason).await
    }

    async fn get_transaction(&self) -> TrackerResult<TrackedTransaction> {
        self.inner.get_transaction().await
    }
}

/// Tracker whose every call is rejected.
#[derive(Debug, Clone, Default)]
pub struct FailingTracker {
    fail_start: bool,
    failures: Arc<AtomicUsize>,
}

impl FailingTracker {
    /// `start_tracking` succeeds, every hook fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// `start_tracking` itself fails.
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            failures: Arc::default(),
        }
    }

    /// Number of rejected calls so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tracker for FailingTracker {
    async fn start_tracking(
        &self,
        _context: &TrackingContext,
    ) -> TrackerResult<Box<dyn TrackingHandle>> {
        if self.fail_start {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(TrackerError::Transport("connection refused".into()));
        }
        Ok(Box::new(FailingHandle {
            failures: self.failures.clone(),
        }))
    }
}

struct FailingHandle {
    failures: Arc<AtomicUsize>,
}

impl FailingHandle {
    fn fail<T>(&self) -> TrackerResult<T> {
        self.failures.fetch_add(1, Ordering::SeqCst);
        Err(TrackerError::Status {
            status: 503,
            message: "tracker unavailable".into(),
        })
    }
}

#[async_trait]
impl TrackingHandle for FailingHandle {
    fn id(&self) -> &str {
        "failing"
    }

    async fn add_tx_hash(&self, _tx_hash: TxHash) -> TrackerResult<()> {
        self.fail()
    }

    async fn mark_submitted(&self) -> TrackerResult<()> {
        self.fail()
    }

    async fn mark_pending(&self) -> TrackerResult<()> {
        self.fail()
    }

    async fn mark_confirmed(&self) -> TrackerResult<()> {
        self.fail()
    }

    async fn mark_failed(&self, _reason: &str) -> TrackerResult<()> {
        self.fail()
    }

    async fn get_transaction(&self) -> TrackerResult<TrackedTransaction> {
        self.fail()
    }
}

/// Tracker that never answers: `start_tracking` and every hook stay pending.
#[derive(Debug, Clone, Default)]
pub struct StalledTracker {
    calls: Arc<AtomicUsize>,
}

impl StalledTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle whose hooks never resolve, as if `start_tracking` had answered.
    pub fn handle(&self) -> Box<dyn TrackingHandle> {
        Box::new(StalledHandle {
            calls: self.calls.clone(),
        })
    }

    /// Number of calls that were entered and left hanging.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tracker for StalledTracker {
    async fn start_tracking(
        &self,
        _context: &TrackingContext,
    ) -> TrackerResult<Box<dyn TrackingHandle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

struct StalledHandle {
    calls: Arc<AtomicUsize>,
}

impl StalledHandle {
    async fn hang<T>(&self) -> TrackerResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[async_trait]
impl TrackingHandle for StalledHandle {
    fn id(&self) -> &str {
        "stalled"
    }

    async fn add_tx_hash(&self, _tx_hash: TxHash) -> TrackerResult<()> {
        self.hang().await
    }

    async fn mark_submitted(&self) -> TrackerResult<()> {
        self.hang().await
    }

    async fn mark_pending(&self) -> TrackerResult<()> {
        self.hang().await
    }

    async fn mark_confirmed(&self) -> TrackerResult<()> {
        self.hang().await
    }

    async fn mark_failed(&self, _reason: &str) -> TrackerResult<()> {
        self.hang().await
    }

    async fn get_transaction(&self) -> TrackerResult<TrackedTransaction> {
        self.hang().await
    }
}
