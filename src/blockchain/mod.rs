//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! [[chains]] config (RPC URLs per chain)
//!     → client.rs (RPC connection with timeouts and failover, ChainRegistry)
//!     → receipt.rs (poll receipts until confirmed / failed / timeout)
//!
//! Environment (private key) + RPC URL
//!     → wallet.rs (LocalWallet, a WalletSdk for headless runs)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod receipt;
pub mod types;
pub mod wallet;

pub use client::{BlockchainClient, ChainRegistry};
pub use receipt::{ReceiptOutcome, ReceiptPoll, ReceiptSource, ReceiptWaiter, WaitResult};
pub use types::{BlockchainError, ChainId, ReceiptStatus};
pub use wallet::LocalWallet;
