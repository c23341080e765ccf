//! Wallet execution subsystem.
//!
//! # Data Flow
//! ```text
//! Step (from the request builder)
//!     → executor.rs (connection, network check, hex normalization)
//!     → sdk.rs WalletSdk (browser wallet bridge, or blockchain::wallet::LocalWallet)
//!     → TxHash handed to the receipt waiter
//! ```

pub mod executor;
pub mod sdk;

pub use executor::WalletExecutor;
pub use sdk::{WalletError, WalletSdk, WalletTransaction};
