//! The wallet surface the executor talks to.
//!
//! Mirrors the EIP-1193 calls a browser or mobile wallet exposes:
//! `eth_chainId`, `eth_sendTransaction` and `wallet_switchEthereumChain`.

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 "User Rejected Request".
pub const CODE_USER_REJECTED: i64 = 4001;
/// EIP-1193 "Unsupported Method".
pub const CODE_UNSUPPORTED_METHOD: i64 = 4200;
/// Returned by `wallet_switchEthereumChain` when the chain is unknown to the wallet.
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

/// Transaction payload in the wallet's wire encoding (quantities as `0x` hex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: String,
    pub gas: String,
    pub chain_id: String,
}

/// Errors a wallet reports back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("User rejected the request")]
    Rejected,

    #[error("Unsupported by wallet: {0}")]
    Unsupported(String),

    #[error("Chain {0} is not added to the wallet")]
    ChainNotAdded(String),

    #[error("Wallet provider error ({code:?}): {message}")]
    Provider { code: Option<i64>, message: String },
}

impl WalletError {
    /// Classify an EIP-1193 error code.
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            CODE_USER_REJECTED => WalletError::Rejected,
            CODE_UNSUPPORTED_METHOD => WalletError::Unsupported(message),
            CODE_UNRECOGNIZED_CHAIN => WalletError::ChainNotAdded(message),
            _ => WalletError::Provider {
                code: Some(code),
                message,
            },
        }
    }
}

/// A connected wallet.
#[async_trait]
pub trait WalletSdk: Send + Sync {
    /// Whether the wallet can submit EVM transactions at all.
    fn is_evm_compatible(&self) -> bool {
        true
    }

    /// `eth_chainId`: the currently active chain as a hex string.
    async fn request_chain_id(&self) -> Result<String, WalletError>;

    /// `eth_sendTransaction`: sign and broadcast, returning the transaction hash.
    async fn send_transaction(&self, tx: WalletTransaction) -> Result<TxHash, WalletError>;

    /// `wallet_switchEthereumChain` with a hex chain id.
    async fn switch_chain(&self, chain_id_hex: &str) -> Result<(), WalletError>;
}
