//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Minimal `0x` hex form, as wallets report it from `eth_chainId`.
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }

    /// Parse the `eth_chainId` response (hex, or decimal from lenient wallets).
    pub fn from_hex(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => trimmed.parse().ok(),
        };
        parsed.map(ChainId)
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// No RPC endpoint configured for the chain.
    #[error("No RPC configured for chain {0}")]
    UnknownChain(u64),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// What the chain currently says about a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// No receipt yet (unknown or still in the mempool).
    NotFound,
    /// Mined with a success status.
    Success,
    /// Mined and reverted.
    Reverted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_conversion() {
        let chain_id = ChainId::from(1u64);
        assert_eq!(chain_id.0, 1);
        assert_eq!(u64::from(chain_id), 1);
    }

    #[test]
    fn test_chain_id_hex() {
        assert_eq!(ChainId(43114).to_hex(), "0xa86a");
        assert_eq!(ChainId(1).to_hex(), "0x1");
        assert_eq!(ChainId::from_hex("0xa86a"), Some(ChainId(43114)));
        assert_eq!(ChainId::from_hex("0XA86A"), Some(ChainId(43114)));
        assert_eq!(ChainId::from_hex("43114"), Some(ChainId(43114)));
        assert_eq!(ChainId::from_hex("0xzz"), None);
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");

        let err = BlockchainError::UnknownChain(5);
        assert!(err.to_string().contains("chain 5"));
    }
}
