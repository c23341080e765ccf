//! Local private-key wallet.
//!
//! A [`WalletSdk`] for headless use (the `txflow` binary, scripted runs):
//! signs with a key from the environment and broadcasts over JSON-RPC.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::sync::Arc;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};
use crate::wallet::sdk::{WalletError, WalletSdk, WalletTransaction};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TXFLOW_PRIVATE_KEY";

/// Wallet backed by a local key and one RPC endpoint.
#[derive(Clone)]
pub struct LocalWallet {
    address: Address,
    provider: Arc<dyn Provider + Send + Sync>,
}

impl LocalWallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `rpc_url` - Endpoint used for `eth_chainId` and broadcasting
    pub fn from_private_key(private_key_hex: &str, rpc_url: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let address = signer.address();

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        tracing::info!(address = %address, rpc_url = %rpc_url, "Local wallet initialized");

        Ok(Self {
            address,
            provider: Arc::new(provider),
        })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `TXFLOW_PRIVATE_KEY` from environment.
    pub fn from_env(rpc_url: &str) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, rpc_url)
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.address
    }
}

/// Convert a wallet-encoded transaction back into an alloy request.
pub fn to_transaction_request(
    from: Address,
    tx: &WalletTransaction,
) -> Result<TransactionRequest, WalletError> {
    let value: U256 = tx
        .value
        .parse()
        .map_err(|_| invalid_quantity("value", &tx.value))?;
    let gas = parse_hex_u64(&tx.gas).ok_or_else(|| invalid_quantity("gas", &tx.gas))?;
    let chain_id = ChainId::from_hex(&tx.chain_id)
        .ok_or_else(|| invalid_quantity("chainId", &tx.chain_id))?;

    Ok(TransactionRequest::default()
        .with_from(from)
        .with_to(tx.to)
        .with_input(tx.data.clone())
        .with_value(value)
        .with_gas_limit(gas)
        .with_chain_id(chain_id.0))
}

fn parse_hex_u64(value: &str) -> Option<u64> {
    let hex = value.strip_prefix("0x")?;
    u64::from_str_radix(hex, 16).ok()
}

fn invalid_quantity(field: &str, value: &str) -> WalletError {
    WalletError::Provider {
        code: None,
        message: format!("invalid {} quantity '{}'", field, value),
    }
}

fn rpc_error(e: impl std::fmt::Display) -> WalletError {
    WalletError::Provider {
        code: None,
        message: e.to_string(),
    }
}

#[async_trait]
impl WalletSdk for LocalWallet {
    async fn request_chain_id(&self) -> Result<String, WalletError> {
        let chain_id = self.provider.get_chain_id().await.map_err(rpc_error)?;
        Ok(ChainId(chain_id).to_hex())
    }

    async fn send_transaction(&self, tx: WalletTransaction) -> Result<TxHash, WalletError> {
        let request = to_transaction_request(self.address, &tx)?;
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(rpc_error)?;
        Ok(*pending.tx_hash())
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> Result<(), WalletError> {
        Err(WalletError::Unsupported(format!(
            "local key wallet is bound to its RPC endpoint, cannot switch to {}",
            chain_id_hex
        )))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, "http://localhost:8545").unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = LocalWallet::from_private_key(
            &format!("0x{}", TEST_PRIVATE_KEY),
            "http://localhost:8545",
        )
        .unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let result = LocalWallet::from_private_key("invalid_key", "http://localhost:8545");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_cannot_switch_chain() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, "http://localhost:8545").unwrap();
        let err = wallet.switch_chain("0x1").await.unwrap_err();
        assert!(matches!(err, WalletError::Unsupported(_)));
    }

    #[test]
    fn test_transaction_request_from_wallet_encoding() {
        let tx = WalletTransaction {
            to: Address::repeat_byte(0x22),
            data: Bytes::from(vec![0x01]),
            value: "0xde0b6b3a7640000".into(),
            gas: "0x5208".into(),
            chain_id: "0xa86a".into(),
        };
        let request = to_transaction_request(Address::ZERO, &tx).unwrap();
        assert_eq!(request.value, Some(U256::from(1_000_000_000_000_000_000u128)));
        assert_eq!(request.gas, Some(21_000));
        assert_eq!(request.chain_id, Some(43114));
    }

    #[test]
    fn test_rejects_decimal_gas() {
        let tx = WalletTransaction {
            to: Address::ZERO,
            data: Bytes::new(),
            value: "0x0".into(),
            gas: "21000".into(),
            chain_id: "0x1".into(),
        };
        let err = to_transaction_request(Address::ZERO, &tx).unwrap_err();
        assert!(err.to_string().contains("invalid gas quantity"));
    }
}
