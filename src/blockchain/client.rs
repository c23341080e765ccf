//! Blockchain RPC client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to one JSON-RPC endpoint per chain (plus failovers)
//! - Look up transaction receipts for the receipt waiter
//! - Handle timeouts and network errors gracefully

use alloy::primitives::TxHash;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::receipt::ReceiptSource;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainConfig, ChainId, ReceiptStatus,
};

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: ChainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Fails only when the primary URL is malformed. A chain id mismatch or an
    /// unreachable endpoint is logged and the client is still returned.
    pub async fn new(config: ChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(
            Arc::new(ProviderBuilder::new().connect_http(primary_url))
                as Arc<dyn Provider + Send + Sync>,
        );

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(
                    Arc::new(ProviderBuilder::new().connect_http(url))
                        as Arc<dyn Provider + Send + Sync>,
                );
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    chain_id = config.chain_id,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_chain_id();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(ChainId(result)),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        Err(BlockchainError::Rpc("All RPC providers failed".to_string()))
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_transaction_receipt(tx_hash);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to get receipt".to_string()))
    }
}

#[async_trait]
impl ReceiptSource for BlockchainClient {
    async fn receipt_status(
        &self,
        tx_hash: TxHash,
        chain_id: u64,
    ) -> BlockchainResult<ReceiptStatus> {
        if chain_id != self.config.chain_id {
            return Err(BlockchainError::UnknownChain(chain_id));
        }
        Ok(match self.get_transaction_receipt(tx_hash).await? {
            None => ReceiptStatus::NotFound,
            Some(receipt) if receipt.status() => ReceiptStatus::Success,
            Some(_) => ReceiptStatus::Reverted,
        })
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

/// One [`BlockchainClient`] per configured chain, routed by chain id.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    clients: HashMap<u64, BlockchainClient>,
}

impl ChainRegistry {
    /// Connect every configured chain.
    pub async fn connect(chains: &[ChainConfig]) -> BlockchainResult<Self> {
        let mut clients = HashMap::new();
        for chain in chains {
            let client = BlockchainClient::new(chain.clone()).await?;
            clients.insert(chain.chain_id, client);
        }
        Ok(Self { clients })
    }

    pub fn get(&self, chain_id: u64) -> Option<&BlockchainClient> {
        self.clients.get(&chain_id)
    }
}

#[async_trait]
impl ReceiptSource for ChainRegistry {
    async fn receipt_status(
        &self,
        tx_hash: TxHash,
        chain_id: u64,
    ) -> BlockchainResult<ReceiptStatus> {
        let client = self
            .get(chain_id)
            .ok_or(BlockchainError::UnknownChain(chain_id))?;
        client.receipt_status(tx_hash, chain_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChainConfig {
        ChainConfig {
            chain_id: 31337, // Anvil default
            name: "anvil".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_client_creation() {
        // Succeeds even if nothing listens on the RPC port
        let result = BlockchainClient::new(test_config()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = BlockchainClient::new(config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_rpc_failover() {
        let mut config = test_config();
        config.rpc_url = "http://127.0.0.1:1".to_string();
        config.failover_urls.push("http://127.0.0.1:2".to_string());

        let client = BlockchainClient::new(config).await.unwrap();
        let result = client.get_chain_id().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("All RPC providers failed"));
    }

    #[tokio::test]
    async fn test_registry_unknown_chain() {
        let registry = ChainRegistry::default();
        let err = registry
            .receipt_status(TxHash::ZERO, 43114)
            .await
            .unwrap_err();
        assert!(matches!(err, BlockchainError::UnknownChain(43114)));
    }
}
