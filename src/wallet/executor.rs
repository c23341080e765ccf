//! Submits one step through the connected wallet.
//!
//! # Order of checks
//! ```text
//! wallet connected & EVM capable?   no → WalletIncompatible
//!     → eth_chainId == step.chain_id? no → WrongNetwork (nothing signed)
//!     → normalize quantities to hex
//!     → eth_sendTransaction            rejected → UserRejected
//! ```

use alloy::primitives::TxHash;
use std::sync::Arc;

use crate::blockchain::types::ChainId;
use crate::error::{FlowError, FlowResult};
use crate::sequence::step::Step;
use crate::wallet::sdk::{WalletError, WalletSdk, WalletTransaction};

/// Wallet executor. Holds the connected wallet, if any.
#[derive(Clone, Default)]
pub struct WalletExecutor {
    wallet: Option<Arc<dyn WalletSdk>>,
}

impl WalletExecutor {
    pub fn new(wallet: Arc<dyn WalletSdk>) -> Self {
        Self {
            wallet: Some(wallet),
        }
    }

    /// Executor with no wallet connected. Every call fails with `WalletIncompatible`.
    pub fn disconnected() -> Self {
        Self { wallet: None }
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    fn wallet(&self) -> FlowResult<&Arc<dyn WalletSdk>> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| FlowError::WalletIncompatible("no wallet connected".to_string()))?;
        if !wallet.is_evm_compatible() {
            return Err(FlowError::WalletIncompatible(
                "connected wallet cannot submit EVM transactions".to_string(),
            ));
        }
        Ok(wallet)
    }

    /// Chain the wallet is currently on.
    pub async fn active_chain(&self) -> FlowResult<u64> {
        let wallet = self.wallet()?;
        let raw = wallet.request_chain_id().await.map_err(map_wallet_error)?;
        ChainId::from_hex(&raw)
            .map(u64::from)
            .ok_or_else(|| FlowError::WalletIncompatible(format!("unreadable chain id '{}'", raw)))
    }

    /// Sign and submit a step, returning its transaction hash.
    pub async fn execute(&self, step: &Step) -> FlowResult<TxHash> {
        let wallet = self.wallet()?;

        let actual = self.active_chain().await?;
        if actual != step.chain_id {
            tracing::warn!(
                step_id = %step.id,
                expected = step.chain_id,
                actual,
                "Wallet is on the wrong network"
            );
            return Err(FlowError::WrongNetwork {
                expected: step.chain_id,
                actual,
            });
        }

        let tx = to_wallet_transaction(step);
        tracing::info!(
            step_id = %step.id,
            role = step.role.as_str(),
            to = %tx.to,
            value = %tx.value,
            gas = %tx.gas,
            chain_id = %tx.chain_id,
            "Requesting wallet signature"
        );

        let tx_hash = wallet
            .send_transaction(tx)
            .await
            .map_err(map_wallet_error)?;
        tracing::info!(step_id = %step.id, tx_hash = %tx_hash, "Transaction submitted");
        Ok(tx_hash)
    }

    /// Ask the wallet to switch to `chain_id` (`wallet_switchEthereumChain`).
    pub async fn switch_network(&self, chain_id: u64) -> FlowResult<()> {
        let wallet = self.wallet()?;
        let hex = ChainId(chain_id).to_hex();
        wallet.switch_chain(&hex).await.map_err(|e| match e {
            WalletError::ChainNotAdded(_) => FlowError::Validation(format!(
                "chain {} must be added to the wallet before switching",
                chain_id
            )),
            other => map_wallet_error(other),
        })?;
        tracing::info!(chain_id, "Wallet switched network");
        Ok(())
    }
}

/// Normalize a step into the wallet's encoding: quantities as minimal `0x` hex.
pub fn to_wallet_transaction(step: &Step) -> WalletTransaction {
    WalletTransaction {
        to: step.to,
        data: step.data.clone(),
        value: format!("{:#x}", step.value),
        gas: format!("{:#x}", step.gas_limit),
        chain_id: ChainId(step.chain_id).to_hex(),
    }
}

fn map_wallet_error(e: WalletError) -> FlowError {
    match e {
        WalletError::Rejected => FlowError::UserRejected,
        WalletError::Unsupported(msg) => FlowError::WalletIncompatible(msg),
        WalletError::ChainNotAdded(chain) => FlowError::WalletIncompatible(format!(
            "wallet does not know chain {}",
            chain
        )),
        WalletError::Provider { code, message } => FlowError::ServiceUnavailable(format!(
            "wallet provider error ({:?}): {}",
            code, message
        )),
    }
}

impl std::fmt::Debug for WalletExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletExecutor")
            .field("connected", &self.is_connected())
            .finish()
    }
}
