//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for txflow.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TxflowConfig {
    /// Preparation backend settings.
    pub backend: BackendConfig,

    /// Durable tracker service settings.
    pub tracker: TrackerConfig,

    /// Receipt polling settings.
    pub receipts: ReceiptConfig,

    /// Retry policy for the preparation call.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// RPC endpoints, one entry per chain.
    pub chains: Vec<ChainConfig>,

    /// Lending domain (supply, withdraw, borrow, repay).
    pub lending: DomainConfig,

    /// Staking domain (stake, unstake).
    pub staking: DomainConfig,
}

impl TxflowConfig {
    /// Find the RPC configuration for a chain.
    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

/// Preparation backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the prepare API (e.g., "https://api.example.com").
    pub base_url: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Backoff used when a 429 arrives without a usable `retry-after`.
    pub default_retry_after_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 15,
            default_retry_after_secs: 5,
        }
    }
}

/// Tracker service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Mirror transitions to the tracker service.
    pub enabled: bool,

    /// Base URL of the tracker service.
    pub base_url: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Upper bound on one tracker hook while a step is in flight.
    pub hook_timeout_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 5,
            hook_timeout_ms: 1500,
        }
    }
}

/// Receipt waiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Interval between receipt lookups in milliseconds.
    pub poll_interval_ms: u64,

    /// Give up waiting (stage `timeout`) after this many seconds.
    pub timeout_secs: u64,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_secs: 120,
        }
    }
}

/// Retry configuration for the preparation call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 disables retries).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Longest `retry-after` we are willing to sleep through, in seconds.
    pub max_retry_after_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4_000,
            max_retry_after_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// RPC configuration for one chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Chain ID (e.g., 1 for Ethereum mainnet, 43114 for Avalanche C-Chain).
    pub chain_id: u64,

    /// Human readable name for logs.
    #[serde(default)]
    pub name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

fn default_rpc_timeout() -> u64 {
    10
}

/// Supported chains and tokens for one business domain.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DomainConfig {
    /// Chain IDs the domain's contracts are deployed on.
    pub supported_chains: Vec<u64>,

    /// Token symbols accepted by the domain (matched case-insensitively).
    pub supported_tokens: Vec<String>,
}

impl DomainConfig {
    pub fn supports_chain(&self, chain_id: u64) -> bool {
        self.supported_chains.contains(&chain_id)
    }

    pub fn supports_token(&self, token: &str) -> bool {
        self.supported_tokens
            .iter()
            .any(|t| t.eq_ignore_ascii_case(token))
    }
}
