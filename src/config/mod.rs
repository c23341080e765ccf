//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TxflowConfig (validated, immutable)
//!     → handed to the orchestrator, RPC registry and tracker at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, ChainConfig, DomainConfig, LogFormat, ObservabilityConfig, ReceiptConfig,
    RetryConfig, TrackerConfig, TxflowConfig,
};
