//! Transaction lifecycle orchestrator library.

// Core flow
pub mod prepare;
pub mod sequence;
pub mod wallet;
pub mod blockchain;
pub mod tracker;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub mod mock;

pub use config::schema::TxflowConfig;
pub use error::{ErrorKind, FlowError, FlowResult};
pub use lifecycle::Shutdown;
pub use sequence::{Orchestrator, Sequencer, Stage};
