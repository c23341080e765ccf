//! Request building subsystem.
//!
//! # Data Flow
//! ```text
//! Action + ActionParams
//!     → builder.rs (domain bounds: chain, token, amount)
//!     → api.rs (POST /{domain}/prepare/{action}; 429 → RateLimited)
//!     → builder.rs (step keys → [approval?, primary])
//!     → Vec<Step> for the sequencer
//! ```

pub mod api;
pub mod builder;
pub mod types;

pub use api::{HttpPrepareApi, PrepareApi};
pub use builder::RequestBuilder;
pub use types::{Action, ActionParams, ActionRequest, Domain, PrepareResponse};
