//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the prepare backend:
//!     → On failure: retries.rs (RateLimited → sleep retry-after,
//!                              ServiceUnavailable → backoff.rs)
//! ```
//!
//! Receipt polling owns its own deadline (blockchain::receipt) and wallet
//! prompts have none, so neither goes through this module.

pub mod backoff;
pub mod retries;
