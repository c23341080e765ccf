//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT (Ctrl-C) → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscribed Sequencer::run_until_abandoned returns Abandoned
//! ```
//!
//! # Design Decisions
//! - A sequence interrupted by shutdown is abandoned, not rolled back: submitted
//!   transactions may still land and the tracker keeps the last known status

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
