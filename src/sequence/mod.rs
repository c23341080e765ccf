//! Step sequencing subsystem.
//!
//! # Data Flow
//! ```text
//! ActionRequest
//!     → orchestrator.rs (prepare once, start tracking)
//!     → sequencer.rs (wallet → receipt per step, tracker hooks, watch channel)
//!         → reducer.rs (pure Sequence × Event → Sequence)
//!     → view.rs (stage label, retry / switch-network actions, warnings)
//! ```

pub mod orchestrator;
pub mod reducer;
pub mod sequencer;
pub mod step;
pub mod view;

pub use orchestrator::Orchestrator;
pub use reducer::{reduce, Event, TransitionError};
pub use sequencer::Sequencer;
pub use step::{Sequence, Stage, Step, StepRecord, StepRole};
pub use view::{describe, StageView};
