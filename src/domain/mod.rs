//! Domain types for the wizard.
//!
//! - Network: the chain a run targets
//! - KeyMaterial: generated validator keys
//! - StepOutcome / RunOutcome: halt-or-continue decisions
//! - Event / Run: the run journal

pub mod events;
pub mod keys;
pub mod network;
pub mod outcome;
pub mod run;

// Re-export commonly used types
pub use events::{Event, EventType, StepStatus};
pub use keys::KeyMaterial;
pub use network::Network;
pub use outcome::{RunOutcome, StepOutcome, EXIT_DECLINED, EXIT_FAILED, EXIT_NOT_ROOT};
pub use run::{Run, RunState};
