//! Core orchestration logic.
//!
//! This module contains:
//! - WizardError: Typed failures of a step
//! - RetryPolicy: Fixed-delay retry settings
//! - EventStore: Append-only run journal
//! - StepSequencer: Ordered, gated step execution

pub mod error;
pub mod event_store;
pub mod retry;
pub mod sequencer;

// Re-export commonly used types
pub use error::WizardError;
pub use event_store::EventStore;
pub use retry::RetryPolicy;
pub use sequencer::{RunReport, Step, StepContext, StepSequencer, WizardState};
