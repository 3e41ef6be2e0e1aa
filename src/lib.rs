//! eth2-wizard - Guided installer for an Eth2 validator node
//!
//! Walks an operator through turning a fresh Ubuntu machine into a running
//! validator: an execution client, a Lighthouse beacon node, freshly
//! generated validator keys and a validator client, each behind a
//! confirmation gate.
//!
//! # Architecture
//!
//! - Every step runs in order and yields an explicit `StepOutcome`; the
//!   first step that does not proceed ends the run
//! - Downloaded releases are verified (PGP signature or SHA-256 checksum)
//!   before anything is extracted
//! - OS provisioning goes through idempotent `ensure_*` operations on a
//!   `CommandRunner`, with every exit status checked
//! - Each run is journaled as append-only events
//!
//! # Modules
//!
//! - `adapters`: External commands and operator prompts
//! - `artifacts`: Release fetch, verification and extraction
//! - `provision`: Service accounts, data directories and systemd units
//! - `steps`: The wizard steps and their gates
//! - `core`: Sequencer, journal, errors and retry policy
//! - `domain`: Data structures (Network, KeyMaterial, Event, Run)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the wizard
//! sudo eth2-wizard install
//!
//! # Inspect the latest run
//! eth2-wizard status
//! ```

pub mod adapters;
pub mod artifacts;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod provision;
pub mod steps;

// Re-export main types at crate root for convenience
pub use crate::core::{EventStore, StepSequencer, WizardError};
pub use domain::{Event, EventType, KeyMaterial, Network, Run, RunOutcome, RunState, StepOutcome};
