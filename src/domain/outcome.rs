//! Per-step and per-run outcomes.
//!
//! The wizard halts on the first step that does not proceed. Declining at a
//! confirmation gate and failing a step both stop the run, but they are kept
//! apart all the way to the process exit code.

use crate::core::WizardError;

/// Result of a single step
#[derive(Debug)]
pub enum StepOutcome {
    /// Step finished, continue with the next one
    Proceed,

    /// The user chose to quit at this step
    Declined,

    /// The step failed
    Failed(WizardError),
}

impl StepOutcome {
    /// Fold a step result into an outcome
    pub fn from_result(result: Result<StepOutcome, WizardError>) -> Self {
        match result {
            Ok(outcome) => outcome,
            Err(err) => StepOutcome::Failed(err),
        }
    }
}

/// Final result of a whole run
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step proceeded
    Completed,

    /// The user quit at the named step
    Declined { step: String },

    /// The named step failed
    Failed { step: String, error: WizardError },
}

/// Exit code when every step completed
pub const EXIT_COMPLETED: u8 = 0;
/// Exit code when a step failed
pub const EXIT_FAILED: u8 = 1;
/// Exit code when the user quit at a gate
pub const EXIT_DECLINED: u8 = 3;
/// Exit code when the process lacks superuser privileges
pub const EXIT_NOT_ROOT: u8 = 4;

impl RunOutcome {
    /// Raw process exit status for this outcome
    pub fn exit_status(&self) -> u8 {
        match self {
            RunOutcome::Completed => EXIT_COMPLETED,
            RunOutcome::Declined { .. } => EXIT_DECLINED,
            RunOutcome::Failed { .. } => EXIT_FAILED,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}
