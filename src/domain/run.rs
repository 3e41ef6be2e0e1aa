//! Run state reconstructed from the journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{Event, EventType, StepStatus};

/// A recorded wizard run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (if applicable)
    pub completed_at: Option<DateTime<Utc>>,

    /// Step statuses in the order the steps were first seen
    pub steps: Vec<(String, StepStatus)>,
}

impl Run {
    /// Create a new run
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            steps: Vec::new(),
        }
    }

    /// Reconstruct run state from a sequence of events
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first_event = events.first()?;

        let mut run = Self::new(first_event.run_id);
        run.started_at = first_event.timestamp;

        for event in events {
            run.apply_event(event);
        }

        Some(run)
    }

    /// Apply a single event to update run state
    pub fn apply_event(&mut self, event: &Event) {
        match event.event_type {
            EventType::RunStarted => {
                self.state = RunState::Running;
                self.started_at = event.timestamp;
            }
            EventType::RunCompleted => {
                self.state = RunState::Completed;
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunDeclined => {
                self.state = RunState::Declined {
                    step: event.step_id.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunFailed => {
                self.state = RunState::Failed {
                    error: event.error.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
            }
            EventType::StepStarted => {
                self.set_step_status(event, StepStatus::Running);
            }
            EventType::StepCompleted => self.set_step_status(event, StepStatus::Completed),
            EventType::StepDeclined => self.set_step_status(event, StepStatus::Declined),
            EventType::StepFailed => self.set_step_status(event, StepStatus::Failed),
        }
    }

    fn set_step_status(&mut self, event: &Event, status: StepStatus) {
        let Some(ref step_id) = event.step_id else {
            return;
        };

        match self.steps.iter_mut().find(|(name, _)| name == step_id) {
            Some((_, current)) => *current = status,
            None => self.steps.push((step_id.clone(), status)),
        }
    }

    /// Status of a specific step
    pub fn step_status(&self, step_name: &str) -> StepStatus {
        self.steps
            .iter()
            .find(|(name, _)| name == step_name)
            .map(|(_, status)| *status)
            .unwrap_or_default()
    }
}

/// State of a wizard run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Currently executing, or interrupted before writing a final event
    #[default]
    Running,

    /// Every step completed
    Completed,

    /// The user quit at a gate
    Declined { step: String },

    /// A step failed
    Failed { error: String },
}
