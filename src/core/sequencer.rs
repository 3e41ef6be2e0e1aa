//! Step sequencer.
//!
//! Runs the wizard's steps in a fixed order, asking each step's gate before
//! it starts, journaling every transition and halting on the first step
//! that does not proceed.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{CommandRunner, Gate, Prompt};
use crate::artifacts::{ReleasePipeline, ReleaseSource};
use crate::config::WizardConfig;
use crate::domain::{Event, EventType, KeyMaterial, Network, RunOutcome, StepOutcome, StepStatus};
use crate::provision::{ProvisionedResource, SystemProvisioner};

use super::error::WizardError;
use super::event_store::EventStore;

/// Values carried from one step to the next
#[derive(Debug, Clone, Default)]
pub struct WizardState {
    /// Network chosen by the operator
    pub network: Option<Network>,

    /// Keys produced by the key generation step
    pub keys: Option<KeyMaterial>,

    /// Accounts, directories and units ensured so far
    pub provisioned: Vec<ProvisionedResource>,
}

impl WizardState {
    pub fn require_network(&self) -> Result<Network, WizardError> {
        self.network.ok_or(WizardError::MissingState("a selected network"))
    }

    pub fn require_keys(&self) -> Result<&KeyMaterial, WizardError> {
        self.keys
            .as_ref()
            .ok_or(WizardError::MissingState("generated validator keys"))
    }

    /// Resources that did not exist before this run
    pub fn created(&self) -> impl Iterator<Item = &ProvisionedResource> {
        self.provisioned.iter().filter(|resource| resource.created)
    }
}

/// Collaborators shared by every step
#[derive(Clone)]
pub struct StepContext {
    pub config: WizardConfig,
    pub runner: Arc<dyn CommandRunner>,
    pub releases: Arc<dyn ReleaseSource>,
    pub prompt: Arc<dyn Prompt>,
}

impl StepContext {
    pub fn provisioner(&self) -> SystemProvisioner {
        SystemProvisioner::new(self.runner.clone(), self.config.unit_dir.clone())
    }

    pub fn release_pipeline(&self) -> ReleasePipeline {
        ReleasePipeline::new(
            self.releases.clone(),
            self.runner.clone(),
            self.config.downloads_dir(),
            self.config.signing.retry,
        )
    }
}

/// One unit of the wizard
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable name used in the journal
    fn name(&self) -> &'static str;

    /// Confirmation asked before `run`; declining quits the wizard
    fn gate(&self) -> Option<Gate> {
        None
    }

    async fn run(
        &self,
        state: &mut WizardState,
        ctx: &StepContext,
    ) -> Result<StepOutcome, WizardError>;
}

/// Result of a sequenced run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub state: WizardState,
}

/// Runs steps in order against a journal
pub struct StepSequencer {
    steps: Vec<Box<dyn Step>>,
}

impl StepSequencer {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step until one does not proceed.
    ///
    /// Step failures are reported in the returned outcome; `Err` is reserved
    /// for journal I/O problems.
    #[instrument(skip_all, fields(run_id = %store.run_id()))]
    pub async fn run(&self, ctx: &StepContext, store: &EventStore) -> Result<RunReport> {
        let run_id = store.run_id();
        let mut state = WizardState::default();
        info!(steps = self.steps.len(), "Starting wizard run");

        store
            .append(&Event::new(
                run_id,
                None,
                EventType::RunStarted,
                format!("Wizard run with {} steps", self.steps.len()),
                StepStatus::Running,
            ))
            .await?;

        for step in &self.steps {
            let name = step.name();
            store
                .append(&Event::new(
                    run_id,
                    Some(name.to_string()),
                    EventType::StepStarted,
                    format!("Step '{}' started", name),
                    StepStatus::Running,
                ))
                .await?;

            let started = Instant::now();
            let outcome = self.run_step(step.as_ref(), &mut state, ctx).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                StepOutcome::Proceed => {
                    info!(step = name, duration_ms, "Step completed");
                    store
                        .append(
                            &Event::new(
                                run_id,
                                Some(name.to_string()),
                                EventType::StepCompleted,
                                format!("Step '{}' completed", name),
                                StepStatus::Completed,
                            )
                            .with_duration(duration_ms),
                        )
                        .await?;
                }
                StepOutcome::Declined => {
                    warn!(step = name, "Operator quit the wizard");
                    for (event_type, summary) in [
                        (EventType::StepDeclined, format!("Step '{}' declined", name)),
                        (EventType::RunDeclined, "Run declined".to_string()),
                    ] {
                        store
                            .append(
                                &Event::new(
                                    run_id,
                                    Some(name.to_string()),
                                    event_type,
                                    summary,
                                    StepStatus::Declined,
                                )
                                .with_duration(duration_ms),
                            )
                            .await?;
                    }

                    return Ok(RunReport {
                        run_id,
                        outcome: RunOutcome::Declined {
                            step: name.to_string(),
                        },
                        state,
                    });
                }
                StepOutcome::Failed(err) => {
                    error!(step = name, error = %err, "Step failed");
                    for (event_type, summary) in [
                        (EventType::StepFailed, format!("Step '{}' failed", name)),
                        (EventType::RunFailed, "Run failed".to_string()),
                    ] {
                        store
                            .append(
                                &Event::new(
                                    run_id,
                                    Some(name.to_string()),
                                    event_type,
                                    summary,
                                    StepStatus::Failed,
                                )
                                .with_duration(duration_ms)
                                .with_error(err.to_string()),
                            )
                            .await?;
                    }

                    return Ok(RunReport {
                        run_id,
                        outcome: RunOutcome::Failed {
                            step: name.to_string(),
                            error: err,
                        },
                        state,
                    });
                }
            }
        }

        store
            .append(&Event::new(
                run_id,
                None,
                EventType::RunCompleted,
                "Run completed".to_string(),
                StepStatus::Completed,
            ))
            .await?;
        info!("Wizard run completed");

        Ok(RunReport {
            run_id,
            outcome: RunOutcome::Completed,
            state,
        })
    }

    async fn run_step(
        &self,
        step: &dyn Step,
        state: &mut WizardState,
        ctx: &StepContext,
    ) -> StepOutcome {
        if let Some(gate) = step.gate() {
            match ctx.prompt.confirm(&gate).await {
                Ok(true) => {}
                Ok(false) => return StepOutcome::Declined,
                Err(err) => return StepOutcome::Failed(err),
            }
        }

        StepOutcome::from_result(step.run(state, ctx).await)
    }
}
