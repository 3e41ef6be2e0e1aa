//! Command-line interface for eth2-wizard.
//!
//! Provides the interactive install wizard plus commands for inspecting
//! recorded runs and the resolved configuration.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fs2::FileExt;
use nix::unistd::Uid;
use uuid::Uuid;

use crate::adapters::{PresetPrompt, Prompt, SystemCommandRunner, TerminalPrompt};
use crate::artifacts::GithubReleases;
use crate::config::{load_config, WizardConfig};
use crate::core::{EventStore, RunReport, StepContext};
use crate::domain::{Network, Run, RunOutcome, RunState, EXIT_NOT_ROOT};
use crate::steps::{gates, standard_sequence};

/// eth2-wizard - Guided Eth2 validator node installer
#[derive(Parser, Debug)]
#[command(name = "eth2-wizard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: /etc/eth2-wizard/config.yaml when present)
    #[arg(long, global = true, env = "ETH2_WIZARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the installation wizard (default)
    Install {
        /// Preset the network instead of asking
        #[arg(short, long)]
        network: Option<Network>,

        /// Accept every confirmation gate
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the step statuses of a run
    Status {
        /// Run ID (UUID); latest run when omitted
        run_id: Option<String>,
    },

    /// List recorded runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<ExitCode> {
        let config_path = self.config.as_deref();

        match self.command {
            None => install(config_path, None, false).await,
            Some(Commands::Install { network, yes }) => install(config_path, network, yes).await,
            Some(Commands::Status { run_id }) => {
                show_status(config_path, run_id.as_deref()).await?;
                Ok(ExitCode::SUCCESS)
            }
            Some(Commands::Runs { limit }) => {
                list_runs(config_path, limit).await?;
                Ok(ExitCode::SUCCESS)
            }
            Some(Commands::Config) => {
                show_config(&load_config(config_path)?);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Run the wizard end to end
async fn install(
    config_path: Option<&Path>,
    network: Option<Network>,
    assume_yes: bool,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let prompt: Arc<dyn Prompt> = Arc::new(PresetPrompt::new(
        TerminalPrompt::new(),
        assume_yes,
        network,
    ));

    let status = run_install(config, prompt, Uid::effective().is_root()).await?;
    Ok(ExitCode::from(status))
}

/// Check privileges, then sequence every step; returns the exit status
async fn run_install(config: WizardConfig, prompt: Arc<dyn Prompt>, is_root: bool) -> Result<u8> {
    if !is_root {
        prompt
            .notify(gates::NOT_ROOT_TITLE, gates::NOT_ROOT_TEXT)
            .await?;
        return Ok(EXIT_NOT_ROOT);
    }

    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("Failed to create work directory: {}", config.work_dir.display()))?;
    let _lock = acquire_lock(&config.lock_path())?;

    let releases = GithubReleases::new(config.release.clone())?;
    let store = EventStore::open(&config.runs_dir(), Uuid::new_v4()).await?;
    let ctx = StepContext {
        config,
        runner: Arc::new(SystemCommandRunner::new()),
        releases: Arc::new(releases),
        prompt,
    };

    let report = standard_sequence().run(&ctx, &store).await?;
    print_summary(&report, store.events_path());

    Ok(report.outcome.exit_status())
}

/// Hold an exclusive lock on `path` for as long as the returned file lives
fn acquire_lock(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

    file.try_lock_exclusive().with_context(|| {
        format!(
            "Another wizard is already running (lock held on {})",
            path.display()
        )
    })?;

    Ok(file)
}

fn print_summary(report: &RunReport, journal: &Path) {
    match &report.outcome {
        RunOutcome::Completed => {
            println!("\nYour validator node is set up.");
            if let Some(network) = report.state.network {
                println!("  Network:        {}", network.label());
            }
            if let Some(keys) = &report.state.keys {
                println!("  Validators:     {}", keys.validator_count());
                println!("  Keys directory: {}", keys.validator_keys_dir.display());
                println!("  Deposit data:   {}", keys.deposit_data_path.display());
                println!("\nUpload the deposit data file to the launchpad to make your deposits.");
            }
        }
        RunOutcome::Declined { step } => {
            println!("\nWizard quit at step '{}'.", step);
        }
        RunOutcome::Failed { step, error } => {
            eprintln!("\nStep '{}' failed: {}", step, error);
        }
    }

    let created: Vec<_> = report.state.created().collect();
    if !created.is_empty() {
        println!("\nCreated during this run:");
        for resource in created {
            match &resource.path {
                Some(path) => println!(
                    "  {:?} {} ({})",
                    resource.kind,
                    resource.identity,
                    path.display()
                ),
                None => println!("  {:?} {}", resource.kind, resource.identity),
            }
        }
    }
    eprintln!("[Run {} journal: {}]", report.run_id, journal.display());
}

fn state_label(state: &RunState) -> &'static str {
    match state {
        RunState::Running => "running",
        RunState::Completed => "completed",
        RunState::Declined { .. } => "declined",
        RunState::Failed { .. } => "failed",
    }
}

/// Show the status of a run
async fn show_status(config_path: Option<&Path>, run_id: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let runs_dir = config.runs_dir();

    let run = match run_id {
        Some(run_id_str) => {
            let run_id = Uuid::parse_str(run_id_str)
                .with_context(|| format!("Invalid run ID: {}", run_id_str))?;
            EventStore::open(&runs_dir, run_id)
                .await?
                .load_run()
                .await?
                .with_context(|| format!("No events found for run {}", run_id))?
        }
        None => latest_run(&runs_dir).await?.context("No runs found")?,
    };

    println!("Run ID: {}", run.id);
    println!("State: {}", state_label(&run.state));
    match &run.state {
        RunState::Declined { step } => println!("Quit at: {}", step),
        RunState::Failed { error } => println!("Error: {}", error),
        _ => {}
    }
    println!("Started: {}", run.started_at);
    if let Some(completed) = run.completed_at {
        println!("Finished: {}", completed);
    }
    println!("\nStep statuses:");
    for (step, status) in &run.steps {
        println!("  {}: {:?}", step, status);
    }

    Ok(())
}

async fn latest_run(runs_dir: &Path) -> Result<Option<Run>> {
    Ok(EventStore::load_runs(runs_dir).await?.into_iter().next())
}

/// List recent runs
async fn list_runs(config_path: Option<&Path>, limit: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let runs = EventStore::load_runs(&config.runs_dir()).await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!("{:<38} {:<27} {:<10}", "RUN ID", "STARTED", "STATE");
    println!("{}", "-".repeat(77));

    for run in runs.iter().take(limit) {
        println!(
            "{:<38} {:<27} {:<10}",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            state_label(&run.state)
        );
    }

    Ok(())
}

fn show_config(cfg: &WizardConfig) {
    println!("eth2-wizard configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Work dir:   {}", cfg.work_dir.display());
    println!("  Downloads:  {}", cfg.downloads_dir().display());
    println!("  Deposit:    {}", cfg.deposit_cli_dir().display());
    println!("  Runs:       {}", cfg.runs_dir().display());
    println!("  Units:      {}", cfg.unit_dir.display());
    println!("  Binaries:   {}", cfg.bin_dir.display());
    println!("  Data root:  {}", cfg.data_root.display());
    println!();
    println!("Releases:");
    println!("  Index:      {}", cfg.release.api_url);
    println!("  Lighthouse: {}", cfg.release.lighthouse_repo);
    println!("  Deposit:    {}", cfg.release.deposit_cli_repo);
    println!();
    println!("Signing:");
    println!("  Keyserver:  {}", cfg.signing.keyserver);
    println!("  Key ID:     {}", cfg.signing.lighthouse_key_id);
    println!(
        "  Retries:    {} every {}s",
        cfg.signing.retry.max_retries,
        cfg.signing.retry.delay().as_secs()
    );
}
