//! The wizard's steps, in the order they run.
//!
//! welcome → overview → network → execution client → beacon node →
//! key generation → validator client

pub mod gates;
pub mod keygen;

use async_trait::async_trait;
use tracing::info;

use crate::adapters::{CommandSpec, Gate};
use crate::artifacts::{remove_stale_output, InstallTarget, ReleaseSpec, Verification};
use crate::config::WizardConfig;
use crate::core::{Step, StepContext, StepSequencer, WizardError, WizardState};
use crate::domain::{Network, StepOutcome};
use crate::provision::{
    beacon_node_unit, execution_client_unit, validator_client_unit, ServiceSpec,
};

pub use keygen::{scan_validator_keys, KeyGenerator};

/// Launchpad archive shipping Geth
pub const ETHEREUM_PPA: &str = "ppa:ethereum/ethereum";

/// Lighthouse release: tarball plus detached signature
pub fn lighthouse_release(config: &WizardConfig) -> ReleaseSpec {
    ReleaseSpec {
        repo: config.release.lighthouse_repo.clone(),
        binary_suffix: "x86_64-unknown-linux-gnu.tar.gz".to_string(),
        companion_suffix: "x86_64-unknown-linux-gnu.tar.gz.asc".to_string(),
        verification: Verification::Signature {
            keyserver: config.signing.keyserver.clone(),
            key_id: config.signing.lighthouse_key_id.clone(),
        },
    }
}

/// Deposit tool release: tarball plus SHA-256 checksum file
pub fn deposit_cli_release(config: &WizardConfig) -> ReleaseSpec {
    ReleaseSpec {
        repo: config.release.deposit_cli_repo.clone(),
        binary_suffix: "linux-amd64.tar.gz".to_string(),
        companion_suffix: "linux-amd64.sha256".to_string(),
        verification: Verification::Checksum,
    }
}

/// The full wizard in order
pub fn standard_sequence() -> StepSequencer {
    StepSequencer::new(vec![
        Box::new(WelcomeStep),
        Box::new(OverviewStep),
        Box::new(NetworkSelectionStep),
        Box::new(ExecutionClientStep),
        Box::new(BeaconNodeStep),
        Box::new(KeyGenerationStep),
        Box::new(ValidatorClientStep),
    ])
}

pub struct WelcomeStep;

#[async_trait]
impl Step for WelcomeStep {
    fn name(&self) -> &'static str {
        "welcome"
    }

    fn gate(&self) -> Option<Gate> {
        Some(gates::WELCOME)
    }

    async fn run(&self, _: &mut WizardState, _: &StepContext) -> Result<StepOutcome, WizardError> {
        Ok(StepOutcome::Proceed)
    }
}

pub struct OverviewStep;

#[async_trait]
impl Step for OverviewStep {
    fn name(&self) -> &'static str {
        "overview"
    }

    fn gate(&self) -> Option<Gate> {
        Some(gates::OVERVIEW)
    }

    async fn run(&self, _: &mut WizardState, _: &StepContext) -> Result<StepOutcome, WizardError> {
        Ok(StepOutcome::Proceed)
    }
}

/// Choosing no network quits the wizard
pub struct NetworkSelectionStep;

#[async_trait]
impl Step for NetworkSelectionStep {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn run(
        &self,
        state: &mut WizardState,
        ctx: &StepContext,
    ) -> Result<StepOutcome, WizardError> {
        match ctx.prompt.select_network(&gates::NETWORK, &Network::ALL).await? {
            Some(network) => {
                info!(%network, "Network selected");
                state.network = Some(network);
                Ok(StepOutcome::Proceed)
            }
            None => Ok(StepOutcome::Declined),
        }
    }
}

/// Geth from the Ethereum PPA, run as `goeth`
pub struct ExecutionClientStep;

#[async_trait]
impl Step for ExecutionClientStep {
    fn name(&self) -> &'static str {
        "execution_client"
    }

    fn gate(&self) -> Option<Gate> {
        Some(gates::EXECUTION_CLIENT)
    }

    async fn run(
        &self,
        state: &mut WizardState,
        ctx: &StepContext,
    ) -> Result<StepOutcome, WizardError> {
        let network = state.require_network()?;
        let provisioner = ctx.provisioner();

        provisioner.install_ppa_package(ETHEREUM_PPA, "geth").await?;

        let spec = ServiceSpec::execution_client(&ctx.config.data_root);
        let resources = provisioner
            .provision(&spec, &execution_client_unit(network, &spec))
            .await?;
        state.provisioned.extend(resources);

        Ok(StepOutcome::Proceed)
    }
}

/// Signed Lighthouse release, beacon node run as `lighthousebeacon`
pub struct BeaconNodeStep;

#[async_trait]
impl Step for BeaconNodeStep {
    fn name(&self) -> &'static str {
        "beacon_node"
    }

    fn gate(&self) -> Option<Gate> {
        Some(gates::BEACON_NODE)
    }

    async fn run(
        &self,
        state: &mut WizardState,
        ctx: &StepContext,
    ) -> Result<StepOutcome, WizardError> {
        let network = state.require_network()?;
        let config = &ctx.config;

        ctx.release_pipeline()
            .install(
                &lighthouse_release(config),
                &InstallTarget {
                    dir: config.bin_dir.clone(),
                    strip_components: None,
                },
            )
            .await?;

        let root = config.lighthouse_root();
        let spec = ServiceSpec::beacon_node(&root);
        let unit = beacon_node_unit(network, &spec, &config.bin_dir, &root);
        let resources = ctx.provisioner().provision(&spec, &unit).await?;
        state.provisioned.extend(resources);

        Ok(StepOutcome::Proceed)
    }
}

/// Checksummed deposit tool, run interactively to produce keys
pub struct KeyGenerationStep;

#[async_trait]
impl Step for KeyGenerationStep {
    fn name(&self) -> &'static str {
        "key_generation"
    }

    fn gate(&self) -> Option<Gate> {
        Some(gates::KEY_GENERATION)
    }

    async fn run(
        &self,
        state: &mut WizardState,
        ctx: &StepContext,
    ) -> Result<StepOutcome, WizardError> {
        let network = state.require_network()?;
        let tool_dir = ctx.config.deposit_cli_dir();
        let generator = KeyGenerator::new(ctx.runner.clone(), &tool_dir);

        // Keys from an earlier attempt must never be mistaken for new ones
        if remove_stale_output(&generator.keys_dir()).await? {
            info!(dir = %generator.keys_dir().display(), "Removed stale validator keys");
        }

        ctx.release_pipeline()
            .install(
                &deposit_cli_release(&ctx.config),
                &InstallTarget {
                    dir: tool_dir.clone(),
                    strip_components: Some(2),
                },
            )
            .await?;

        state.keys = Some(generator.generate(network).await?);
        Ok(StepOutcome::Proceed)
    }
}

/// Imports keystores and runs the validator client as `lighthousevalidator`
pub struct ValidatorClientStep;

#[async_trait]
impl Step for ValidatorClientStep {
    fn name(&self) -> &'static str {
        "validator_client"
    }

    fn gate(&self) -> Option<Gate> {
        Some(gates::VALIDATOR_CLIENT)
    }

    async fn run(
        &self,
        state: &mut WizardState,
        ctx: &StepContext,
    ) -> Result<StepOutcome, WizardError> {
        let network = state.require_network()?;
        let keys = state.require_keys()?;
        let config = &ctx.config;
        let provisioner = ctx.provisioner();

        let root = config.lighthouse_root();
        let spec = ServiceSpec::validator_client(&root);

        let account = provisioner.ensure_account(&spec.account).await?;
        let data_dir = provisioner
            .ensure_directory(&spec.data_dir, &spec.account, spec.data_dir_mode())
            .await?;

        let import = CommandSpec::new(config.bin_dir.join("lighthouse").display().to_string())
            .args(["--network", network.as_str(), "account", "validator", "import"])
            .arg("--directory")
            .path_arg(&keys.validator_keys_dir)
            .arg("--datadir")
            .path_arg(&root)
            .interactive();
        ctx.runner.run_checked(&import).await?;
        info!(validators = keys.validator_count(), "Keystores imported");

        // The import runs as root; hand the new files back to the service account
        provisioner.chown(&spec.data_dir, &spec.account).await?;

        let unit = validator_client_unit(network, &spec, &config.bin_dir, &root);
        let unit = provisioner.install_unit(&spec, &unit).await?;
        provisioner.activate(&spec.service).await?;
        state.provisioned.extend([account, data_dir, unit]);

        Ok(StepOutcome::Proceed)
    }
}
