//! Idempotent provisioning of privileged OS resources.
//!
//! Every operation is an "ensure": it checks or overwrites rather than
//! blindly creating, so re-running a step against an already provisioned
//! machine succeeds. Every external command's status is checked and a
//! failure aborts the step.

pub mod units;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::adapters::{CommandRunner, CommandSpec};
use crate::core::WizardError;

pub use units::{beacon_node_unit, execution_client_unit, validator_client_unit, ServiceSpec};

/// Kind of resource an ensure operation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ServiceAccount,
    Directory,
    ServiceUnit,
}

/// Record of one ensured resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedResource {
    pub kind: ResourceKind,

    /// Account name, or unit name for units
    pub identity: String,

    pub path: Option<PathBuf>,
    pub owner: Option<String>,
    pub mode: Option<u32>,

    /// Whether this call created the resource
    pub created: bool,
}

/// Ensures accounts, directories and units exist as required
pub struct SystemProvisioner {
    runner: Arc<dyn CommandRunner>,
    unit_dir: PathBuf,
}

impl SystemProvisioner {
    pub fn new(runner: Arc<dyn CommandRunner>, unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            unit_dir: unit_dir.into(),
        }
    }

    /// Ensure an unprivileged, non-interactive account exists
    pub async fn ensure_account(&self, account: &str) -> Result<ProvisionedResource, WizardError> {
        let lookup = self
            .runner
            .run(&CommandSpec::new("id").args(["-u", account]))
            .await?;

        let created = !lookup.success();
        if created {
            self.runner
                .run_checked(&CommandSpec::new("useradd").args([
                    "--no-create-home",
                    "--shell",
                    "/bin/false",
                    account,
                ]))
                .await?;
            info!(account, "Created service account");
        }

        Ok(ProvisionedResource {
            kind: ResourceKind::ServiceAccount,
            identity: account.to_string(),
            path: None,
            owner: None,
            mode: None,
            created,
        })
    }

    /// Ensure `path` exists, is recursively owned by `owner`, and has `mode`
    pub async fn ensure_directory(
        &self,
        path: &Path,
        owner: &str,
        mode: Option<u32>,
    ) -> Result<ProvisionedResource, WizardError> {
        let created = !tokio::fs::try_exists(path).await?;
        tokio::fs::create_dir_all(path).await?;

        self.chown(path, owner).await?;

        if let Some(mode) = mode {
            set_mode(path, mode).await?;
        }

        info!(path = %path.display(), owner, ?mode, created, "Data directory ready");

        Ok(ProvisionedResource {
            kind: ResourceKind::Directory,
            identity: owner.to_string(),
            path: Some(path.to_path_buf()),
            owner: Some(owner.to_string()),
            mode,
            created,
        })
    }

    /// Recursively hand `path` to `owner:owner`
    pub async fn chown(&self, path: &Path, owner: &str) -> Result<(), WizardError> {
        self.runner
            .run_checked(
                &CommandSpec::new("chown")
                    .arg("-R")
                    .arg(format!("{}:{}", owner, owner))
                    .path_arg(path),
            )
            .await?;
        Ok(())
    }

    /// Write a unit definition, replacing any previous version
    pub async fn install_unit(
        &self,
        spec: &ServiceSpec,
        contents: &str,
    ) -> Result<ProvisionedResource, WizardError> {
        tokio::fs::create_dir_all(&self.unit_dir).await?;
        let path = self.unit_dir.join(spec.unit_file_name());
        let created = !tokio::fs::try_exists(&path).await?;

        tokio::fs::write(&path, contents).await?;
        info!(unit = %path.display(), "Service unit written");

        Ok(ProvisionedResource {
            kind: ResourceKind::ServiceUnit,
            identity: spec.service.clone(),
            path: Some(path),
            owner: None,
            mode: None,
            created,
        })
    }

    /// Reload unit files, then start and enable the service
    pub async fn activate(&self, service: &str) -> Result<(), WizardError> {
        for args in [
            vec!["daemon-reload"],
            vec!["start", service],
            vec!["enable", service],
        ] {
            self.runner
                .run_checked(&CommandSpec::new("systemctl").args(args))
                .await?;
        }

        info!(service, "Service started and enabled");
        Ok(())
    }

    /// Account, data directory, unit and activation for one client
    #[instrument(skip(self, spec, unit_contents), fields(service = %spec.service))]
    pub async fn provision(
        &self,
        spec: &ServiceSpec,
        unit_contents: &str,
    ) -> Result<Vec<ProvisionedResource>, WizardError> {
        let mut resources = Vec::with_capacity(3);

        resources.push(self.ensure_account(&spec.account).await?);
        resources.push(
            self.ensure_directory(&spec.data_dir, &spec.account, spec.data_dir_mode())
                .await?,
        );
        resources.push(self.install_unit(spec, unit_contents).await?);
        self.activate(&spec.service).await?;

        Ok(resources)
    }

    /// Install a package from a Launchpad PPA through apt
    pub async fn install_ppa_package(&self, ppa: &str, package: &str) -> Result<(), WizardError> {
        let steps = [
            CommandSpec::new("add-apt-repository").args(["-y", ppa]),
            CommandSpec::new("apt").arg("update"),
            CommandSpec::new("apt").args(["install", "-y", package]),
        ];

        for spec in &steps {
            self.runner.run_checked(spec).await?;
        }

        info!(ppa, package, "Package installed");
        Ok(())
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), WizardError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<(), WizardError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::CommandOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Accepts every command except those whose program is in `failing`
    #[derive(Default)]
    struct ScriptedRunner {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, WizardError> {
            self.calls.lock().unwrap().push(spec.to_string());
            let code = if self.failing.contains(&spec.program.as_str()) { 1 } else { 0 };
            Ok(CommandOutput::with_code(code))
        }
    }

    #[tokio::test]
    async fn test_existing_account_is_not_recreated() {
        let runner = Arc::new(ScriptedRunner::default());
        let provisioner = SystemProvisioner::new(runner.clone(), "/unused");

        let resource = provisioner.ensure_account("goeth").await.unwrap();

        assert!(!resource.created);
        assert_eq!(*runner.calls.lock().unwrap(), vec!["id -u goeth".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_account_is_created() {
        let runner = Arc::new(ScriptedRunner {
            failing: vec!["id"],
            ..Default::default()
        });
        let provisioner = SystemProvisioner::new(runner.clone(), "/unused");

        let resource = provisioner.ensure_account("goeth").await.unwrap();

        assert!(resource.created);
        assert_eq!(
            runner.calls.lock().unwrap().last().unwrap(),
            "useradd --no-create-home --shell /bin/false goeth"
        );
    }

    #[tokio::test]
    async fn test_restricted_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("lighthouse").join("beacon");
        let provisioner = SystemProvisioner::new(Arc::new(ScriptedRunner::default()), temp.path());

        let resource = provisioner
            .ensure_directory(&dir, "lighthousebeacon", Some(0o700))
            .await
            .unwrap();

        assert!(resource.created);
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[tokio::test]
    async fn test_failed_systemctl_aborts_activation() {
        let runner = Arc::new(ScriptedRunner {
            failing: vec!["systemctl"],
            ..Default::default()
        });
        let provisioner = SystemProvisioner::new(runner.clone(), "/unused");

        let result = provisioner.activate("geth").await;

        assert!(matches!(result, Err(WizardError::CommandFailed { .. })));
        // start/enable are never attempted after a failed reload
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_apt_update_stops_install() {
        let runner = Arc::new(ScriptedRunner {
            failing: vec!["apt"],
            ..Default::default()
        });
        let provisioner = SystemProvisioner::new(runner.clone(), "/unused");

        let result = provisioner
            .install_ppa_package("ppa:ethereum/ethereum", "geth")
            .await;

        assert!(result.is_err());
        assert_eq!(
            *runner.calls.lock().unwrap(),
            vec![
                "add-apt-repository -y ppa:ethereum/ethereum".to_string(),
                "apt update".to_string(),
            ]
        );
    }
}
