//! Configuration for the wizard.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ETH2_WIZARD_HOME, ETH2_WIZARD_UNIT_DIR)
//! 2. Config file (`--config`, else ETH2_WIZARD_CONFIG, else
//!    /etc/eth2-wizard/config.yaml when present)
//! 3. Defaults (~/eth2validatorwizard, /etc/systemd/system, /var/lib, GitHub)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::RetryPolicy;

/// System-wide config file looked up when nothing else is given
pub const SYSTEM_CONFIG_PATH: &str = "/etc/eth2-wizard/config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub releases: ReleasesConfig,
    #[serde(default)]
    pub signing: SigningConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Working directory for downloads, the deposit tool and run journals
    pub work_dir: Option<String>,
    /// Where service units are written
    pub unit_dir: Option<String>,
    /// Where the Lighthouse binary is extracted
    pub bin_dir: Option<String>,
    /// Parent of the client data directories
    pub data_root: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleasesConfig {
    pub api_url: Option<String>,
    pub api_version: Option<String>,
    pub lighthouse_repo: Option<String>,
    pub deposit_cli_repo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigningConfig {
    pub keyserver: Option<String>,
    pub lighthouse_key_id: Option<String>,
    pub key_fetch_retries: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub work_dir: PathBuf,
    pub unit_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub data_root: PathBuf,
    pub release: ReleaseSettings,
    pub signing: SigningSettings,

    /// Path to config file (if one was loaded)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    /// Release index base URL
    pub api_url: String,
    /// Value of the `Accept` header the index requires
    pub api_version: String,
    pub lighthouse_repo: String,
    pub deposit_cli_repo: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            api_version: "application/vnd.github.v3+json".to_string(),
            lighthouse_repo: "sigp/lighthouse".to_string(),
            deposit_cli_repo: "ethereum/eth2.0-deposit-cli".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SigningSettings {
    pub keyserver: String,
    /// Sigma Prime release signing key
    pub lighthouse_key_id: String,
    pub retry: RetryPolicy,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            keyserver: "keyserver.ubuntu.com".to_string(),
            lighthouse_key_id: "15E66D941F697E28F49381F426416DC3F30674B0".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl WizardConfig {
    /// Configuration rooted at `work_dir` with every other setting defaulted
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            unit_dir: PathBuf::from("/etc/systemd/system"),
            bin_dir: PathBuf::from("/usr/local/bin"),
            data_root: PathBuf::from("/var/lib"),
            release: ReleaseSettings::default(),
            signing: SigningSettings::default(),
            config_file: None,
        }
    }

    /// Scratch directory for release downloads
    pub fn downloads_dir(&self) -> PathBuf {
        self.work_dir.join("downloads")
    }

    /// Directory the deposit tool is extracted into and run from
    pub fn deposit_cli_dir(&self) -> PathBuf {
        self.work_dir.join("eth2depositcli")
    }

    /// Directory holding one journal per run
    pub fn runs_dir(&self) -> PathBuf {
        self.work_dir.join("runs")
    }

    /// Lighthouse `--datadir`; beacon and validator data live below it
    pub fn lighthouse_root(&self) -> PathBuf {
        self.data_root.join("lighthouse")
    }

    /// Single-instance lock file
    pub fn lock_path(&self) -> PathBuf {
        self.work_dir.join("wizard.lock")
    }
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Pick the config file to load, if any
fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("ETH2_WIZARD_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    system.exists().then_some(system)
}

/// Merge a parsed config file, environment and defaults
fn resolve_config<F>(
    file: ConfigFile,
    config_file: Option<PathBuf>,
    home: &Path,
    env: F,
) -> WizardConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = WizardConfig::with_work_dir(home.join("eth2validatorwizard"));
    config.config_file = config_file;

    if let Some(work_dir) = env("ETH2_WIZARD_HOME").or(file.paths.work_dir) {
        config.work_dir = PathBuf::from(work_dir);
    }
    if let Some(unit_dir) = env("ETH2_WIZARD_UNIT_DIR").or(file.paths.unit_dir) {
        config.unit_dir = PathBuf::from(unit_dir);
    }
    if let Some(bin_dir) = file.paths.bin_dir {
        config.bin_dir = PathBuf::from(bin_dir);
    }
    if let Some(data_root) = file.paths.data_root {
        config.data_root = PathBuf::from(data_root);
    }

    let releases = file.releases;
    if let Some(api_url) = releases.api_url {
        config.release.api_url = api_url.trim_end_matches('/').to_string();
    }
    if let Some(api_version) = releases.api_version {
        config.release.api_version = api_version;
    }
    if let Some(repo) = releases.lighthouse_repo {
        config.release.lighthouse_repo = repo;
    }
    if let Some(repo) = releases.deposit_cli_repo {
        config.release.deposit_cli_repo = repo;
    }

    let signing = file.signing;
    if let Some(keyserver) = signing.keyserver {
        config.signing.keyserver = keyserver;
    }
    if let Some(key_id) = signing.lighthouse_key_id {
        config.signing.lighthouse_key_id = key_id;
    }
    if let Some(retries) = signing.key_fetch_retries {
        config.signing.retry.max_retries = retries;
    }
    if let Some(delay) = signing.retry_delay_seconds {
        config.signing.retry = RetryPolicy::new(
            config.signing.retry.max_retries,
            Duration::from_secs(delay),
        );
    }

    config
}

/// Load configuration from all sources
pub fn load_config(explicit: Option<&Path>) -> Result<WizardConfig> {
    let home = dirs::home_dir().context("Failed to determine home directory")?;

    let config_file = find_config_file(explicit);
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve_config(file, config_file, &home, |key| {
        std::env::var(key).ok()
    }))
}
