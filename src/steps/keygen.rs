//! Validator key generation with the deposit tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::Pattern;
use tracing::{debug, info, instrument};

use crate::adapters::{CommandRunner, CommandSpec};
use crate::core::WizardError;
use crate::domain::{KeyMaterial, Network};

/// Output directory the deposit tool writes below its working directory
pub const VALIDATOR_KEYS_DIR: &str = "validator_keys";

pub const DEPOSIT_DATA_PATTERN: &str = "deposit_data*";
pub const KEYSTORE_PATTERN: &str = "keystore*";

/// Runs the extracted deposit tool and collects what it wrote
pub struct KeyGenerator {
    runner: Arc<dyn CommandRunner>,
    tool_dir: PathBuf,
}

impl KeyGenerator {
    pub fn new(runner: Arc<dyn CommandRunner>, tool_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            tool_dir: tool_dir.into(),
        }
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.tool_dir.join(VALIDATOR_KEYS_DIR)
    }

    /// Run `deposit new-mnemonic` interactively, then scan its output
    #[instrument(skip(self), fields(tool_dir = %self.tool_dir.display()))]
    pub async fn generate(&self, network: Network) -> Result<KeyMaterial, WizardError> {
        let command = CommandSpec::new(self.tool_dir.join("deposit").display().to_string())
            .args(["new-mnemonic", "--chain", network.as_str()])
            .current_dir(&self.tool_dir)
            .interactive();

        self.runner.run_checked(&command).await?;

        let keys = scan_validator_keys(&self.keys_dir()).await?;
        info!(validators = keys.validator_count(), "Validator keys generated");
        Ok(keys)
    }
}

/// Collect the deposit data file and keystores from `dir`.
///
/// Hidden entries and non-files are ignored. Exactly one deposit data file
/// and at least one keystore are required.
pub async fn scan_validator_keys(dir: &Path) -> Result<KeyMaterial, WizardError> {
    let no_keys = |reason: String| WizardError::NoKeysGenerated {
        dir: dir.to_path_buf(),
        reason,
    };

    let deposit_pattern = Pattern::new(DEPOSIT_DATA_PATTERN)
        .map_err(|e| no_keys(format!("invalid pattern: {}", e)))?;
    let keystore_pattern =
        Pattern::new(KEYSTORE_PATTERN).map_err(|e| no_keys(format!("invalid pattern: {}", e)))?;

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(no_keys("directory was not created".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut deposit_files = Vec::new();
    let mut keystore_paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') || !entry.file_type().await?.is_file() {
            debug!(name, "Skipping entry");
            continue;
        }

        if deposit_pattern.matches(name) {
            deposit_files.push(entry.path());
        } else if keystore_pattern.matches(name) {
            keystore_paths.push(entry.path());
        }
    }

    let deposit_data_path = match deposit_files.len() {
        0 => return Err(no_keys("no deposit data file".to_string())),
        1 => deposit_files.remove(0),
        n => return Err(no_keys(format!("{} deposit data files, expected one", n))),
    };

    if keystore_paths.is_empty() {
        return Err(no_keys("no keystore files".to_string()));
    }
    keystore_paths.sort();

    Ok(KeyMaterial {
        validator_keys_dir: dir.to_path_buf(),
        deposit_data_path,
        keystore_paths,
    })
}
