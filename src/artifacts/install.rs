//! Archive extraction into install locations.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::adapters::{CommandRunner, CommandSpec};
use crate::core::WizardError;

/// Extracts verified archives with `tar`
pub struct ArchiveInstaller {
    runner: Arc<dyn CommandRunner>,
}

impl ArchiveInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Extract `archive` into `target`, creating it if needed.
    ///
    /// `strip_components` drops leading path components so a nested archive
    /// layout lands flat in `target`.
    pub async fn extract(
        &self,
        archive: &Path,
        target: &Path,
        strip_components: Option<u32>,
    ) -> Result<(), WizardError> {
        tokio::fs::create_dir_all(target).await?;

        let mut spec = CommandSpec::new("tar").arg("xvf").path_arg(archive);
        if let Some(count) = strip_components {
            spec = spec.arg("--strip-components").arg(count.to_string());
        }
        let spec = spec.arg("--directory").path_arg(target);

        self.runner.run_checked(&spec).await?;

        info!(
            archive = %archive.display(),
            target = %target.display(),
            "Archive extracted"
        );
        Ok(())
    }
}

/// Remove whatever sits at `path`, file or directory.
///
/// Returns whether anything was removed.
pub async fn remove_stale_output(path: &Path) -> Result<bool, WizardError> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }

    info!(path = %path.display(), "Removed output from a previous run");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_stale_directory() {
        let temp = TempDir::new().unwrap();
        let keys = temp.path().join("validator_keys");
        std::fs::create_dir_all(&keys).unwrap();
        std::fs::write(keys.join("keystore-m_12381_3600_0_0_0-1.json"), "{}").unwrap();

        assert!(remove_stale_output(&keys).await.unwrap());
        assert!(!keys.exists());
    }

    #[tokio::test]
    async fn test_remove_stale_file() {
        let temp = TempDir::new().unwrap();
        let keys = temp.path().join("validator_keys");
        std::fs::write(&keys, "not a directory").unwrap();

        assert!(remove_stale_output(&keys).await.unwrap());
        assert!(!keys.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_output_is_noop() {
        let temp = TempDir::new().unwrap();
        let keys = temp.path().join("validator_keys");

        assert!(!remove_stale_output(&keys).await.unwrap());
    }
}
