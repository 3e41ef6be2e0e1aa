//! Release acquisition: fetch, verify, extract.
//!
//! A release only reaches its install location after its verification
//! companion checked out. Scratch downloads never outlive the acquisition,
//! whatever its outcome.

pub mod install;
pub mod release;
pub mod verify;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::adapters::CommandRunner;
use crate::core::{RetryPolicy, WizardError};

pub use install::{remove_stale_output, ArchiveInstaller};
pub use release::{
    parse_assets, select_assets, ArtifactFetcher, AssetPair, DownloadSink, DownloadedArtifact,
    FetchedRelease, GithubReleases, ReleaseAsset, ReleaseSource,
};
pub use verify::{sha256_file, verify_checksum, ArtifactVerifier};

/// How a release binary is authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Detached PGP signature made with `key_id`
    Signature { keyserver: String, key_id: String },

    /// Published SHA-256 checksum file
    Checksum,
}

impl Verification {
    pub fn is_checksum(&self) -> bool {
        matches!(self, Verification::Checksum)
    }
}

/// Which release to fetch and how to trust it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    /// Repository on the release index ("owner/name")
    pub repo: String,
    pub binary_suffix: String,
    pub companion_suffix: String,
    pub verification: Verification,
}

/// Where an archive is extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub dir: PathBuf,
    pub strip_components: Option<u32>,
}

/// Scratch files deleted on drop
#[derive(Debug, Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    pub fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed scratch file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch file")
                }
            }
        }
    }
}

/// Fetch → verify → extract for one release
pub struct ReleasePipeline {
    fetcher: ArtifactFetcher,
    verifier: ArtifactVerifier,
    installer: ArchiveInstaller,
}

impl ReleasePipeline {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        runner: Arc<dyn CommandRunner>,
        scratch_dir: impl Into<PathBuf>,
        key_retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher: ArtifactFetcher::new(source, scratch_dir),
            verifier: ArtifactVerifier::new(runner.clone(), key_retry),
            installer: ArchiveInstaller::new(runner),
        }
    }

    /// Install the latest release of `spec` into `target`
    #[instrument(skip_all, fields(repo = %spec.repo))]
    pub async fn install(
        &self,
        spec: &ReleaseSpec,
        target: &InstallTarget,
    ) -> Result<(), WizardError> {
        let fetched = self.fetcher.fetch(spec).await?;
        self.verifier.verify(&fetched, &spec.verification).await?;
        self.installer
            .extract(&fetched.binary.local_path, &target.dir, target.strip_components)
            .await?;

        info!(target = %target.dir.display(), "Release installed");
        Ok(())
    }
}
