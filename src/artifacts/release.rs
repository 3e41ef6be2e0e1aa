//! Release index lookup and streaming downloads.
//!
//! Assets are resolved from the "latest release" document of a GitHub-style
//! release index. Both the binary and its verification companion must be
//! present before anything is downloaded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::config::ReleaseSettings;
use crate::core::WizardError;

use super::{ReleaseSpec, ScratchFiles};

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
}

/// The two assets a fetch needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPair {
    pub binary: ReleaseAsset,

    /// Detached signature or checksum file
    pub companion: ReleaseAsset,
}

/// A file written to the scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub local_path: PathBuf,

    /// Hex SHA-256 computed while streaming, when requested
    pub sha256: Option<String>,
}

/// Extract the asset list from a latest-release document.
///
/// Assets lacking a name or download URL are skipped; a missing asset list
/// is a malformed response.
pub fn parse_assets(
    source: &str,
    release: &serde_json::Value,
) -> Result<Vec<ReleaseAsset>, WizardError> {
    let assets = release
        .get("assets")
        .and_then(|assets| assets.as_array())
        .ok_or_else(|| WizardError::MalformedResponse {
            url: source.to_string(),
            reason: "missing 'assets' list".to_string(),
        })?;

    Ok(assets
        .iter()
        .filter_map(|asset| {
            let name = asset.get("name")?.as_str()?;
            let url = asset.get("browser_download_url")?.as_str()?;
            Some(ReleaseAsset {
                name: name.to_string(),
                download_url: url.to_string(),
            })
        })
        .collect())
}

/// Pick the binary and companion assets by filename suffix
pub fn select_assets(
    assets: &[ReleaseAsset],
    binary_suffix: &str,
    companion_suffix: &str,
) -> Result<AssetPair, WizardError> {
    let find = |suffix: &str| {
        assets
            .iter()
            .find(|asset| asset.name.ends_with(suffix))
            .cloned()
            .ok_or_else(|| WizardError::MissingAsset {
                suffix: suffix.to_string(),
            })
    };

    Ok(AssetPair {
        binary: find(binary_suffix)?,
        companion: find(companion_suffix)?,
    })
}

/// Destination for a streamed download, hashing as it writes
pub struct DownloadSink {
    file: File,
    hasher: Option<Sha256>,
    written: u64,
}

impl DownloadSink {
    /// Create (or truncate) `path`
    pub async fn create(path: &Path, hash: bool) -> Result<Self, WizardError> {
        Ok(Self {
            file: File::create(path).await?,
            hasher: hash.then(Sha256::new),
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), WizardError> {
        self.file.write_all(chunk).await?;
        if let Some(ref mut hasher) = self.hasher {
            hasher.update(chunk);
        }
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush to disk and return the hex digest, if hashing
    pub async fn finish(mut self) -> Result<Option<String>, WizardError> {
        self.file.flush().await?;
        Ok(self.hasher.map(|hasher| hex::encode(hasher.finalize())))
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }
}

/// Remote release index
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the latest-release document for `repo` ("owner/name")
    async fn latest_release(&self, repo: &str) -> Result<serde_json::Value, WizardError>;

    /// Stream `url` into `sink`
    async fn download(&self, url: &str, sink: &mut DownloadSink) -> Result<(), WizardError>;
}

/// GitHub REST release index
pub struct GithubReleases {
    client: Client,
    settings: ReleaseSettings,
}

impl GithubReleases {
    pub fn new(settings: ReleaseSettings) -> Result<Self, WizardError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, settings })
    }

    fn latest_release_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/releases/latest", self.settings.api_url, repo)
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    async fn latest_release(&self, repo: &str) -> Result<serde_json::Value, WizardError> {
        let url = self.latest_release_url(repo);
        debug!(%url, "Requesting latest release");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, &self.settings.api_version)
            .header(USER_AGENT, concat!("eth2-wizard/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WizardError::Network(format!("{} returned {}", url, status)));
        }

        response
            .json()
            .await
            .map_err(|e| WizardError::MalformedResponse {
                url,
                reason: e.to_string(),
            })
    }

    async fn download(&self, url: &str, sink: &mut DownloadSink) -> Result<(), WizardError> {
        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("eth2-wizard/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WizardError::Network(format!("{} returned {}", url, status)));
        }

        while let Some(chunk) = response.chunk().await? {
            sink.write_chunk(&chunk).await?;
        }

        Ok(())
    }
}

/// Resolves and downloads release assets into a scratch directory
pub struct ArtifactFetcher {
    source: Arc<dyn ReleaseSource>,
    scratch_dir: PathBuf,
}

/// Downloaded binary and companion.
///
/// Both scratch files are removed when this value is dropped.
#[derive(Debug)]
pub struct FetchedRelease {
    pub binary: DownloadedArtifact,
    pub companion: DownloadedArtifact,
    _scratch: ScratchFiles,
}

impl ArtifactFetcher {
    pub fn new(source: Arc<dyn ReleaseSource>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Resolve the latest release of `spec.repo` and download its assets
    #[instrument(skip(self, spec), fields(repo = %spec.repo))]
    pub async fn fetch(&self, spec: &ReleaseSpec) -> Result<FetchedRelease, WizardError> {
        let release = self.source.latest_release(&spec.repo).await?;
        let assets = parse_assets(&spec.repo, &release)?;
        let pair = select_assets(&assets, &spec.binary_suffix, &spec.companion_suffix)?;

        info!(
            binary = %pair.binary.name,
            companion = %pair.companion.name,
            "Selected release assets"
        );

        fs::create_dir_all(&self.scratch_dir).await?;
        let mut scratch = ScratchFiles::default();

        let binary = self
            .download(&pair.binary, spec.verification.is_checksum(), &mut scratch)
            .await?;
        let companion = self.download(&pair.companion, false, &mut scratch).await?;

        Ok(FetchedRelease {
            binary,
            companion,
            _scratch: scratch,
        })
    }

    async fn download(
        &self,
        asset: &ReleaseAsset,
        hash: bool,
        scratch: &mut ScratchFiles,
    ) -> Result<DownloadedArtifact, WizardError> {
        let file_name = Path::new(&asset.name)
            .file_name()
            .ok_or_else(|| WizardError::MalformedResponse {
                url: asset.download_url.clone(),
                reason: format!("unusable asset name '{}'", asset.name),
            })?;
        let local_path = self.scratch_dir.join(file_name);

        // Tracked before the first byte so partial files are removed too
        scratch.track(local_path.clone());

        let mut sink = DownloadSink::create(&local_path, hash).await?;
        self.source.download(&asset.download_url, &mut sink).await?;
        let bytes = sink.bytes_written();
        let sha256 = sink.finish().await?;

        debug!(path = %local_path.display(), bytes, "Downloaded asset");

        Ok(DownloadedArtifact { local_path, sha256 })
    }
}
