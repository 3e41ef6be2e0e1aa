//! Verification of downloaded release binaries.
//!
//! Two strategies:
//! - Signature: receive the signer's public key (retried), then
//!   `gpg --verify` the detached signature.
//! - Checksum: compare the digest computed during download against the
//!   first line of the published checksum file.

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{info, instrument, warn};

use crate::adapters::{CommandRunner, CommandSpec};
use crate::core::{RetryPolicy, WizardError};

use super::release::{DownloadedArtifact, FetchedRelease};
use super::Verification;

/// Checks fetched releases before anything is installed
pub struct ArtifactVerifier {
    runner: Arc<dyn CommandRunner>,
    retry: RetryPolicy,
}

impl ArtifactVerifier {
    pub fn new(runner: Arc<dyn CommandRunner>, retry: RetryPolicy) -> Self {
        Self { runner, retry }
    }

    /// Verify a fetched release with the given strategy
    pub async fn verify(
        &self,
        fetched: &FetchedRelease,
        verification: &Verification,
    ) -> Result<(), WizardError> {
        match verification {
            Verification::Signature { keyserver, key_id } => {
                self.receive_key(keyserver, key_id).await?;
                self.verify_signature(&fetched.companion.local_path).await
            }
            Verification::Checksum => {
                verify_checksum(&fetched.binary, &fetched.companion.local_path).await
            }
        }
    }

    /// Import a public key, retrying when gpg exits unsuccessfully.
    ///
    /// A gpg that cannot be launched fails on the first attempt. Returns the
    /// number of attempts it took.
    #[instrument(skip(self))]
    pub async fn receive_key(&self, keyserver: &str, key_id: &str) -> Result<u32, WizardError> {
        let spec = CommandSpec::new("gpg").args(["--keyserver", keyserver, "--recv-keys", key_id]);

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let output = self.runner.run(&spec).await?;
            if output.success() {
                info!(attempt, "Public key received");
                return Ok(attempt);
            }

            if !self.retry.should_retry(attempt) {
                return Err(WizardError::KeyRetrieval {
                    key_id: key_id.to_string(),
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay();
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Failed to receive public key, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Check a detached signature; gpg locates the signed file next to it
    pub async fn verify_signature(&self, signature: &Path) -> Result<(), WizardError> {
        let spec = CommandSpec::new("gpg").arg("--verify").path_arg(signature);
        let output = self.runner.run(&spec).await?;

        if !output.success() {
            return Err(WizardError::SignatureVerification {
                path: signature.to_path_buf(),
            });
        }

        info!(signature = %signature.display(), "Signature verified");
        Ok(())
    }
}

/// Compare a binary's SHA-256 against the first line of `checksum_file`.
///
/// Uses the digest computed while downloading when available.
pub async fn verify_checksum(
    binary: &DownloadedArtifact,
    checksum_file: &Path,
) -> Result<(), WizardError> {
    let actual = match binary.sha256 {
        Some(ref digest) => digest.clone(),
        None => sha256_file(&binary.local_path).await?,
    };

    // Undecodable bytes compare as a mismatch
    let content = tokio::fs::read(checksum_file).await?;
    let content = String::from_utf8_lossy(&content);
    let expected = content.lines().next().unwrap_or_default().trim();

    if !expected.eq_ignore_ascii_case(&actual) {
        return Err(WizardError::ChecksumMismatch {
            path: binary.local_path.clone(),
            expected: expected.to_string(),
            actual,
        });
    }

    info!(binary = %binary.local_path.display(), "Checksum verified");
    Ok(())
}

/// Hex SHA-256 of a file, read in chunks
pub async fn sha256_file(path: &Path) -> Result<String, WizardError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::CommandOutput;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[tokio::test]
    async fn test_checksum_uses_first_trimmed_line() {
        let temp = TempDir::new().unwrap();
        let binary_path = temp.path().join("deposit.tar.gz");
        let checksum_path = temp.path().join("deposit.sha256");
        std::fs::write(&binary_path, b"hello").unwrap();
        std::fs::write(&checksum_path, format!("  {}  \nsecond line\n", HELLO_SHA256)).unwrap();

        let binary = DownloadedArtifact {
            local_path: binary_path,
            sha256: None,
        };
        verify_checksum(&binary, &checksum_path).await.unwrap();
    }

    #[tokio::test]
    async fn test_checksum_mismatch_reports_both_digests() {
        let temp = TempDir::new().unwrap();
        let checksum_path = temp.path().join("deposit.sha256");
        std::fs::write(&checksum_path, "deadbeef\n").unwrap();

        let binary = DownloadedArtifact {
            local_path: temp.path().join("deposit.tar.gz"),
            sha256: Some(HELLO_SHA256.to_string()),
        };

        match verify_checksum(&binary, &checksum_path).await {
            Err(WizardError::ChecksumMismatch { expected, actual, .. }) => {
                assert_eq!(expected, "deadbeef");
                assert_eq!(actual, HELLO_SHA256);
            }
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_checksum_file_is_a_mismatch() {
        let temp = TempDir::new().unwrap();
        let checksum_path = temp.path().join("deposit.sha256");
        std::fs::write(&checksum_path, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let binary = DownloadedArtifact {
            local_path: temp.path().join("deposit.tar.gz"),
            sha256: Some(HELLO_SHA256.to_string()),
        };

        assert!(matches!(
            verify_checksum(&binary, &checksum_path).await,
            Err(WizardError::ChecksumMismatch { .. })
        ));
    }

    /// Runner whose program is never found
    #[derive(Default)]
    struct MissingProgram {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl CommandRunner for MissingProgram {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, WizardError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(WizardError::CommandSpawn {
                command: spec.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[tokio::test]
    async fn test_missing_gpg_is_not_retried() {
        let runner = Arc::new(MissingProgram::default());
        let verifier = ArtifactVerifier::new(runner.clone(), RetryPolicy::default());

        let result = verifier.receive_key("keyserver.ubuntu.com", "F30674B0").await;

        assert!(matches!(result, Err(WizardError::CommandSpawn { .. })));
        assert_eq!(runner.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sha256_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(sha256_file(&path).await.unwrap(), HELLO_SHA256);
    }
}
