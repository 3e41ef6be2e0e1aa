//! Release Pipeline Integration Tests
//!
//! Fetch → verify → extract against a fake release index and command runner.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use common::{
    lighthouse_assets, sha256_hex, FakeReleases, FakeRunner, DEPOSIT_BINARY, DEPOSIT_CHECKSUM,
    DEPOSIT_TARBALL,
};
use eth2_wizard::artifacts::{
    ArtifactVerifier, InstallTarget, ReleasePipeline, ReleaseSpec, Verification,
};
use eth2_wizard::core::RetryPolicy;
use eth2_wizard::WizardError;

const LIGHTHOUSE: &str = "sigp/lighthouse";
const DEPOSIT_CLI: &str = "ethereum/eth2.0-deposit-cli";

fn signed_spec() -> ReleaseSpec {
    ReleaseSpec {
        repo: LIGHTHOUSE.to_string(),
        binary_suffix: "x86_64-unknown-linux-gnu.tar.gz".to_string(),
        companion_suffix: "x86_64-unknown-linux-gnu.tar.gz.asc".to_string(),
        verification: Verification::Signature {
            keyserver: "keyserver.ubuntu.com".to_string(),
            key_id: "15E66D941F697E28F49381F426416DC3F30674B0".to_string(),
        },
    }
}

fn checksum_spec() -> ReleaseSpec {
    ReleaseSpec {
        repo: DEPOSIT_CLI.to_string(),
        binary_suffix: "linux-amd64.tar.gz".to_string(),
        companion_suffix: "linux-amd64.sha256".to_string(),
        verification: Verification::Checksum,
    }
}

fn target(temp: &TempDir) -> InstallTarget {
    InstallTarget {
        dir: temp.path().join("install"),
        strip_components: Some(2),
    }
}

fn pipeline(releases: FakeReleases, runner: Arc<FakeRunner>, temp: &TempDir) -> ReleasePipeline {
    ReleasePipeline::new(
        Arc::new(releases),
        runner,
        temp.path().join("downloads"),
        RetryPolicy::new(5, Duration::ZERO),
    )
}

fn scratch_is_empty(temp: &TempDir) -> bool {
    match std::fs::read_dir(temp.path().join("downloads")) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_missing_asset_list_downloads_nothing() {
    let temp = TempDir::new().unwrap();
    let releases = Arc::new(
        FakeReleases::new().with_document(DEPOSIT_CLI, json!({"message": "API rate limit exceeded"})),
    );
    let runner = FakeRunner::new();
    let pipeline = ReleasePipeline::new(
        releases.clone(),
        runner.clone(),
        temp.path().join("downloads"),
        RetryPolicy::none(),
    );

    let result = pipeline.install(&checksum_spec(), &target(&temp)).await;

    assert!(matches!(result, Err(WizardError::MalformedResponse { .. })));
    assert!(releases.downloads().is_empty());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_missing_companion_downloads_nothing() {
    let temp = TempDir::new().unwrap();
    let releases = Arc::new(
        FakeReleases::new().with_release(DEPOSIT_CLI, &[(DEPOSIT_BINARY, DEPOSIT_TARBALL)]),
    );
    let runner = FakeRunner::new();
    let pipeline = ReleasePipeline::new(
        releases.clone(),
        runner.clone(),
        temp.path().join("downloads"),
        RetryPolicy::none(),
    );

    let err = pipeline
        .install(&checksum_spec(), &target(&temp))
        .await
        .unwrap_err();

    assert!(matches!(err, WizardError::MissingAsset { ref suffix } if suffix == "linux-amd64.sha256"));
    assert!(releases.downloads().is_empty());
}

#[tokio::test]
async fn test_checksum_mismatch_removes_downloads() {
    let temp = TempDir::new().unwrap();
    let releases = FakeReleases::new().with_release(
        DEPOSIT_CLI,
        &[
            (DEPOSIT_BINARY, DEPOSIT_TARBALL),
            (DEPOSIT_CHECKSUM, sha256_hex(b"something else").as_bytes()),
        ],
    );
    let runner = FakeRunner::new();
    let pipeline = pipeline(releases, runner.clone(), &temp);

    let result = pipeline.install(&checksum_spec(), &target(&temp)).await;

    assert!(matches!(result, Err(WizardError::ChecksumMismatch { .. })));
    assert_eq!(runner.count("tar"), 0);
    assert!(scratch_is_empty(&temp));
}

#[tokio::test]
async fn test_checksum_match_extracts_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    // Published checksum files end with a newline and may be upper case
    let published = format!("{}\n", sha256_hex(DEPOSIT_TARBALL).to_uppercase());
    let releases = FakeReleases::new().with_release(
        DEPOSIT_CLI,
        &[
            (DEPOSIT_BINARY, DEPOSIT_TARBALL),
            (DEPOSIT_CHECKSUM, published.as_bytes()),
        ],
    );
    let runner = FakeRunner::new();
    let pipeline = pipeline(releases, runner.clone(), &temp);

    assert_ok!(pipeline.install(&checksum_spec(), &target(&temp)).await);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("tar xvf "));
    assert!(calls[0].contains(DEPOSIT_BINARY));
    assert!(calls[0].contains("--strip-components 2 --directory"));
    assert!(temp.path().join("install").is_dir());
    assert!(scratch_is_empty(&temp));
}

#[tokio::test]
async fn test_failed_signature_halts_before_extraction() {
    let temp = TempDir::new().unwrap();
    let releases = FakeReleases::new().with_release(LIGHTHOUSE, &lighthouse_assets());
    let runner = FakeRunner::new();
    runner.fail_on("gpg --verify");
    let pipeline = pipeline(releases, runner.clone(), &temp);

    let result = pipeline.install(&signed_spec(), &target(&temp)).await;

    assert!(matches!(result, Err(WizardError::SignatureVerification { .. })));
    assert_eq!(runner.count("--recv-keys"), 1);
    assert_eq!(runner.count("tar"), 0);
    assert!(scratch_is_empty(&temp));
}

#[tokio::test]
async fn test_signed_release_selects_matching_assets() {
    let temp = TempDir::new().unwrap();
    let releases = FakeReleases::new().with_release(LIGHTHOUSE, &lighthouse_assets());
    let runner = FakeRunner::new();
    let pipeline = pipeline(releases, runner.clone(), &temp);

    assert_ok!(
        pipeline
            .install(
                &signed_spec(),
                &InstallTarget {
                    dir: temp.path().join("bin"),
                    strip_components: None,
                },
            )
            .await
    );

    let calls = runner.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[1].ends_with("lighthouse-v1.0.0-x86_64-unknown-linux-gnu.tar.gz.asc"));
    assert!(calls[2].contains("lighthouse-v1.0.0-x86_64-unknown-linux-gnu.tar.gz --directory"));
    assert!(!calls[2].contains("aarch64"));
}

#[tokio::test]
async fn test_key_retrieval_gives_up_after_six_attempts() {
    let runner = FakeRunner::new();
    runner.fail_on("--recv-keys");
    let verifier = ArtifactVerifier::new(runner.clone(), RetryPolicy::new(5, Duration::ZERO));

    let err = verifier
        .receive_key("keyserver.ubuntu.com", "15E66D941F697E28F49381F426416DC3F30674B0")
        .await
        .unwrap_err();

    assert!(matches!(err, WizardError::KeyRetrieval { attempts: 6, .. }));
    assert_eq!(runner.count("--recv-keys"), 6);
}

#[tokio::test(start_paused = true)]
async fn test_key_retrieval_waits_between_attempts() {
    let runner = FakeRunner::new();
    runner.fail_on("--recv-keys");
    let verifier = ArtifactVerifier::new(runner.clone(), RetryPolicy::default());

    let started = tokio::time::Instant::now();
    let result = verifier
        .receive_key("keyserver.ubuntu.com", "15E66D941F697E28F49381F426416DC3F30674B0")
        .await;

    // Five waits of ten seconds between six attempts
    assert_eq!(started.elapsed(), Duration::from_secs(50));
    assert!(matches!(result, Err(WizardError::KeyRetrieval { attempts: 6, .. })));
    assert_eq!(runner.count("--recv-keys"), 6);
}

#[tokio::test]
async fn test_unreachable_index_is_a_network_error() {
    let temp = TempDir::new().unwrap();
    let pipeline = pipeline(FakeReleases::new(), FakeRunner::new(), &temp);

    let result = pipeline.install(&signed_spec(), &target(&temp)).await;

    assert_err!(&result);
    assert!(matches!(result, Err(WizardError::Network(_))));
}
