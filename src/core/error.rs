//! Error taxonomy for the provisioning pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a wizard step
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed release response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Latest release has no asset ending with '{suffix}'")]
    MissingAsset { suffix: String },

    #[error("Failed to retrieve public key {key_id} after {attempts} attempts")]
    KeyRetrieval { key_id: String, attempts: u32 },

    #[error("Signature verification failed for {}", .path.display())]
    SignatureVerification { path: PathBuf },

    #[error("Checksum mismatch for {}: expected {expected}, computed {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("No validator keys generated in {}: {reason}", .dir.display())]
    NoKeysGenerated { dir: PathBuf, reason: String },

    #[error("Command `{command}` failed with {}", exit_label(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Failed to launch `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step requires {0} from an earlier step")]
    MissingState(&'static str),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

impl From<reqwest::Error> for WizardError {
    fn from(err: reqwest::Error) -> Self {
        WizardError::Network(err.to_string())
    }
}
