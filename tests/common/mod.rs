//! In-process fakes for the wizard's external collaborators.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use eth2_wizard::adapters::{CommandOutput, CommandRunner, CommandSpec, Gate, Prompt};
use eth2_wizard::artifacts::{DownloadSink, ReleaseSource};
use eth2_wizard::config::WizardConfig;
use eth2_wizard::core::{RetryPolicy, StepContext};
use eth2_wizard::domain::Network;
use eth2_wizard::WizardError;

type Hook = Box<dyn Fn(&CommandSpec) + Send + Sync>;

/// Records every command; fails or reacts to those containing a pattern.
///
/// Keeps a user table: `id -u NAME` succeeds only once `useradd` created NAME.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    hooks: Mutex<Vec<(String, Hook)>>,
    accounts: Mutex<HashSet<String>>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Commands containing `pattern` exit with status 1
    pub fn fail_on(&self, pattern: &str) {
        self.failing.lock().unwrap().push(pattern.to_string());
    }

    /// Run `hook` whenever a command containing `pattern` executes
    pub fn on<F>(&self, pattern: &str, hook: F)
    where
        F: Fn(&CommandSpec) + Send + Sync + 'static,
    {
        self.hooks
            .lock()
            .unwrap()
            .push((pattern.to_string(), Box::new(hook)));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.accounts.lock().unwrap().contains(name)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, WizardError> {
        let line = spec.to_string();
        self.calls.lock().unwrap().push(line.clone());

        for (pattern, hook) in self.hooks.lock().unwrap().iter() {
            if line.contains(pattern.as_str()) {
                hook(spec);
            }
        }

        let failed = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|pattern| line.contains(pattern.as_str()));
        if failed {
            return Ok(CommandOutput::with_code(1));
        }

        let name = spec.args.last().cloned().unwrap_or_default();
        match spec.program.as_str() {
            "id" if !self.has_account(&name) => return Ok(CommandOutput::with_code(1)),
            "useradd" => {
                self.accounts.lock().unwrap().insert(name);
            }
            _ => {}
        }
        Ok(CommandOutput::with_code(0))
    }
}

/// Release index serving canned documents and file bodies
#[derive(Default)]
pub struct FakeReleases {
    releases: HashMap<String, Value>,
    files: HashMap<String, Vec<u8>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeReleases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `repo`'s latest release with the given assets and bodies
    pub fn with_release(mut self, repo: &str, assets: &[(&str, &[u8])]) -> Self {
        let entries: Vec<Value> = assets
            .iter()
            .map(|(name, body)| {
                let url = format!("https://releases.test/{}/{}", repo, name);
                self.files.insert(url.clone(), body.to_vec());
                json!({"name": name, "browser_download_url": url})
            })
            .collect();

        self.releases
            .insert(repo.to_string(), json!({"tag_name": "v1.0.0", "assets": entries}));
        self
    }

    /// Publish an arbitrary release document
    pub fn with_document(mut self, repo: &str, document: Value) -> Self {
        self.releases.insert(repo.to_string(), document);
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseSource for FakeReleases {
    async fn latest_release(&self, repo: &str) -> Result<Value, WizardError> {
        self.releases
            .get(repo)
            .cloned()
            .ok_or_else(|| WizardError::Network(format!("{} returned 404 Not Found", repo)))
    }

    async fn download(&self, url: &str, sink: &mut DownloadSink) -> Result<(), WizardError> {
        self.downloads.lock().unwrap().push(url.to_string());
        let body = self
            .files
            .get(url)
            .ok_or_else(|| WizardError::Network(format!("{} returned 404 Not Found", url)))?;

        // Two chunks so the digest spans several writes
        let (head, tail) = body.split_at(body.len() / 2);
        sink.write_chunk(head).await?;
        sink.write_chunk(tail).await?;
        Ok(())
    }
}

/// Answers gates from a script; gates not listed are accepted
pub struct ScriptedPrompt {
    declined: Vec<&'static str>,
    network: Option<Network>,
    asked: Mutex<Vec<&'static str>>,
}

impl ScriptedPrompt {
    pub fn accepting(network: Network) -> Self {
        Self {
            declined: Vec::new(),
            network: Some(network),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn declining(title: &'static str) -> Self {
        Self {
            declined: vec![title],
            network: Some(Network::Pyrmont),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn without_network() -> Self {
        Self {
            declined: Vec::new(),
            network: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<&'static str> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn confirm(&self, gate: &Gate) -> Result<bool, WizardError> {
        self.asked.lock().unwrap().push(gate.title);
        Ok(!self.declined.contains(&gate.title))
    }

    async fn select_network(
        &self,
        gate: &Gate,
        _choices: &[Network],
    ) -> Result<Option<Network>, WizardError> {
        self.asked.lock().unwrap().push(gate.title);
        Ok(self.network)
    }

    async fn notify(&self, _title: &str, _text: &str) -> Result<(), WizardError> {
        Ok(())
    }
}

/// Configuration with every path below `temp` and no retry delay
pub fn test_config(temp: &TempDir) -> WizardConfig {
    let mut config = WizardConfig::with_work_dir(temp.path().join("work"));
    config.unit_dir = temp.path().join("units");
    config.bin_dir = temp.path().join("bin");
    config.data_root = temp.path().join("var-lib");
    config.signing.retry = RetryPolicy::new(5, std::time::Duration::ZERO);
    config
}

pub fn context(
    config: WizardConfig,
    runner: Arc<FakeRunner>,
    releases: FakeReleases,
    prompt: Arc<dyn Prompt>,
) -> StepContext {
    StepContext {
        config,
        runner,
        releases: Arc::new(releases),
        prompt,
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}

/// Lighthouse release with a signature companion and an unrelated asset
pub fn lighthouse_assets() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("lighthouse-v1.0.0-x86_64-unknown-linux-gnu.tar.gz", &b"lighthouse tarball"[..]),
        ("lighthouse-v1.0.0-x86_64-unknown-linux-gnu.tar.gz.asc", &b"signature"[..]),
        ("lighthouse-v1.0.0-aarch64-unknown-linux-gnu.tar.gz", &b"arm tarball"[..]),
    ]
}

pub const DEPOSIT_TARBALL: &[u8] = b"deposit cli tarball";
pub const DEPOSIT_BINARY: &str = "eth2.0-deposit-cli-v1.0.0-linux-amd64.tar.gz";
pub const DEPOSIT_CHECKSUM: &str = "eth2.0-deposit-cli-v1.0.0-linux-amd64.sha256";

/// Writes a deposit data file and `keystores` keystores, as the tool would
pub fn write_keys(dir: &std::path::Path, keystores: usize) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("deposit_data-1607000000.json"), "[]").unwrap();
    for idx in 0..keystores {
        std::fs::write(
            dir.join(format!("keystore-m_12381_3600_{}_0_0-1607000000.json", idx)),
            "{}",
        )
        .unwrap();
    }
}
