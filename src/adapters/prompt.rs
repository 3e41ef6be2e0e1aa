//! Confirmation gates.
//!
//! The wizard only needs two answers from the operator: "proceed or quit"
//! and "which network". How the question is rendered is up to the
//! implementation.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::core::WizardError;
use crate::domain::Network;

/// A question shown before a step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub title: &'static str,
    pub text: &'static str,

    /// Label of the "proceed" answer (e.g. "Install")
    pub accept: &'static str,
}

/// Source of operator decisions
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Ask whether to proceed; `false` means quit
    async fn confirm(&self, gate: &Gate) -> Result<bool, WizardError>;

    /// Ask for a network; `None` means quit
    async fn select_network(
        &self,
        gate: &Gate,
        choices: &[Network],
    ) -> Result<Option<Network>, WizardError>;

    /// Show a message that needs no answer
    async fn notify(&self, title: &str, text: &str) -> Result<(), WizardError>;
}

/// Line-oriented prompt on stdin/stdout
#[derive(Debug)]
pub struct TerminalPrompt {
    stdin: Mutex<BufReader<Stdin>>,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn show(&self, title: &str, text: &str) -> Result<(), WizardError> {
        let mut stdout = tokio::io::stdout();
        let banner = format!("\n=== {} ===\n{}\n", title, text.trim_end());
        stdout.write_all(banner.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn ask(&self, question: &str) -> Result<String, WizardError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = self.stdin.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(WizardError::Prompt("stdin closed".to_string()));
        }
        Ok(line.trim().to_string())
    }
}

#[async_trait]
impl Prompt for TerminalPrompt {
    async fn confirm(&self, gate: &Gate) -> Result<bool, WizardError> {
        self.show(gate.title, gate.text).await?;

        loop {
            let answer = self
                .ask(&format!("[{}] or [Q]uit: ", gate.accept))
                .await?;
            if let Some(accepted) = parse_confirmation(&answer, gate.accept) {
                return Ok(accepted);
            }
        }
    }

    async fn select_network(
        &self,
        gate: &Gate,
        choices: &[Network],
    ) -> Result<Option<Network>, WizardError> {
        self.show(gate.title, gate.text).await?;
        for (idx, network) in choices.iter().enumerate() {
            println!("  {}) {}", idx + 1, network.label());
        }

        loop {
            let answer = self.ask("Network number or [Q]uit: ").await?;
            if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
                return Ok(None);
            }
            if let Ok(idx) = answer.parse::<usize>() {
                if let Some(network) = idx.checked_sub(1).and_then(|i| choices.get(i)) {
                    return Ok(Some(*network));
                }
            }
            if let Ok(network) = answer.parse::<Network>() {
                if choices.contains(&network) {
                    return Ok(Some(network));
                }
            }
        }
    }

    async fn notify(&self, title: &str, text: &str) -> Result<(), WizardError> {
        self.show(title, text).await
    }
}

/// Interpret a free-form answer to a gate
fn parse_confirmation(answer: &str, accept: &str) -> Option<bool> {
    let answer = answer.trim().to_lowercase();
    let accept = accept.to_lowercase();

    if answer == "q" || answer == "quit" || answer == "n" || answer == "no" {
        Some(false)
    } else if answer == "y"
        || answer == "yes"
        || (!answer.is_empty() && accept.starts_with(&answer))
    {
        Some(true)
    } else {
        None
    }
}

/// Answers gates from command-line presets, deferring everything else.
///
/// `--yes` accepts every gate; `--network` answers the network selection.
pub struct PresetPrompt<P> {
    inner: P,
    assume_yes: bool,
    network: Option<Network>,
}

impl<P: Prompt> PresetPrompt<P> {
    pub fn new(inner: P, assume_yes: bool, network: Option<Network>) -> Self {
        Self {
            inner,
            assume_yes,
            network,
        }
    }
}

#[async_trait]
impl<P: Prompt> Prompt for PresetPrompt<P> {
    async fn confirm(&self, gate: &Gate) -> Result<bool, WizardError> {
        if self.assume_yes {
            tracing::info!(gate = gate.title, "Gate accepted by --yes");
            return Ok(true);
        }
        self.inner.confirm(gate).await
    }

    async fn select_network(
        &self,
        gate: &Gate,
        choices: &[Network],
    ) -> Result<Option<Network>, WizardError> {
        match self.network {
            Some(network) if choices.contains(&network) => Ok(Some(network)),
            _ => self.inner.select_network(gate, choices).await,
        }
    }

    async fn notify(&self, title: &str, text: &str) -> Result<(), WizardError> {
        self.inner.notify(title, text).await
    }
}
