//! Adapter interfaces for external systems.
//!
//! The wizard drives two collaborators it does not own: operating-system
//! commands (package manager, gpg, tar, useradd, systemctl, the deposit tool)
//! and the operator answering confirmation gates. Both sit behind traits so
//! the pipeline can be exercised without root or a terminal.

pub mod command;
pub mod prompt;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
pub use prompt::{Gate, PresetPrompt, Prompt, TerminalPrompt};
