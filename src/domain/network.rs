//! Target Ethereum network for a wizard run.
//!
//! The network is chosen once and then drives every network-dependent
//! decision: service unit contents, the deposit tool `--chain` argument,
//! and the execution client's network flag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// Main network with real value
    Mainnet,

    /// Pyrmont test network
    Pyrmont,
}

impl Network {
    /// All networks, in the order they are offered to the user
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Pyrmont];

    /// Identifier passed to `--chain` / `--network` arguments
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Pyrmont => "pyrmont",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Network::Mainnet => "Mainnet",
            Network::Pyrmont => "Pyrmont",
        }
    }

    /// Extra flag for Geth; Pyrmont deposits live on Goerli
    pub fn geth_flag(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => None,
            Network::Pyrmont => Some("--goerli"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "pyrmont" => Ok(Network::Pyrmont),
            other => Err(format!("Unknown network: {}", other)),
        }
    }
}
