//! Service accounts, data directories and systemd units for each client.

use std::path::{Path, PathBuf};

use crate::domain::Network;

/// A long-running client managed by systemd
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Unit name without the `.service` suffix
    pub service: String,

    /// Dedicated unprivileged account running the service
    pub account: String,

    pub data_dir: PathBuf,

    /// Restrict the data directory to its owner (0700)
    pub restricted: bool,
}

impl ServiceSpec {
    pub fn new(
        service: impl Into<String>,
        account: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        restricted: bool,
    ) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
            data_dir: data_dir.into(),
            restricted,
        }
    }

    /// Geth, the execution client
    pub fn execution_client(data_root: &Path) -> Self {
        Self::new("geth", "goeth", data_root.join("goethereum"), false)
    }

    /// Lighthouse beacon node
    pub fn beacon_node(lighthouse_root: &Path) -> Self {
        Self::new(
            "lighthousebeacon",
            "lighthousebeacon",
            lighthouse_root.join("beacon"),
            true,
        )
    }

    /// Lighthouse validator client
    pub fn validator_client(lighthouse_root: &Path) -> Self {
        Self::new(
            "lighthousevalidator",
            "lighthousevalidator",
            lighthouse_root.join("validators"),
            true,
        )
    }

    pub fn unit_file_name(&self) -> String {
        format!("{}.service", self.service)
    }

    /// Mode applied to the data directory, if any
    pub fn data_dir_mode(&self) -> Option<u32> {
        self.restricted.then_some(0o700)
    }
}

fn unit(description: &str, account: &str, exec_start: &str) -> String {
    format!(
        "[Unit]
Description={description}
Wants=network-online.target
After=network-online.target

[Service]
User={account}
Group={account}
Type=simple
Restart=always
RestartSec=5
ExecStart={exec_start}

[Install]
WantedBy=multi-user.target
"
    )
}

/// Unit for Geth; Pyrmont validators deposit on Goerli
pub fn execution_client_unit(network: Network, spec: &ServiceSpec) -> String {
    let mut exec_start = String::from("/usr/bin/geth");
    if let Some(flag) = network.geth_flag() {
        exec_start.push(' ');
        exec_start.push_str(flag);
    }
    exec_start.push_str(&format!(" --http --datadir {}", spec.data_dir.display()));

    unit(
        &format!("Go Ethereum Client - Geth ({})", network.label()),
        &spec.account,
        &exec_start,
    )
}

/// Unit for the Lighthouse beacon node
pub fn beacon_node_unit(
    network: Network,
    spec: &ServiceSpec,
    bin_dir: &Path,
    lighthouse_root: &Path,
) -> String {
    let exec_start = format!(
        "{} bn --network {} --datadir {} --staking --eth1-endpoints http://127.0.0.1:8545",
        bin_dir.join("lighthouse").display(),
        network,
        lighthouse_root.display(),
    );

    unit(
        &format!("Lighthouse Eth2 Client Beacon Node ({})", network.label()),
        &spec.account,
        &exec_start,
    )
}

/// Unit for the Lighthouse validator client
pub fn validator_client_unit(
    network: Network,
    spec: &ServiceSpec,
    bin_dir: &Path,
    lighthouse_root: &Path,
) -> String {
    let exec_start = format!(
        "{} vc --network {} --datadir {}",
        bin_dir.join("lighthouse").display(),
        network,
        lighthouse_root.display(),
    );

    unit(
        &format!("Lighthouse Eth2 Client Validator Client ({})", network.label()),
        &spec.account,
        &exec_start,
    )
}
