//! Operator-facing text for each confirmation gate.

use crate::adapters::Gate;

pub const WELCOME: Gate = Gate {
    title: "Eth2 Validator Wizard",
    text: "\
Welcome to the Eth2 Validator Wizard.

This assistant walks you through every step needed to run a validator on
an Ethereum 2.0 network. It installs and configures the required software
on this machine.

Questions and support: the ethstaker community on Discord
(discord.gg/e84CFep) and Reddit (reddit.com/r/ethstaker).",
    accept: "Start",
};

pub const NOT_ROOT_TITLE: &str = "Not a super user";

pub const NOT_ROOT_TEXT: &str = "\
The Eth2 Validator Wizard needs super user permissions to install system
packages, create service accounts and write systemd units.

Start it again with sudo.";

pub const OVERVIEW: Gate = Gate {
    title: "Becoming a validator",
    text: "\
Becoming an active validator takes these steps:

* Set aside 32 ETH for each validator you want to run. A single machine
  can run many validators.
* Install an Eth1 client and let it synchronize
* Install an Eth2 beacon node and let it synchronize
* Generate your validator keys
* Install an Eth2 validator client and import your keys
* Make the 32 ETH deposit for each validator
* Wait for activation, which can take hours or days",
    accept: "Keep going",
};

pub const NETWORK: Gate = Gate {
    title: "Network selection",
    text: "\
Mainnet is the network with real value. The other networks are for testing
and use nothing of real value.

Which network should this machine join?",
    accept: "Use this",
};

pub const EXECUTION_CLIENT: Gate = Gate {
    title: "Geth installation",
    text: "\
Geth, an Eth1 client, is installed next from the official Ethereum package
archive, so it receives the regular Ubuntu updates through APT.

A systemd service then keeps Geth running across reboots and crashes.
Syncing with the Ethereum 1.0 network starts right away and can take hours
or days, even with good hardware and a good connection.",
    accept: "Install",
};

pub const BEACON_NODE: Gate = Gate {
    title: "Lighthouse installation",
    text: "\
Lighthouse, an Eth2 client shipping both a beacon node and a validator
client, is installed next. The official binary is downloaded from GitHub
and its PGP signature is verified before it is extracted.

A systemd service then keeps the beacon node running across reboots and
crashes. Syncing with the Ethereum 2.0 network starts right away and can
take hours or days.",
    accept: "Install",
};

pub const KEY_GENERATION: Gate = Gate {
    title: "Generating keys",
    text: "\
Your validator keys are generated next. The official eth2.0-deposit-cli
binary is downloaded from GitHub, its SHA-256 checksum verified, and the
tool started.

The tool asks a few questions and creates the mnemonic every key derives
from. Store the mnemonic securely and privately: it can recreate your keys
and withdraw your funds.

Each validator you ask for needs its own 32 ETH deposit.",
    accept: "Generate",
};

pub const VALIDATOR_CLIENT: Gate = Gate {
    title: "Lighthouse validator client",
    text: "\
Your keystores are imported into the Lighthouse validator client next.
You will be asked for the keystore password chosen during key generation,
not your mnemonic.

A systemd service then keeps the validator client running across reboots
and crashes.",
    accept: "Configure",
};
