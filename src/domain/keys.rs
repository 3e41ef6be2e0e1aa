//! Validator key material produced by the deposit tool.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Locations of freshly generated validator keys.
///
/// A value of this type only exists when the key directory held exactly one
/// deposit data file and at least one keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    /// Directory the deposit tool wrote into; used as the import source
    pub validator_keys_dir: PathBuf,

    /// The `deposit_data-*.json` file
    pub deposit_data_path: PathBuf,

    /// Every `keystore-*.json` file, sorted by path
    pub keystore_paths: Vec<PathBuf>,
}

impl KeyMaterial {
    /// Number of validators the keys cover
    pub fn validator_count(&self) -> usize {
        self.keystore_paths.len()
    }
}
