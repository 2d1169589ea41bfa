//! Bridge configuration
//!
//! ```toml
//! library = "target/release/libgame.so"
//! base_path = "assets"
//! warn_resolution_passes = 64
//! warn_pending_after_ticks = 120
//!
//! [symbols]
//! spawn = "spawn_entity"
//! ```

use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Exported entry point names of the guest module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolNames {
    pub construct: String,
    pub load: String,
    pub init: String,
    pub register: String,
    pub spawn: String,
    pub tick: String,
    pub unload: String,
}

impl Default for SymbolNames {
    fn default() -> Self {
        Self {
            construct: "create_game".into(),
            load: "load".into(),
            init: "init".into(),
            register: "register_prefabs".into(),
            spawn: "spawn".into(),
            tick: "tick".into(),
            unload: "unload".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Path of the guest shared library
    pub library: PathBuf,
    /// Handed to the guest's `init` as its asset root
    pub base_path: PathBuf,
    pub symbols: SymbolNames,
    /// Warn when a tick needs more resolution sweeps than this. Resolution
    /// itself always runs to its fixed point.
    pub warn_resolution_passes: usize,
    /// Warn once about entities pending this long. 0 disables the warning.
    pub warn_pending_after_ticks: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            library: PathBuf::new(),
            base_path: PathBuf::from("."),
            symbols: SymbolNames::default(),
            warn_resolution_passes: 64,
            warn_pending_after_ticks: 120,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| MirrorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.warn_resolution_passes == 0 {
            return Err(MirrorError::Config(
                "warn_resolution_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
