//! Host configuration
//!
//! Loaded from `mirror.toml` (or the path given as the first argument):
//!
//! ```toml
//! [bridge]
//! library = "target/release/libgame.so"
//! base_path = "assets"
//!
//! [run]
//! ticks = 600
//! tick_interval_ms = 16
//!
//! [[scene.entities]]
//! name = "root"
//! mirror = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use void_mirror::BridgeConfig;
use void_scene::SceneDesc;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid host config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Mirror(#[from] void_mirror::MirrorError),

    #[error(transparent)]
    Scene(#[from] void_scene::SceneError),
}

/// Tick loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Ticks to run before shutting down. 0 runs until the guest faults.
    pub ticks: u64,
    /// Sleep between ticks
    pub tick_interval_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            tick_interval_ms: 16,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub bridge: BridgeConfig,
    pub run: RunConfig,
    pub scene: SceneDesc,
}

impl HostConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, HostError> {
        let config: Self = toml::from_str(text)?;
        config.bridge.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
