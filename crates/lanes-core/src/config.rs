use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning for the two lazily materialized row lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Visible graph rows.
    #[serde(default)]
    pub rows: RowCacheConfig,
    /// Layout (cell) rows.
    #[serde(default)]
    pub layout: RowCacheConfig,
}

/// How a [`crate::list::CompressedList`] keeps generated rows around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCacheConfig {
    /// Every `checkpoint_interval`-th row is kept permanently.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    /// Contiguous recently generated rows kept in memory.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
}

impl Default for RowCacheConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            window_capacity: default_window_capacity(),
        }
    }
}

impl RowCacheConfig {
    /// Same settings with zero values raised to 1.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            checkpoint_interval: self.checkpoint_interval.max(1),
            window_capacity: self.window_capacity.max(1),
        }
    }
}

const fn default_checkpoint_interval() -> usize {
    64
}

const fn default_window_capacity() -> usize {
    256
}

/// Read a config file.
///
/// # Errors
///
/// Fails if the file can't be read or isn't valid TOML for [`GraphConfig`].
pub fn load_config(path: &Path) -> Result<GraphConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<GraphConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read `<config_dir>/lanes/config.toml`, or defaults if there is none.
///
/// # Errors
///
/// Same as [`load_config`] when the file exists.
pub fn load_user_config() -> Result<GraphConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(GraphConfig::default());
    };

    let path = config_dir.join("lanes/config.toml");
    if !path.exists() {
        return Ok(GraphConfig::default());
    }

    load_config(&path)
}
