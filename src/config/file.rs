//! TOML configuration file loading
//!
//! Supports `~/.config/moodtune/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoodtuneConfigFile {
    /// Emotion decision layer tuning
    #[serde(default)]
    pub decision: DecisionFileConfig,

    /// Track library layout
    #[serde(default)]
    pub library: LibraryFileConfig,

    /// Playback behaviour
    #[serde(default)]
    pub playback: PlaybackFileConfig,
}

/// Decision layer configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionFileConfig {
    /// Minimum detector confidence (0.2 to 0.5)
    pub confidence_threshold: Option<f32>,

    /// Observations kept for majority voting (5 to 20)
    pub history_size: Option<usize>,

    /// Seconds a candidate must hold before it is committed
    pub stability_secs: Option<f64>,

    /// Process every Kth detector frame
    pub frame_interval: Option<u32>,

    /// Observations required before a candidate is produced
    pub min_observations: Option<usize>,
}

/// Track library configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryFileConfig {
    /// Directory holding one sub-directory per category
    pub root: Option<String>,

    /// Category for detector labels nobody claims
    pub fallback: Option<String>,

    /// Audio file extensions to pick up
    pub extensions: Option<Vec<String>>,

    /// Category definitions; replaces the defaults when present
    pub categories: Option<Vec<CategoryFileConfig>>,
}

/// One playback category
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryFileConfig {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub dir: Option<String>,
}

/// Playback configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackFileConfig {
    /// How often to check whether the current track finished
    pub poll_interval_ms: Option<u64>,

    /// Delay before retrying after an audio backend failure
    pub retry_delay_ms: Option<u64>,
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. Without one, the standard path
/// is tried and any problem falls back to defaults with a warning.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<MoodtuneConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(MoodtuneConfigFile::default());
    };

    if !path.exists() {
        return Ok(MoodtuneConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(MoodtuneConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(MoodtuneConfigFile::default())
        }
    }
}

/// Return the config file path: `~/.config/moodtune/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("moodtune").join("config.toml"))
}
