//! Configuration management for moodtune
//!
//! Precedence is CLI flag > environment > TOML file > default.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::emotion::{
    CONFIDENCE_THRESHOLD_RANGE, CategoryMapper, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_HISTORY_SIZE, DEFAULT_STABILITY_THRESHOLD, HISTORY_SIZE_RANGE,
};
use crate::{Error, Result};

use file::MoodtuneConfigFile;

/// Default frame sampling interval (process every 3rd frame)
pub const DEFAULT_FRAME_INTERVAL: u32 = 3;

/// moodtune configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Emotion decision layer tuning
    pub decision: DecisionConfig,

    /// Track library layout
    pub library: LibraryConfig,

    /// Playback behaviour
    pub playback: PlaybackConfig,
}

/// Emotion decision layer configuration
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// Minimum detector confidence for a frame to count
    pub confidence_threshold: f32,

    /// Observations kept for majority voting
    pub history_size: usize,

    /// Time a candidate must hold before it is committed
    pub stability_threshold: Duration,

    /// Process every Kth detector frame
    pub frame_interval: u32,

    /// Observations required before any candidate is produced
    pub min_observations: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            history_size: DEFAULT_HISTORY_SIZE,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            min_observations: 1,
        }
    }
}

/// Track library configuration
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Directory holding one sub-directory per category
    pub root: PathBuf,

    /// Category for detector labels nobody claims
    pub fallback: String,

    /// Audio file extensions to pick up (lowercase, no dot)
    pub extensions: Vec<String>,

    /// Category definitions
    pub categories: Vec<CategoryConfig>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("songs"),
            fallback: "neutral".to_string(),
            extensions: ["mp3", "wav", "ogg", "flac"]
                .into_iter()
                .map(String::from)
                .collect(),
            categories: vec![
                CategoryConfig::new("happy", &["happy"]),
                CategoryConfig::new("sad", &["sad", "fear", "angry"]),
                CategoryConfig::new("neutral", &["neutral", "surprise", "disgust"]),
            ],
        }
    }
}

/// One playback category and the detector labels that map to it
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    /// Category name
    pub name: String,

    /// Detector labels mapped to this category
    pub labels: Vec<String>,

    /// Track directory; `<root>/<name>` when unset
    pub dir: Option<PathBuf>,
}

impl CategoryConfig {
    /// Category whose tracks live in `<root>/<name>`
    #[must_use]
    pub fn new(name: &str, labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            labels: labels.iter().map(ToString::to_string).collect(),
            dir: None,
        }
    }

    /// Resolve the track directory against the library root
    #[must_use]
    pub fn dir_in(&self, root: &Path) -> PathBuf {
        self.dir.as_ref().map_or_else(
            || root.join(&self.name),
            |dir| {
                if dir.is_absolute() {
                    dir.clone()
                } else {
                    root.join(dir)
                }
            },
        )
    }
}

/// Playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// How often to check whether the current track finished
    pub poll_interval: Duration,

    /// Delay before retrying after an audio backend failure
    pub retry_delay: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Values given on the command line; they win over everything else
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Explicit config file path
    pub config_path: Option<PathBuf>,
    pub songs_dir: Option<PathBuf>,
    pub confidence_threshold: Option<f32>,
    pub history_size: Option<usize>,
    pub stability_secs: Option<f64>,
    pub frame_interval: Option<u32>,
}

impl Config {
    /// Load configuration from the file, process environment and overrides
    ///
    /// # Errors
    ///
    /// Returns error if the config file is invalid or any value is out of range
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let fc = file::load_config_file(overrides.config_path.as_deref())?;
        Self::from_sources(fc, |key| std::env::var(key).ok(), overrides)
    }

    /// Merge a parsed file, an environment lookup and overrides
    ///
    /// # Errors
    ///
    /// Returns error if an environment value does not parse or the merged
    /// configuration fails validation
    pub fn from_sources<E>(fc: MoodtuneConfigFile, env: E, overrides: &Overrides) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // Decision config (cli > env > toml > default)
        let confidence_threshold = overrides
            .confidence_threshold
            .or(env_parse(&env, "MOODTUNE_CONFIDENCE_THRESHOLD")?)
            .or(fc.decision.confidence_threshold)
            .unwrap_or(defaults.decision.confidence_threshold);
        let history_size = overrides
            .history_size
            .or(env_parse(&env, "MOODTUNE_HISTORY_SIZE")?)
            .or(fc.decision.history_size)
            .unwrap_or(defaults.decision.history_size);
        let stability_threshold = match overrides
            .stability_secs
            .or(env_parse(&env, "MOODTUNE_STABILITY_SECS")?)
            .or(fc.decision.stability_secs)
        {
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|e| {
                Error::Config(format!("stability threshold {secs}s is invalid: {e}"))
            })?,
            None => defaults.decision.stability_threshold,
        };
        let frame_interval = overrides
            .frame_interval
            .or(env_parse(&env, "MOODTUNE_FRAME_INTERVAL")?)
            .or(fc.decision.frame_interval)
            .unwrap_or(defaults.decision.frame_interval);
        let min_observations = fc
            .decision
            .min_observations
            .unwrap_or(defaults.decision.min_observations);

        // Library config (cli > env > toml > default)
        let root = overrides
            .songs_dir
            .clone()
            .or_else(|| env("MOODTUNE_SONGS_DIR").map(PathBuf::from))
            .or_else(|| fc.library.root.map(PathBuf::from))
            .unwrap_or(defaults.library.root);
        let categories = fc.library.categories.map_or(defaults.library.categories, |cats| {
            cats.into_iter()
                .map(|c| CategoryConfig {
                    name: c.name,
                    labels: c.labels,
                    dir: c.dir.map(PathBuf::from),
                })
                .collect()
        });
        let extensions = fc
            .library
            .extensions
            .map_or(defaults.library.extensions, |exts| {
                exts.iter()
                    .map(|e| e.trim_start_matches('.').to_lowercase())
                    .collect()
            });

        let playback = PlaybackConfig {
            poll_interval: fc
                .playback
                .poll_interval_ms
                .map_or(defaults.playback.poll_interval, Duration::from_millis),
            retry_delay: fc
                .playback
                .retry_delay_ms
                .map_or(defaults.playback.retry_delay, Duration::from_millis),
        };

        let config = Self {
            decision: DecisionConfig {
                confidence_threshold,
                history_size,
                stability_threshold,
                frame_interval,
                min_observations,
            },
            library: LibraryConfig {
                root,
                fallback: fc.library.fallback.unwrap_or(defaults.library.fallback),
                extensions,
                categories,
            },
            playback,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every value against its documented range
    ///
    /// # Errors
    ///
    /// Returns the first violation found
    pub fn validate(&self) -> Result<()> {
        let d = &self.decision;

        if !CONFIDENCE_THRESHOLD_RANGE.contains(&d.confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence threshold {} outside {}..={}",
                d.confidence_threshold,
                CONFIDENCE_THRESHOLD_RANGE.start(),
                CONFIDENCE_THRESHOLD_RANGE.end()
            )));
        }
        if !HISTORY_SIZE_RANGE.contains(&d.history_size) {
            return Err(Error::Config(format!(
                "history size {} outside {}..={}",
                d.history_size,
                HISTORY_SIZE_RANGE.start(),
                HISTORY_SIZE_RANGE.end()
            )));
        }
        if d.frame_interval == 0 {
            return Err(Error::Config("frame interval must be at least 1".to_string()));
        }
        if d.min_observations == 0 || d.min_observations > d.history_size {
            return Err(Error::Config(format!(
                "min observations {} outside 1..={}",
                d.min_observations, d.history_size
            )));
        }
        if self.playback.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }

        // Category rules (non-empty, unique labels, known fallback)
        CategoryMapper::from_config(&self.library)?;
        Ok(())
    }
}

/// Parse an environment variable, `None` when unset
fn env_parse<T, E>(env: &E, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    E: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key}: invalid value '{raw}'")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_are_valid() {
        let config =
            Config::from_sources(MoodtuneConfigFile::default(), no_env, &Overrides::default())
                .unwrap();

        assert!((config.decision.confidence_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.decision.history_size, 10);
        assert_eq!(config.decision.stability_threshold, Duration::from_secs(3));
        assert_eq!(config.decision.frame_interval, 3);
        assert_eq!(config.library.categories.len(), 3);
        assert_eq!(config.library.root, PathBuf::from("songs"));
    }

    #[test]
    fn test_precedence_cli_env_file() {
        let fc: MoodtuneConfigFile =
            toml::from_str("[decision]\nhistory_size = 6\nframe_interval = 5\nstability_secs = 1.5\n")
                .unwrap();
        let env = |key: &str| match key {
            "MOODTUNE_HISTORY_SIZE" => Some("8".to_string()),
            "MOODTUNE_FRAME_INTERVAL" => Some("2".to_string()),
            _ => None,
        };
        let overrides = Overrides {
            history_size: Some(12),
            ..Overrides::default()
        };

        let config = Config::from_sources(fc, env, &overrides).unwrap();
        assert_eq!(config.decision.history_size, 12);
        assert_eq!(config.decision.frame_interval, 2);
        assert_eq!(config.decision.stability_threshold, Duration::from_millis(1500));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let overrides = Overrides {
            confidence_threshold: Some(0.9),
            ..Overrides::default()
        };
        assert!(Config::from_sources(MoodtuneConfigFile::default(), no_env, &overrides).is_err());

        let overrides = Overrides {
            history_size: Some(3),
            ..Overrides::default()
        };
        assert!(Config::from_sources(MoodtuneConfigFile::default(), no_env, &overrides).is_err());

        let overrides = Overrides {
            stability_secs: Some(-1.0),
            ..Overrides::default()
        };
        assert!(Config::from_sources(MoodtuneConfigFile::default(), no_env, &overrides).is_err());

        let overrides = Overrides {
            frame_interval: Some(0),
            ..Overrides::default()
        };
        assert!(Config::from_sources(MoodtuneConfigFile::default(), no_env, &overrides).is_err());
    }

    #[test]
    fn test_bad_env_value_rejected() {
        let env = |key: &str| (key == "MOODTUNE_HISTORY_SIZE").then(|| "ten".to_string());
        let result = Config::from_sources(MoodtuneConfigFile::default(), env, &Overrides::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_categories() {
        let fc: MoodtuneConfigFile = toml::from_str(
            r#"
            [library]
            root = "/music"
            fallback = "calm"
            extensions = [".MP3"]

            [[library.categories]]
            name = "calm"
            labels = ["neutral", "sad"]

            [[library.categories]]
            name = "energetic"
            labels = ["happy", "surprise"]
            dir = "/mnt/party"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(fc, no_env, &Overrides::default()).unwrap();
        let root = &config.library.root;
        assert_eq!(config.library.extensions, vec!["mp3".to_string()]);
        assert_eq!(config.library.categories[0].dir_in(root), PathBuf::from("/music/calm"));
        assert_eq!(config.library.categories[1].dir_in(root), PathBuf::from("/mnt/party"));
    }

    #[test]
    fn test_unknown_fallback_rejected() {
        let fc: MoodtuneConfigFile = toml::from_str("[library]\nfallback = \"calm\"\n").unwrap();
        assert!(Config::from_sources(fc, no_env, &Overrides::default()).is_err());
    }
}
