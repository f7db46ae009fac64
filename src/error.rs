//! Error types for moodtune

use thiserror::Error;

/// Result type alias for moodtune operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in moodtune
///
/// The decision layer (mapper, gate, history, debouncer) never produces
/// these; they come from setup and from the audio/detector edges.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Audio file decode error
    #[error("decode error: {0}")]
    Decode(String),

    /// Track library error
    #[error("library error: {0}")]
    Library(String),

    /// Emotion detector error
    #[error("detector error: {0}")]
    Detector(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
