//! moodtune - emotion-driven ambient music
//!
//! Turns a noisy stream of per-frame facial-emotion classifications into a
//! stable "current emotion" and plays music to match:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │         Detector (external, JSON lines)               │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ largest face: label + confidence
//! ┌──────────────────────────▼───────────────────────────┐
//! │                     Session                           │
//! │  Mapper → Gate → History (vote) → Debouncer (commit)  │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ committed category changes
//! ┌──────────────────────────▼───────────────────────────┐
//! │   Playback controller → selector → audio backend      │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod detector;
pub mod emotion;
pub mod error;
pub mod library;
pub mod playback;
pub mod session;

pub use config::Config;
pub use detector::{DetectorFrame, FaceDetection, FrameSource};
pub use emotion::{
    CategoryMapper, ConfidenceGate, EmotionHistory, Observation, PlaybackCategory,
    StabilityDebouncer,
};
pub use error::{Error, Result};
pub use library::{PlaylistPool, PlaylistSelector};
pub use playback::{AudioBackend, CpalBackend, NullBackend, PlaybackController, PlaybackState};
pub use session::{FrameOutcome, Session, SessionSnapshot};
