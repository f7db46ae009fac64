//! Temporal decision layer
//!
//! Turns a jittery stream of per-frame emotion labels into a stable
//! committed category:
//!
//! ```text
//! label ──► CategoryMapper ──► ConfidenceGate ──► EmotionHistory ──► StabilityDebouncer
//!                                  (drop)          (majority vote)      (commit events)
//! ```

mod category;
mod debounce;
pub mod gate;
mod history;

pub use category::{CategoryMapper, PlaybackCategory};
pub use debounce::{CommitEvent, DEFAULT_STABILITY_THRESHOLD, DebounceState, StabilityDebouncer};
pub use gate::{CONFIDENCE_THRESHOLD_RANGE, ConfidenceGate, DEFAULT_CONFIDENCE_THRESHOLD};
pub use history::{DEFAULT_HISTORY_SIZE, EmotionHistory, HISTORY_SIZE_RANGE, Observation};
