//! Session context
//!
//! Owns every stateful piece of the decision layer plus the playback
//! controller. Detector frames and playback polls both go through `&mut
//! Session`, so state updates are serialized without locks.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::Result;
use crate::config::Config;
use crate::detector::DetectorFrame;
use crate::emotion::{
    CategoryMapper, ConfidenceGate, EmotionHistory, Observation, PlaybackCategory,
    StabilityDebouncer,
};
use crate::playback::{AudioBackend, PlaybackController, PlaybackOutcome};

/// History entries included in a snapshot
const SNAPSHOT_HISTORY_LEN: usize = 5;

/// What happened to one detector frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Dropped by frame sampling
    Skipped,
    /// Processed, but no face was reported
    NoFace,
    /// Face found but below the confidence floor
    Rejected { label: String, confidence: f32 },
    /// Observation added; no commit this frame
    Observed {
        category: PlaybackCategory,
        candidate: Option<PlaybackCategory>,
    },
    /// The committed category changed and playback reacted
    Committed {
        category: PlaybackCategory,
        playback: PlaybackOutcome,
    },
}

/// Most recent face seen by the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastDetection {
    pub label: String,
    pub category: PlaybackCategory,
    pub confidence: f32,
    pub accepted: bool,
}

/// Pending candidate and time left before it commits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingSnapshot {
    pub category: PlaybackCategory,
    pub remaining_secs: f64,
}

/// Read-only view of the session for status displays
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub at: DateTime<Utc>,
    pub frames_seen: u64,
    pub last_detection: Option<LastDetection>,
    pub candidate: Option<PlaybackCategory>,
    pub committed: Option<PlaybackCategory>,
    pub pending: Option<PendingSnapshot>,
    /// Latest history entries, oldest first
    pub history: Vec<PlaybackCategory>,
    pub now_playing: Option<PathBuf>,
}

/// One emotion-driven playback session
pub struct Session<B> {
    id: Uuid,
    started_at: Instant,
    mapper: CategoryMapper,
    gate: ConfidenceGate,
    history: EmotionHistory,
    debouncer: StabilityDebouncer,
    controller: PlaybackController<B>,
    frame_interval: u32,
    frame_index: u64,
    last_detection: Option<LastDetection>,
}

impl<B: AudioBackend> Session<B> {
    /// Build a session from validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if the category configuration is invalid
    pub fn new(config: &Config, controller: PlaybackController<B>) -> Result<Self> {
        let decision = &config.decision;
        let id = Uuid::new_v4();

        tracing::info!(
            session_id = %id,
            confidence_threshold = decision.confidence_threshold,
            history_size = decision.history_size,
            stability_secs = decision.stability_threshold.as_secs_f64(),
            frame_interval = decision.frame_interval,
            "session started"
        );

        Ok(Self {
            id,
            started_at: Instant::now(),
            mapper: CategoryMapper::from_config(&config.library)?,
            gate: ConfidenceGate::new(decision.confidence_threshold),
            history: EmotionHistory::new(decision.history_size)
                .with_min_observations(decision.min_observations),
            debouncer: StabilityDebouncer::new(decision.stability_threshold),
            controller,
            frame_interval: decision.frame_interval.max(1),
            frame_index: 0,
            last_detection: None,
        })
    }

    /// Decision-layer time for a frame
    ///
    /// Frames carrying `timestamp_ms` are placed relative to the session
    /// start so replays reproduce their original timing; others use `now`.
    #[must_use]
    pub fn frame_time(&self, frame: &DetectorFrame, now: Instant) -> Instant {
        frame
            .timestamp_ms
            .map_or(now, |ms| self.started_at + Duration::from_millis(ms))
    }

    /// Run one detector frame through the pipeline
    ///
    /// `now` is the wall-clock time of arrival; it drives playback retries.
    pub fn handle_frame(&mut self, frame: &DetectorFrame, now: Instant) -> FrameOutcome {
        let index = self.frame_index;
        self.frame_index += 1;
        if index % u64::from(self.frame_interval) != 0 {
            return FrameOutcome::Skipped;
        }

        let Some(face) = frame.largest_face() else {
            tracing::trace!(frame = index, "no face");
            return FrameOutcome::NoFace;
        };

        let category = self.mapper.map(&face.label);
        let accepted = self.gate.accept(face.confidence);
        self.last_detection = Some(LastDetection {
            label: face.label.clone(),
            category: category.clone(),
            confidence: face.confidence,
            accepted,
        });

        if !accepted {
            tracing::trace!(
                frame = index,
                label = %face.label,
                confidence = face.confidence,
                "below confidence floor"
            );
            return FrameOutcome::Rejected {
                label: face.label.clone(),
                confidence: face.confidence,
            };
        }

        let at = self.frame_time(frame, now);
        self.history
            .push(Observation::new(category.clone(), face.confidence, at));
        let candidate = self.history.candidate();

        tracing::debug!(
            frame = index,
            label = %face.label,
            category = %category,
            confidence = face.confidence,
            candidate = ?candidate.as_ref().map(PlaybackCategory::as_str),
            "observation"
        );

        match self.debouncer.evaluate(candidate.as_ref(), at) {
            Some(event) => {
                let playback = self
                    .controller
                    .on_committed_category_changed(event.category.clone(), now);
                FrameOutcome::Committed {
                    category: event.category,
                    playback,
                }
            }
            None => FrameOutcome::Observed {
                category,
                candidate,
            },
        }
    }

    /// Check for track completion or a due playback retry
    pub fn poll_playback(&mut self, now: Instant) -> Option<PlaybackOutcome> {
        self.controller.poll(now)
    }

    /// Current state for display
    ///
    /// `now` should be on the same clock as the frames (see [`Self::frame_time`]).
    #[must_use]
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let pending = self
            .debouncer
            .pending()
            .zip(self.debouncer.remaining(now))
            .map(|(category, remaining)| PendingSnapshot {
                category: category.clone(),
                remaining_secs: remaining.as_secs_f64(),
            });

        SessionSnapshot {
            session_id: self.id,
            at: Utc::now(),
            frames_seen: self.frame_index,
            last_detection: self.last_detection.clone(),
            candidate: self.history.candidate(),
            committed: self.debouncer.committed().cloned(),
            pending,
            history: self
                .history
                .recent(SNAPSHOT_HISTORY_LEN)
                .into_iter()
                .cloned()
                .collect(),
            now_playing: self.controller.state().current_track.clone(),
        }
    }

    /// Start over: empty history, nothing committed, playback stopped
    pub fn reset(&mut self) {
        self.history.clear();
        self.debouncer.reset();
        self.controller.reset();
        self.frame_index = 0;
        self.last_detection = None;
        self.started_at = Instant::now();
        tracing::info!(session_id = %self.id, "session reset");
    }

    /// Stop playback and discard pending state
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
        self.history.clear();
        self.debouncer.reset();
        tracing::info!(
            session_id = %self.id,
            frames = self.frame_index,
            uptime_secs = self.started_at.elapsed().as_secs(),
            "session ended"
        );
    }

    /// Session identifier
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Session start time
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Accepted observations
    #[must_use]
    pub const fn history(&self) -> &EmotionHistory {
        &self.history
    }

    /// Stability debouncer
    #[must_use]
    pub const fn debouncer(&self) -> &StabilityDebouncer {
        &self.debouncer
    }

    /// Playback controller
    #[must_use]
    pub const fn controller(&self) -> &PlaybackController<B> {
        &self.controller
    }
}
