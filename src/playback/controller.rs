//! Playback controller - owns the single "now playing" slot

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::AudioBackend;
use crate::emotion::PlaybackCategory;
use crate::library::{PlaylistPool, PlaylistSelector};

/// What the controller is doing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    /// Category driving track selection
    pub committed: Option<PlaybackCategory>,
    /// Track currently loaded in the backend
    pub current_track: Option<PathBuf>,
    /// Whether `current_track` is playing
    pub is_playing: bool,
}

/// Result of asking the controller to start something
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// A track started
    Started(PathBuf),
    /// The category has no tracks; `first_notice` is true the first time
    /// this category came up empty in the session
    EmptyPool { first_notice: bool },
    /// The backend refused the track; a retry is scheduled
    Failed(PathBuf),
}

/// Drives the audio backend from committed-category changes and track ends
///
/// Exactly one track is active at a time: the backend is always stopped
/// before another track is started.
pub struct PlaybackController<B> {
    backend: B,
    pool: PlaylistPool,
    selector: PlaylistSelector,
    state: PlaybackState,
    last_played: Option<PathBuf>,
    warned_empty: HashSet<PlaybackCategory>,
    retry_delay: Duration,
    retry_at: Option<Instant>,
}

impl<B: AudioBackend> PlaybackController<B> {
    /// Create a controller
    #[must_use]
    pub fn new(
        backend: B,
        pool: PlaylistPool,
        selector: PlaylistSelector,
        retry_delay: Duration,
    ) -> Self {
        Self {
            backend,
            pool,
            selector,
            state: PlaybackState::default(),
            last_played: None,
            warned_empty: HashSet::new(),
            retry_delay,
            retry_at: None,
        }
    }

    /// React to a new committed category: stop, reselect, start
    pub fn on_committed_category_changed(
        &mut self,
        category: PlaybackCategory,
        now: Instant,
    ) -> PlaybackOutcome {
        self.stop_current();
        let outcome = self.start_from(&category, now);
        self.state.committed = Some(category);
        outcome
    }

    /// The current track ended on its own: continue with the same category
    ///
    /// Returns `None` when nothing is committed.
    pub fn on_track_finished_naturally(&mut self, now: Instant) -> Option<PlaybackOutcome> {
        if let Some(track) = &self.state.current_track {
            tracing::debug!(track = %track.display(), "track finished");
        }
        self.stop_current();

        let category = self.state.committed.clone()?;
        Some(self.start_from(&category, now))
    }

    /// Check for natural completion or a due retry
    ///
    /// Called on a timer independent of frame processing.
    pub fn poll(&mut self, now: Instant) -> Option<PlaybackOutcome> {
        if self.state.is_playing {
            if self.backend.is_finished() {
                return self.on_track_finished_naturally(now);
            }
            return None;
        }

        match self.retry_at {
            Some(at) if now >= at => {
                self.retry_at = None;
                tracing::debug!("retrying playback after backend failure");
                self.on_track_finished_naturally(now)
            }
            _ => None,
        }
    }

    /// Stop playback and clear the now-playing slot
    pub fn shutdown(&mut self) {
        self.stop_current();
        self.retry_at = None;
        tracing::debug!("playback controller shut down");
    }

    /// Forget the committed category and per-session warnings
    pub fn reset(&mut self) {
        self.shutdown();
        self.state = PlaybackState::default();
        self.last_played = None;
        self.warned_empty.clear();
    }

    /// Current playback state
    #[must_use]
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// The track library
    #[must_use]
    pub const fn pool(&self) -> &PlaylistPool {
        &self.pool
    }

    /// The audio backend
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    fn stop_current(&mut self) {
        if self.state.is_playing || self.state.current_track.is_some() {
            self.backend.stop();
        }
        self.state.is_playing = false;
        self.state.current_track = None;
    }

    fn start_from(&mut self, category: &PlaybackCategory, now: Instant) -> PlaybackOutcome {
        self.retry_at = None;

        let Some(track) = self
            .selector
            .select(category, &self.pool, self.last_played.as_deref())
            .map(Path::to_path_buf)
        else {
            let first_notice = self.warned_empty.insert(category.clone());
            if first_notice {
                tracing::warn!(category = %category, "no tracks available, staying silent");
            }
            return PlaybackOutcome::EmptyPool { first_notice };
        };

        self.last_played = Some(track.clone());

        match self.backend.play(&track) {
            Ok(()) => {
                tracing::info!(category = %category, track = %track.display(), "playing");
                self.state.current_track = Some(track.clone());
                self.state.is_playing = true;
                PlaybackOutcome::Started(track)
            }
            Err(e) => {
                tracing::warn!(
                    category = %category,
                    track = %track.display(),
                    error = %e,
                    "failed to start track"
                );
                self.backend.stop();
                self.retry_at = Some(now + self.retry_delay);
                PlaybackOutcome::Failed(track)
            }
        }
    }
}
