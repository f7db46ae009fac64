//! Tracks loaded off the playback thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::{Error, Result};

/// Samples for one started track, filled in by a loader thread
///
/// The audio callback reads it without locking: it plays silence until
/// the samples arrive. A load or stream failure marks the track finished,
/// so the controller moves on at its next poll.
#[derive(Debug, Default)]
pub struct TrackSlot {
    samples: OnceLock<Vec<f32>>,
    finished: AtomicBool,
    failed: AtomicBool,
}

impl TrackSlot {
    /// Run `load` on a background thread and return the slot immediately
    ///
    /// # Errors
    ///
    /// Returns error if the loader thread cannot be started
    pub fn spawn<F>(name: &str, load: F) -> Result<Arc<Self>>
    where
        F: FnOnce() -> Result<Vec<f32>> + Send + 'static,
    {
        let slot = Arc::new(Self::default());
        let loader = Arc::clone(&slot);
        let track = name.to_string();

        std::thread::Builder::new()
            .name("moodtune-load".to_string())
            .spawn(move || match load() {
                Ok(samples) => {
                    tracing::debug!(track = %track, samples = samples.len(), "track loaded");
                    loader.set_samples(samples);
                }
                Err(e) => loader.fail(&track, &e.to_string()),
            })
            .map_err(|e| Error::Audio(format!("failed to start loader: {e}")))?;

        Ok(slot)
    }

    /// Slot whose samples are already in memory
    #[must_use]
    pub fn ready(samples: Vec<f32>) -> Arc<Self> {
        let slot = Arc::new(Self::default());
        slot.set_samples(samples);
        slot
    }

    fn set_samples(&self, samples: Vec<f32>) {
        if samples.is_empty() {
            self.finished.store(true, Ordering::Release);
        }
        // A slot is only ever filled once
        let _ = self.samples.set(samples);
    }

    /// Decoded samples, `None` while still loading
    #[must_use]
    pub fn samples(&self) -> Option<&[f32]> {
        self.samples.get().map(Vec::as_slice)
    }

    /// Mark the track as played to the end
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Mark the track as dead; it counts as finished
    pub fn fail(&self, track: &str, reason: &str) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            tracing::warn!(track, error = reason, "track playback failed");
        }
        self.finished.store(true, Ordering::Release);
    }

    /// Whether the track ended, was stopped or failed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Whether loading or the output stream failed
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}
