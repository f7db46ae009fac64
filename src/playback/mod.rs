//! Audio playback
//!
//! The controller only needs three operations from an audio backend:
//! start a track, stop it, and report whether it has finished.

mod controller;
mod cpal_backend;
mod decode;
mod track;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::Result;

pub use controller::{PlaybackController, PlaybackOutcome, PlaybackState};
pub use cpal_backend::CpalBackend;
pub use decode::{DecodedAudio, decode_file, resample};
pub use track::TrackSlot;

/// Plays one track at a time
pub trait AudioBackend {
    /// Start playing `track`, replacing anything already playing
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be decoded or the device refuses it
    fn play(&mut self, track: &Path) -> Result<()>;

    /// Stop playback; a no-op when idle
    fn stop(&mut self);

    /// Whether the last started track has played to the end (or was stopped)
    fn is_finished(&self) -> bool;
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn play(&mut self, track: &Path) -> Result<()> {
        (**self).play(track)
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

/// Backend that plays nothing, for dry runs without an audio device
///
/// Every track "lasts" a fixed simulated duration.
#[derive(Debug)]
pub struct NullBackend {
    track_length: Duration,
    current: Option<(PathBuf, Instant)>,
}

impl NullBackend {
    /// Create a backend whose tracks last `track_length`
    #[must_use]
    pub const fn new(track_length: Duration) -> Self {
        Self {
            track_length,
            current: None,
        }
    }
}

impl AudioBackend for NullBackend {
    fn play(&mut self, track: &Path) -> Result<()> {
        tracing::info!(track = %track.display(), "dry run: would play");
        self.current = Some((track.to_path_buf(), Instant::now()));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((track, _)) = self.current.take() {
            tracing::debug!(track = %track.display(), "dry run: stopped");
        }
    }

    fn is_finished(&self) -> bool {
        self.current
            .as_ref()
            .is_none_or(|(_, started)| started.elapsed() >= self.track_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_backend_lifecycle() {
        let mut backend = NullBackend::new(Duration::from_secs(60));
        assert!(backend.is_finished());

        backend.play(Path::new("song.mp3")).unwrap();
        assert!(!backend.is_finished());

        backend.stop();
        assert!(backend.is_finished());
    }

    #[test]
    fn test_null_backend_track_ends() {
        let mut backend = NullBackend::new(Duration::ZERO);
        backend.play(Path::new("song.mp3")).unwrap();
        assert!(backend.is_finished());
    }

    #[test]
    fn test_boxed_backend_delegates() {
        let mut backend: Box<dyn AudioBackend> = Box::new(NullBackend::new(Duration::from_secs(60)));
        backend.play(Path::new("song.mp3")).unwrap();
        assert!(!backend.is_finished());
    }
}
