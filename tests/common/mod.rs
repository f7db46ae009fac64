//! Shared test utilities
#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moodtune::detector::{BoundingBox, DetectorFrame, FaceDetection};
use moodtune::playback::TrackSlot;
use moodtune::{
    AudioBackend, Config, Error, PlaybackCategory, PlaybackController, PlaylistPool,
    PlaylistSelector, Result, Session,
};

/// Everything the mock backend was asked to do
#[derive(Debug, Default)]
pub struct BackendLog {
    pub played: Vec<PathBuf>,
    pub stops: usize,
    pub active: usize,
    pub max_active: usize,
    pub finished: bool,
    pub fail_next: bool,
    pub stream_errors: usize,
}

/// Audio backend that records calls instead of making sound
#[derive(Debug, Clone, Default)]
pub struct MockBackend(pub Rc<RefCell<BackendLog>>);

impl MockBackend {
    /// Mark the current track as played to the end
    pub fn finish_track(&self) {
        self.0.borrow_mut().finished = true;
    }

    /// The output device dies while a track is playing
    pub fn lose_stream(&self) {
        let mut log = self.0.borrow_mut();
        log.stream_errors += 1;
        log.active = 0;
        log.finished = true;
    }

    /// Make the next `play` call fail
    pub fn fail_next(&self) {
        self.0.borrow_mut().fail_next = true;
    }

    pub fn played(&self) -> Vec<PathBuf> {
        self.0.borrow().played.clone()
    }

    pub fn max_active(&self) -> usize {
        self.0.borrow().max_active
    }
}

impl AudioBackend for MockBackend {
    fn play(&mut self, track: &Path) -> Result<()> {
        let mut log = self.0.borrow_mut();
        if log.fail_next {
            log.fail_next = false;
            return Err(Error::Audio("device busy".to_string()));
        }
        log.played.push(track.to_path_buf());
        log.active += 1;
        log.max_active = log.max_active.max(log.active);
        log.finished = false;
        drop(log);
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.0.borrow_mut();
        log.stops += 1;
        log.active = 0;
        log.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.0.borrow().finished
    }
}

/// Backend whose tracks take `load_time` to decode on a loader thread
#[derive(Debug)]
pub struct SlowLoadingBackend {
    pub load_time: Duration,
    pub track: Option<Arc<TrackSlot>>,
}

impl SlowLoadingBackend {
    pub const fn new(load_time: Duration) -> Self {
        Self {
            load_time,
            track: None,
        }
    }
}

impl AudioBackend for SlowLoadingBackend {
    fn play(&mut self, track: &Path) -> Result<()> {
        let load_time = self.load_time;
        self.track = Some(TrackSlot::spawn(&track.display().to_string(), move || {
            std::thread::sleep(load_time);
            Ok(vec![0.0; 48_000])
        })?);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(track) = self.track.take() {
            track.finish();
        }
    }

    fn is_finished(&self) -> bool {
        self.track.as_ref().is_none_or(|t| t.is_finished())
    }
}

/// In-memory log sink for asserting on emitted warnings
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Run `f` with a WARN-level subscriber writing into this buffer
    pub fn capture_warnings<T>(&self, f: impl FnOnce() -> T) -> T {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    /// Captured lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A frame with one face
pub fn face_frame(label: &str, confidence: f32) -> DetectorFrame {
    DetectorFrame {
        faces: vec![face(label, confidence, 100)],
        timestamp_ms: None,
    }
}

/// A square face of the given side length
pub fn face(label: &str, confidence: f32, side: i64) -> FaceDetection {
    FaceDetection {
        bbox: BoundingBox {
            x: 0,
            y: 0,
            width: side,
            height: side,
        },
        label: label.to_string(),
        confidence,
    }
}

/// Pool with two happy tracks, one neutral track and no sad tracks
pub fn test_pool() -> PlaylistPool {
    PlaylistPool::from_tracks([
        (
            PlaybackCategory::new("happy"),
            vec![PathBuf::from("happy/a.mp3"), PathBuf::from("happy/b.mp3")],
        ),
        (PlaybackCategory::new("sad"), vec![]),
        (
            PlaybackCategory::new("neutral"),
            vec![PathBuf::from("neutral/a.mp3")],
        ),
    ])
}

/// Default config processing every frame
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.decision.frame_interval = 1;
    config
}

/// Session over [`test_pool`] backed by a mock
pub fn test_session(config: &Config) -> (Session<MockBackend>, MockBackend) {
    let backend = MockBackend::default();
    let controller = PlaybackController::new(
        backend.clone(),
        test_pool(),
        PlaylistSelector::with_seed(42),
        Duration::from_secs(2),
    );
    let session = Session::new(config, controller).expect("failed to build session");
    (session, backend)
}
