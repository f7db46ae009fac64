//! Detector frame sources

use std::io::BufRead;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;

use super::DetectorFrame;
use crate::{Error, Result};

/// Lines buffered between the input thread and the frame loop
const LINE_BUFFER: usize = 64;

/// Produces detector frames in camera order
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the stream has ended
    ///
    /// Must be cancel safe: it is polled inside `tokio::select!`.
    async fn next_frame(&mut self) -> Result<Option<DetectorFrame>>;
}

/// Reads one JSON frame per line from any async reader
///
/// Lines that fail to parse become empty frames: they still count as a
/// camera frame but carry no evidence.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: u64,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    /// Wrap a buffered reader
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl JsonLinesSource<BufReader<tokio::fs::File>> {
    /// Frames replayed from a file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened
    pub async fn open(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        tracing::info!(path = %path.display(), "replaying detector frames");
        Ok(Self::new(BufReader::new(file)))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> FrameSource for JsonLinesSource<R> {
    async fn next_frame(&mut self) -> Result<Option<DetectorFrame>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            self.line_no += 1;

            if let Some(frame) = parse_line(self.line_no, &line) {
                return Ok(Some(frame));
            }
        }
    }
}

/// Blank lines carry no frame; unparsable ones become empty frames
fn parse_line(line_no: u64, line: &str) -> Option<DetectorFrame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match DetectorFrame::from_json(line) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::warn!(line = line_no, error = %e, "unparsable detector frame");
            Some(DetectorFrame::default())
        }
    }
}

/// Reads lines on a dedicated OS thread and hands them over a channel
///
/// Used for standard input: a blocked read there cannot be cancelled, and
/// a detached thread does not hold up runtime shutdown the way a blocking
/// task would.
pub struct ThreadedLinesSource {
    rx: mpsc::Receiver<std::io::Result<String>>,
    line_no: u64,
}

impl ThreadedLinesSource {
    /// Frames from standard input
    ///
    /// # Errors
    ///
    /// Returns error if the reader thread cannot be started
    pub fn stdin() -> Result<Self> {
        Self::spawn(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read `reader` line by line on a new thread
    ///
    /// # Errors
    ///
    /// Returns error if the reader thread cannot be started
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Result<Self> {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);

        std::thread::Builder::new()
            .name("moodtune-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            })
            .map_err(|e| Error::Detector(format!("failed to start input reader: {e}")))?;

        Ok(Self { rx, line_no: 0 })
    }
}

#[async_trait]
impl FrameSource for ThreadedLinesSource {
    async fn next_frame(&mut self) -> Result<Option<DetectorFrame>> {
        loop {
            let Some(line) = self.rx.recv().await else {
                return Ok(None);
            };
            self.line_no += 1;

            if let Some(frame) = parse_line(self.line_no, &line?) {
                return Ok(Some(frame));
            }
        }
    }
}

/// Detector running as a child process that prints frames on stdout
///
/// The child is killed when the source is dropped.
pub struct SidecarSource {
    child: Child,
    frames: JsonLinesSource<BufReader<ChildStdout>>,
}

impl SidecarSource {
    /// Spawn `command` through the platform shell
    ///
    /// # Errors
    ///
    /// Returns error if the process cannot be started
    pub fn spawn(command: &str) -> Result<Self> {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Detector(format!("failed to start '{command}': {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Detector("detector stdout unavailable".to_string()))?;

        tracing::info!(command, pid = child.id(), "detector sidecar started");

        Ok(Self {
            child,
            frames: JsonLinesSource::new(BufReader::new(stdout)),
        })
    }
}

#[async_trait]
impl FrameSource for SidecarSource {
    async fn next_frame(&mut self) -> Result<Option<DetectorFrame>> {
        let frame = self.frames.next_frame().await?;
        if frame.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => tracing::info!(%status, "detector sidecar exited"),
                Ok(None) => tracing::info!("detector sidecar closed its output"),
                Err(e) => tracing::warn!(error = %e, "failed to query detector sidecar"),
            }
        }
        Ok(frame)
    }
}
