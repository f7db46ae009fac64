//! Track playback to the default output device

use std::path::Path;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use super::AudioBackend;
use super::decode::{decode_file, resample};
use super::track::TrackSlot;
use crate::{Error, Result};

/// Plays tracks on the default output device without blocking
///
/// `play` only opens the stream; decoding and resampling happen on a
/// loader thread while the callback outputs silence. The controller polls
/// completion through [`AudioBackend::is_finished`].
pub struct CpalBackend {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    track: Arc<TrackSlot>,
}

impl CpalBackend {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device or no f32 output config is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let default_config = device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?;
        let sample_rate = default_config.sample_rate();

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.sample_format() == SampleFormat::F32
                    && c.channels() <= 2
                    && c.min_sample_rate() <= sample_rate
                    && c.max_sample_rate() >= sample_rate
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config.with_sample_rate(sample_rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio playback initialized"
        );

        let idle = TrackSlot::ready(Vec::new());

        Ok(Self {
            device,
            config,
            stream: None,
            track: idle,
        })
    }

    /// Output sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn build_stream(&self, name: String) -> Result<Stream> {
        let channels = usize::from(self.config.channels);
        let track = Arc::clone(&self.track);
        let on_error = Arc::clone(&self.track);
        let mut position = 0usize;

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Some(samples) = track.samples() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(position).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        if position < samples.len() {
                            position += 1;
                        }
                    }
                    if position >= samples.len() {
                        track.finish();
                    }
                },
                move |err| on_error.fail(&name, &err.to_string()),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))
    }
}

impl AudioBackend for CpalBackend {
    fn play(&mut self, track: &Path) -> Result<()> {
        self.stop();

        let name = track.display().to_string();
        let path = track.to_path_buf();
        let rate = self.sample_rate();
        self.track = TrackSlot::spawn(&name, move || {
            let audio = decode_file(&path)?;
            resample(&audio.samples, audio.sample_rate, rate)
        })?;

        let started = self.build_stream(name).and_then(|stream| {
            stream.play().map_err(|e| Error::Audio(e.to_string()))?;
            Ok(stream)
        });

        match started {
            Ok(stream) => {
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                self.track.finish();
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("playback stream closed");
        }
        self.track.finish();
    }

    fn is_finished(&self) -> bool {
        self.track.is_finished()
    }
}
