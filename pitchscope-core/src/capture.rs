//! # Audio Capture Module
//!
//! Opens the default microphone through CPAL and feeds every callback's
//! samples straight into a `PitchProcessor`. The processor is moved into the
//! stream callback, so analysis runs on the audio thread and results leave it
//! only through the processor's outbound channel.
//!
//! ## Features
//! - Default input device, preferring the configured sample rate
//! - Interleaved F32, I16 and U16 input mixed down to mono `f32`
//! - Failures classified into user-facing `CaptureError`s
//!
//! Dropping the returned `CaptureStream` stops capture.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, DefaultStreamConfigError, PlayStreamError, SampleFormat, Stream, StreamConfig};
use log::{error, info};
use thiserror::Error;

use crate::processor::PitchProcessor;

/// Why a capture session could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Audio capture is not supported on this system.")]
    Unsupported,
    #[error("Microphone access was denied. Allow access to the microphone and try again.")]
    PermissionDenied,
    #[error("No microphone was found. Connect an input device and try again.")]
    NoDevice,
    #[error("The audio stream could not be opened: {0}")]
    Stream(String),
}

impl CaptureError {
    /// Sorts a backend message into the closest variant.
    fn from_backend(description: &str) -> Self {
        let lower = description.to_lowercase();
        if lower.contains("permission") || lower.contains("denied") || lower.contains("not allowed") {
            CaptureError::PermissionDenied
        } else {
            CaptureError::Stream(description.to_string())
        }
    }
}

impl From<DefaultStreamConfigError> for CaptureError {
    fn from(e: DefaultStreamConfigError) -> Self {
        match e {
            DefaultStreamConfigError::DeviceNotAvailable => CaptureError::NoDevice,
            DefaultStreamConfigError::StreamTypeNotSupported => CaptureError::Unsupported,
            DefaultStreamConfigError::BackendSpecific { err } => Self::from_backend(&err.description),
        }
    }
}

impl From<BuildStreamError> for CaptureError {
    fn from(e: BuildStreamError) -> Self {
        match e {
            BuildStreamError::DeviceNotAvailable => CaptureError::NoDevice,
            BuildStreamError::StreamConfigNotSupported => CaptureError::Unsupported,
            BuildStreamError::BackendSpecific { err } => Self::from_backend(&err.description),
            other => CaptureError::Stream(other.to_string()),
        }
    }
}

impl From<PlayStreamError> for CaptureError {
    fn from(e: PlayStreamError) -> Self {
        match e {
            PlayStreamError::DeviceNotAvailable => CaptureError::NoDevice,
            PlayStreamError::BackendSpecific { err } => Self::from_backend(&err.description),
        }
    }
}

/// The default input device with a chosen stream configuration, ready to be
/// started once the processor for its sample rate exists.
pub struct InputDevice {
    device: cpal::Device,
    config: StreamConfig,
    format: SampleFormat,
}

impl InputDevice {
    /// Opens the default input device. A configuration at
    /// `preferred_rate` is used when the device supports one with its
    /// default channel count; otherwise the device default is taken.
    pub fn open_default(preferred_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        info!(
            "[CAPTURE] Using audio input device: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let supported = device.default_input_config()?;
        let preferred = cpal::SampleRate(preferred_rate);
        let matching = device.supported_input_configs().ok().and_then(|configs| {
            configs
                .filter(|c| {
                    c.channels() == supported.channels()
                        && c.min_sample_rate() <= preferred
                        && c.max_sample_rate() >= preferred
                })
                .max_by_key(|c| c.max_sample_rate())
                .map(|c| c.with_sample_rate(preferred))
        });
        let chosen = matching.unwrap_or(supported);
        let format = chosen.sample_format();
        let config: StreamConfig = chosen.into();

        info!(
            "[CAPTURE] Selected {} Hz, {} ch, {:?}",
            config.sample_rate.0, config.channels, format
        );

        Ok(Self { device, config, format })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Builds and starts the stream, moving `processor` into its callback.
    pub fn start(self, mut processor: PitchProcessor) -> Result<CaptureStream, CaptureError> {
        let channels = self.config.channels as usize;
        let err_fn = |e: cpal::StreamError| error!("[CAPTURE] Audio stream error: {e}");
        let mut mono: Vec<f32> = Vec::new();

        let stream = match self.format {
            SampleFormat::F32 => self.device.build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if channels == 1 {
                        processor.process(data);
                    } else {
                        mix_mono_f32(data, channels, &mut mono);
                        processor.process(&mono);
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &self.config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    mix_mono_i16(data, channels, &mut mono);
                    processor.process(&mono);
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => self.device.build_input_stream(
                &self.config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    mix_mono_u16(data, channels, &mut mono);
                    processor.process(&mono);
                },
                err_fn,
                None,
            )?,
            other => {
                error!("[CAPTURE] Unsupported sample format {other:?}");
                return Err(CaptureError::Unsupported);
            }
        };

        stream.play()?;
        info!("[CAPTURE] Stream started at {} Hz", self.sample_rate());

        Ok(CaptureStream { _stream: stream })
    }
}

/// A running input stream. Capture stops when this is dropped.
pub struct CaptureStream {
    _stream: Stream,
}

// Mixdown helpers reuse `out` so the callback does not allocate once warm.

fn mix_mono_f32(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        data.chunks(channels.max(1))
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
    );
}

fn mix_mono_i16(data: &[i16], channels: usize, out: &mut Vec<f32>) {
    const SCALE: f32 = i16::MAX as f32;
    out.clear();
    out.extend(data.chunks(channels.max(1)).map(|frame| {
        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
        sum as f32 / (frame.len() as f32 * SCALE)
    }));
}

fn mix_mono_u16(data: &[u16], channels: usize, out: &mut Vec<f32>) {
    // 0 is -1.0, 32768 is 0.0
    const MID: f32 = 32768.0;
    out.clear();
    out.extend(data.chunks(channels.max(1)).map(|frame| {
        let sum: f32 = frame.iter().map(|&s| (s as f32 - MID) / MID).sum();
        sum / frame.len() as f32
    }));
}
