//! # Pitch Engine Module
//!
//! The boundary between the realtime pipeline and whatever estimates pitch.
//! The pipeline only knows the `PitchEngine` capability: hand it a full
//! analysis window, get back a frequency (or the "no pitch" sentinel).
//!
//! Engines travel across the thread boundary in serialized form, as an
//! `EngineDescriptor` encoded to bytes, and are constructed on the realtime
//! side when the `init` message arrives.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mcleod::McLeodEngine;

pub use crate::notes::{cents_offset, note_from_frequency};

/// Result of running an engine over one window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Estimate {
    /// Frequency in Hz; `<= 0.0` means no usable pitch.
    pub frequency: f32,
    /// Confidence of the estimate (0.0 to 1.0).
    pub clarity: f32,
}

impl Estimate {
    pub const NONE: Estimate = Estimate {
        frequency: 0.0,
        clarity: 0.0,
    };
}

/// A unit that consumes a fixed-size sample window and produces a frequency
/// estimate.
pub trait PitchEngine: Send {
    /// Runs the engine over `window`, which always holds exactly the window
    /// size the engine was constructed with.
    fn detect(&mut self, window: &[f32]) -> Estimate;
}

/// Errors raised while constructing an engine from an `init` message.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine descriptor could not be decoded: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("Invalid analysis window size: {0}")]
    InvalidWindowSize(usize),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),
}

/// Available engine implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// McLeod pitch method (normalized square difference).
    McLeod,
}

/// Serializable engine parameters. The bytes of this struct are what the UI
/// side sends to the realtime side in the `init` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDescriptor {
    pub algorithm: Algorithm,
    /// Minimum sum of squared samples for a window to be analyzed at all.
    pub power_threshold: f32,
    /// Minimum normalized peak height for a pitch to be reported.
    pub clarity_threshold: f32,
    /// Fraction of the highest peak a candidate must reach to be picked.
    pub pick_threshold: f32,
}

impl Default for EngineDescriptor {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::McLeod,
            power_threshold: 5.0,
            clarity_threshold: 0.6,
            pick_threshold: 0.95,
        }
    }
}

impl EngineDescriptor {
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a plain struct of numbers and a unit enum cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Builds an engine from the serialized descriptor carried by `init`.
pub fn construct(
    engine_bytes: &[u8],
    sample_rate: f32,
    window_size: usize,
) -> Result<Box<dyn PitchEngine>, EngineError> {
    if window_size < 4 {
        return Err(EngineError::InvalidWindowSize(window_size));
    }
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(EngineError::InvalidSampleRate(sample_rate));
    }

    let descriptor = EngineDescriptor::from_bytes(engine_bytes)?;
    let engine: Box<dyn PitchEngine> = match descriptor.algorithm {
        Algorithm::McLeod => Box::new(McLeodEngine::new(sample_rate, window_size, &descriptor)),
    };
    Ok(engine)
}
