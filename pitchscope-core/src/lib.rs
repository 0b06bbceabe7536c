// pitchscope-core/src/lib.rs

//! The core logic for the pitchscope live pitch visualizer.
//! This crate is responsible for buffering microphone audio into analysis
//! windows, running the pitch engine on the realtime side, carrying results
//! across the thread boundary, and turning pitch history into drawing
//! operations. It is completely headless and contains no GUI code.

pub mod channel;
pub mod config;
pub mod dial;
pub mod engine;
pub mod mcleod;
pub mod notes;
pub mod processor;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod timeline;
pub mod window;

#[cfg(feature = "capture")]
pub mod capture;

/// Frequencies at or below this floor (in Hz) are treated as "no pitch".
pub const MIN_FREQUENCY: f32 = 1.0;

/// A single detected pitch, as seen by the UI side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEvent {
    /// The detected frequency in Hz.
    pub frequency: f32,
    /// Milliseconds since the session started.
    pub timestamp_ms: u64,
    /// The confidence of the detected frequency (0.0 to 1.0).
    pub clarity: f32,
}

impl PitchEvent {
    pub fn new(frequency: f32, timestamp_ms: u64, clarity: f32) -> Self {
        Self {
            frequency,
            timestamp_ms,
            clarity: clarity.clamp(0.0, 1.0),
        }
    }

    /// Whether this event carries a usable pitch.
    pub fn is_pitched(&self) -> bool {
        self.frequency > MIN_FREQUENCY
    }
}
