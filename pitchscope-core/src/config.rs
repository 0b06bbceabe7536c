//! # Configuration Module
//!
//! Pipeline settings with sensible defaults for every field, loadable from a
//! JSON file. A partial file only overrides the fields it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::engine::EngineDescriptor;

/// Number of samples handed to the engine per analysis.
pub const DEFAULT_WINDOW_SIZE: usize = 1024;

/// Sample rate requested from the capture device.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Top-level settings for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window_size: usize,
    pub preferred_sample_rate: u32,
    pub engine: EngineDescriptor,
    /// Interval between render-loop ticks.
    pub frame_interval_ms: u64,
    pub timeline: TimelineConfig,
    pub dial: DialConfig,
}

/// Time window and throttling of the scrolling timeline, all in ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Events this old or older are pruned on every render pass.
    pub horizon_ms: u64,
    /// Width of the visible time axis.
    pub time_span_ms: u64,
    /// How far the "now" marker sits from the left edge, in time.
    pub time_offset_ms: u64,
    /// Consecutive events further apart than this are not connected.
    pub gap_ms: u64,
    /// Minimum spacing between two history insertions.
    pub throttle_ms: u64,
}

/// Appearance of the circular tuning dial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialConfig {
    pub needle_opacity: f32,
    /// Distance between the outer ring and the note labels, in pixels.
    pub label_gap: f32,
    pub label_font_size: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            preferred_sample_rate: DEFAULT_SAMPLE_RATE,
            engine: EngineDescriptor::default(),
            frame_interval_ms: 16,
            timeline: TimelineConfig::default(),
            dial: DialConfig::default(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            horizon_ms: 5000,
            time_span_ms: 6000,
            time_offset_ms: 5000,
            gap_ms: 500,
            throttle_ms: 17,
        }
    }
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            needle_opacity: 0.8,
            label_gap: 4.0,
            label_font_size: 18.0,
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let mut data = String::new();
        file.read_to_string(&mut data)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(data)?;
        if config.window_size == 0 {
            anyhow::bail!("window_size must be positive");
        }
        Ok(config)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}
