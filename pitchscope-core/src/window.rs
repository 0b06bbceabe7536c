//! # Analysis Window Module
//!
//! Accumulates raw audio chunks into a fixed-length window for the pitch
//! engine. Chunk sizes are dictated by the audio backend, so the window never
//! assumes they divide its capacity.
//!
//! ## Behavior
//! - Chunks that fit are appended after the current fill point
//! - Chunks that would overflow shift the oldest samples out on the left
//! - The window reports itself ready only when it is exactly full

/// Fixed-capacity sample window with a fill count.
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    samples: Vec<f32>,
    fill: usize,
}

impl AnalysisWindow {
    /// Creates an empty window. The capacity never changes afterwards.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            fill: 0,
        }
    }

    /// A zero-capacity window used until the engine is initialized.
    /// Everything appended to it is dropped.
    pub fn placeholder() -> Self {
        Self::new(0)
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of valid samples currently held.
    pub fn len(&self) -> usize {
        self.fill
    }

    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    /// True when the fill count equals the capacity.
    pub fn is_full(&self) -> bool {
        self.fill == self.samples.len()
    }

    /// The filled prefix of the window, oldest sample first.
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.fill]
    }

    /// Appends a chunk of samples and returns whether the window is now full.
    ///
    /// If the chunk fits, it is written at the fill point. Otherwise the
    /// oldest samples are discarded (`chunk.len()` of them once the window is
    /// full), the survivors are moved to the front and the chunk fills the
    /// tail. A chunk longer than the whole window keeps only its most recent
    /// `capacity` samples.
    pub fn append(&mut self, chunk: &[f32]) -> bool {
        let capacity = self.samples.len();
        if capacity == 0 {
            return false;
        }

        if self.fill + chunk.len() <= capacity {
            self.samples[self.fill..self.fill + chunk.len()].copy_from_slice(chunk);
            self.fill += chunk.len();
        } else if chunk.len() >= capacity {
            self.samples.copy_from_slice(&chunk[chunk.len() - capacity..]);
            self.fill = capacity;
        } else {
            let overflow = self.fill + chunk.len() - capacity;
            self.samples.copy_within(overflow..self.fill, 0);
            self.samples[capacity - chunk.len()..].copy_from_slice(chunk);
            self.fill = capacity;
        }

        self.is_full()
    }
}
