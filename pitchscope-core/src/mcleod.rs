//! # McLeod Pitch Engine
//!
//! Implements the McLeod pitch method ("A Smarter Way to Find Pitch",
//! McLeod & Wyvill) on top of RustFFT.
//!
//! ## Steps
//! - Power gate to reject silence
//! - Autocorrelation through a zero-padded forward/inverse FFT
//! - Normalized square difference function (NSDF)
//! - Key-maximum peak picking and parabolic interpolation

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::engine::{EngineDescriptor, Estimate, PitchEngine};

/// McLeod engine with all scratch buffers allocated up front, so `detect`
/// does not allocate on the audio thread.
pub struct McLeodEngine {
    sample_rate: f32,
    window_size: usize,
    power_threshold: f32,
    clarity_threshold: f32,
    pick_threshold: f32,
    fft: Arc<dyn Fft<f32>>,
    inv_fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    nsdf: Vec<f32>,
    peaks: Vec<(usize, f32)>,
}

impl McLeodEngine {
    pub fn new(sample_rate: f32, window_size: usize, descriptor: &EngineDescriptor) -> Self {
        let padded = window_size + window_size / 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(padded);
        let inv_fft = planner.plan_fft_inverse(padded);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(inv_fft.get_inplace_scratch_len());

        Self {
            sample_rate,
            window_size,
            power_threshold: descriptor.power_threshold,
            clarity_threshold: descriptor.clarity_threshold,
            pick_threshold: descriptor.pick_threshold,
            fft,
            inv_fft,
            spectrum: vec![Complex::new(0.0, 0.0); padded],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            nsdf: vec![0.0; window_size / 2],
            peaks: Vec::with_capacity(window_size / 4),
        }
    }

    /// Fills `self.nsdf` with the normalized square difference of `signal`
    /// for lags `0..window_size / 2`.
    fn normalized_square_difference(&mut self, signal: &[f32]) {
        for (slot, &sample) in self.spectrum.iter_mut().zip(signal) {
            *slot = Complex::new(sample, 0.0);
        }
        for slot in self.spectrum[signal.len()..].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);
        for bin in self.spectrum.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inv_fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        // m(τ) = Σ x[j]² + x[j+τ]² over the overlapping part, updated
        // incrementally as the overlap shrinks.
        let n = signal.len();
        let mut m = 2.0 * signal.iter().map(|&s| s * s).sum::<f32>();
        for tau in 0..self.nsdf.len() {
            if tau > 0 {
                m -= signal[tau - 1] * signal[tau - 1] + signal[n - tau] * signal[n - tau];
            }
            // The inverse FFT is unnormalized.
            let r = self.spectrum[tau].re / self.spectrum.len() as f32;
            self.nsdf[tau] = if m > f32::EPSILON { 2.0 * r / m } else { 0.0 };
        }
    }

    /// Collects the highest point of every positive lobe of the NSDF that is
    /// bounded by negative values on both sides.
    fn collect_key_maxima(&mut self) {
        self.peaks.clear();
        let data = &self.nsdf;
        // The lobe around lag 0 is not a period candidate.
        let mut idx = data.iter().take_while(|v| !v.is_sign_negative()).count();

        while idx < data.len() {
            idx += data[idx..].iter().take_while(|v| v.is_sign_negative()).count();
            let start = idx;
            let mut best: Option<(usize, f32)> = None;
            for (offset, &value) in data[start..].iter().enumerate() {
                if value.is_sign_negative() {
                    break;
                }
                if best.is_none_or(|(_, max)| value > max) {
                    best = Some((start + offset, value));
                }
                idx += 1;
            }
            // A lobe still rising at the end of the buffer is incomplete.
            match best {
                Some(peak) if idx < data.len() => self.peaks.push(peak),
                _ => break,
            }
        }
    }

    fn choose_peak(&self) -> Option<(usize, f32)> {
        let highest = self
            .peaks
            .iter()
            .map(|&(_, value)| value)
            .fold(f32::NEG_INFINITY, f32::max);
        let threshold = highest * self.pick_threshold;
        self.peaks
            .iter()
            .copied()
            .find(|&(_, value)| value >= threshold && value > self.clarity_threshold)
    }
}

/// Vertex of the parabola through `(-1, y0)`, `(0, y1)`, `(1, y2)`.
fn quadratic_peak(y0: f32, y1: f32, y2: f32) -> (f32, f32) {
    let a = 0.5 * (y0 + y2) - y1;
    let b = 0.5 * (y2 - y0);
    if a >= 0.0 {
        // Not concave: the maximum is at an end point.
        return if y0 > y2 { (-1.0, y0) } else if y2 > y1 { (1.0, y2) } else { (0.0, y1) };
    }
    (-b / (2.0 * a), y1 - b * b / (4.0 * a))
}

impl PitchEngine for McLeodEngine {
    fn detect(&mut self, window: &[f32]) -> Estimate {
        if window.len() != self.window_size {
            return Estimate::NONE;
        }

        let power: f32 = window.iter().map(|&s| s * s).sum();
        if !power.is_finite() || power < self.power_threshold {
            return Estimate::NONE;
        }

        self.normalized_square_difference(window);
        self.collect_key_maxima();

        let Some((lag, _)) = self.choose_peak() else {
            return Estimate::NONE;
        };
        if lag == 0 || lag + 1 >= self.nsdf.len() {
            return Estimate::NONE;
        }

        let (shift, height) = quadratic_peak(self.nsdf[lag - 1], self.nsdf[lag], self.nsdf[lag + 1]);
        let period = lag as f32 + shift;
        let frequency = self.sample_rate / period;

        if frequency.is_finite() && frequency > 0.0 {
            Estimate {
                frequency,
                clarity: height.clamp(0.0, 1.0),
            }
        } else {
            Estimate::NONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE_RATE: f32 = 44100.0;
    const SIZE: usize = 1024;

    fn sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..SIZE)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    fn engine() -> McLeodEngine {
        McLeodEngine::new(SAMPLE_RATE, SIZE, &EngineDescriptor::default())
    }

    #[test]
    fn detects_pure_tones() {
        let mut engine = engine();
        for freq in [220.0f32, 440.0, 659.25] {
            let estimate = engine.detect(&sine(freq, 0.5));
            assert_abs_diff_eq!(estimate.frequency, freq, epsilon = freq * 0.01);
            assert!(estimate.clarity > 0.9, "{freq}: clarity {}", estimate.clarity);
        }
    }

    #[test]
    fn silence_is_below_power_gate() {
        let mut engine = engine();
        assert_eq!(engine.detect(&vec![0.0; SIZE]), Estimate::NONE);
        // 0.01 amplitude over 1024 samples has power ~0.05.
        assert_eq!(engine.detect(&sine(440.0, 0.01)), Estimate::NONE);
    }

    #[test]
    fn wrong_window_length_is_rejected() {
        let mut engine = engine();
        assert_eq!(engine.detect(&sine(440.0, 0.5)[..512]), Estimate::NONE);
    }

    #[test]
    fn parabola_vertex() {
        let (x, y) = quadratic_peak(0.5, 1.0, 0.5);
        assert_abs_diff_eq!(x, 0.0);
        assert_abs_diff_eq!(y, 1.0);
        let (x, _) = quadratic_peak(0.2, 1.0, 0.8);
        assert!(x > 0.0 && x < 0.5);
    }
}
