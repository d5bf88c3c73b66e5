//! Fundamental frequency tracking (YIN)
//!
//! Per frame: difference function from an FFT cross-correlation, cumulative
//! mean normalization, first dip under the aperiodicity threshold, parabolic
//! refinement. Frames are centered on `t * hop` with zero padding at the
//! signal edges. A frame is voiced only if a dip exists, the frame is louder
//! than the silence gate, and the refined f0 lies within `[fmin, fmax]`.

use anyhow::Result;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;
use tracing::trace;

use crate::config::AnalysisConfig;

/// Per-frame pitch estimate; `None` marks an unvoiced frame
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTrack {
    pub f0: Vec<Option<f32>>,
    pub hop_length: usize,
    pub sample_rate: u32,
}

impl PitchTrack {
    pub fn voiced(&self) -> impl Iterator<Item = f32> + '_ {
        self.f0.iter().filter_map(|f| *f)
    }

    pub fn voiced_count(&self) -> usize {
        self.voiced().count()
    }

    /// Mean f0 over voiced frames
    pub fn voiced_mean(&self) -> Option<f32> {
        let n = self.voiced_count();
        if n == 0 {
            return None;
        }
        Some((self.voiced().map(|f| f as f64).sum::<f64>() / n as f64) as f32)
    }

    /// Population standard deviation of f0 over voiced frames
    pub fn voiced_std(&self) -> Option<f32> {
        let mean = self.voiced_mean()? as f64;
        let n = self.voiced_count() as f64;
        let var = self
            .voiced()
            .map(|f| (f as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        Some(var.sqrt() as f32)
    }
}

/// YIN pitch tracker with cached FFT plans
pub struct PitchTracker {
    sample_rate: u32,
    fmin: f32,
    fmax: f32,
    frame_length: usize,
    hop_length: usize,
    threshold: f32,
    silence_rms: f32,
    /// Integration window of the difference function
    win_length: usize,
    fft_len: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
}

impl PitchTracker {
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Result<Self> {
        let frame_length = config.pitch_frame_length;
        let win_length = frame_length / 2;
        let max_period = (sample_rate as f32 / config.pitch_fmin).ceil() as usize;
        if config.hop_length == 0 || max_period + 1 >= frame_length - win_length {
            anyhow::bail!(
                "Pitch frame {} too short for fmin {} Hz at {} Hz",
                frame_length,
                config.pitch_fmin,
                sample_rate
            );
        }
        if !(config.pitch_fmin > 0.0 && config.pitch_fmin < config.pitch_fmax) {
            anyhow::bail!(
                "Invalid pitch range {}..{} Hz",
                config.pitch_fmin,
                config.pitch_fmax
            );
        }

        let fft_len = (frame_length + win_length).next_power_of_two();
        let mut planner = FftPlanner::new();

        Ok(Self {
            sample_rate,
            fmin: config.pitch_fmin,
            fmax: config.pitch_fmax,
            frame_length,
            hop_length: config.hop_length,
            threshold: config.voicing_threshold,
            silence_rms: config.silence_rms,
            win_length,
            fft_len,
            fft: planner.plan_fft_forward(fft_len),
            ifft: planner.plan_fft_inverse(fft_len),
        })
    }

    /// Track f0 over the whole signal
    pub fn track(&self, samples: &[f32]) -> PitchTrack {
        let half = self.frame_length / 2;
        let n_frames = if samples.is_empty() {
            0
        } else {
            1 + samples.len() / self.hop_length
        };

        let mut frame = vec![0.0f32; self.frame_length];
        let f0 = (0..n_frames)
            .map(|t| {
                let center = t * self.hop_length;
                for (j, slot) in frame.iter_mut().enumerate() {
                    let idx = (center + j) as isize - half as isize;
                    *slot = if idx >= 0 {
                        samples.get(idx as usize).copied().unwrap_or(0.0)
                    } else {
                        0.0
                    };
                }
                self.estimate_frame(&frame)
            })
            .collect();

        PitchTrack {
            f0,
            hop_length: self.hop_length,
            sample_rate: self.sample_rate,
        }
    }

    fn estimate_frame(&self, frame: &[f32]) -> Option<f32> {
        let energy: f64 = frame.iter().map(|&v| (v as f64) * (v as f64)).sum();
        let rms = (energy / frame.len() as f64).sqrt() as f32;
        if rms < self.silence_rms {
            return None;
        }

        let tau_min = ((self.sample_rate as f32 / self.fmax).floor() as usize).max(2);
        let tau_max = (self.sample_rate as f32 / self.fmin).ceil() as usize;

        let cmndf = self.cumulative_mean_normalized_difference(frame, tau_max);

        let mut tau = (tau_min..tau_max).find(|&t| cmndf[t] < self.threshold)?;
        while tau + 1 < tau_max && cmndf[tau + 1] < cmndf[tau] {
            tau += 1;
        }

        let period = tau as f32 + parabolic_offset(cmndf[tau - 1], cmndf[tau], cmndf[tau + 1]);
        let f0 = self.sample_rate as f32 / period;
        trace!(tau, period, f0, "Voiced frame");

        (f0 >= self.fmin && f0 <= self.fmax).then_some(f0)
    }

    /// d'(tau) for tau in 0..=tau_max
    fn cumulative_mean_normalized_difference(&self, frame: &[f32], tau_max: usize) -> Vec<f32> {
        let w = self.win_length;

        // r(tau) = sum_{j<w} x[j] * x[j + tau] via FFT cross-correlation
        let mut x_spec: Vec<Complex<f32>> = frame
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(self.fft_len)
            .collect();
        let mut a_spec: Vec<Complex<f32>> = frame[..w]
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(self.fft_len)
            .collect();
        self.fft.process(&mut x_spec);
        self.fft.process(&mut a_spec);
        for (x, a) in x_spec.iter_mut().zip(&a_spec) {
            *x *= a.conj();
        }
        self.ifft.process(&mut x_spec);
        let scale = 1.0 / self.fft_len as f64;

        let mut prefix = vec![0.0f64; frame.len() + 1];
        for (i, &v) in frame.iter().enumerate() {
            prefix[i + 1] = prefix[i] + (v as f64) * (v as f64);
        }
        let window_energy = |start: usize| prefix[start + w] - prefix[start];
        let e0 = window_energy(0);

        let mut cmndf = vec![1.0f32; tau_max + 1];
        let mut running = 0.0f64;
        for tau in 1..=tau_max {
            let r = x_spec[tau].re as f64 * scale;
            let d = (e0 + window_energy(tau) - 2.0 * r).max(0.0);
            running += d;
            cmndf[tau] = if running > 0.0 {
                (d * tau as f64 / running) as f32
            } else {
                1.0
            };
        }
        cmndf
    }
}

/// Vertex offset of the parabola through three equally spaced points, in [-1, 1]
fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denom = left - 2.0 * center + right;
    if denom.abs() < f32::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-1.0, 1.0)
}
