//! Duration-preserving pitch shifting
//!
//! Phase-vocoder time stretch by the frequency ratio, then resampling back to
//! the original length so every frequency is scaled by that ratio.

use anyhow::Result;
use rustfft::num_complex::Complex;
use std::f32::consts::PI;

use super::stft::{Spectrogram, Stft};
use super::Resampler;

const TWO_PI: f32 = 2.0 * PI;

/// Phase-vocoder pitch shifter
pub struct PitchShifter {
    stft: Stft,
}

impl PitchShifter {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        Self {
            stft: Stft::new(n_fft, hop_length),
        }
    }

    /// Scale all frequencies by `ratio` keeping the sample count
    pub fn shift(&self, samples: &[f32], ratio: f32) -> Result<Vec<f32>> {
        if !(ratio.is_finite() && ratio > 0.0) {
            anyhow::bail!("Invalid pitch ratio: {}", ratio);
        }
        if samples.is_empty() || (ratio - 1.0).abs() < 1e-6 {
            return Ok(samples.to_vec());
        }

        // Slower playback rate stretches by `ratio`; resampling back compresses pitch up
        let stretched = self.time_stretch(samples, 1.0 / ratio)?;
        Resampler::resample_to_length(&stretched, samples.len())
    }

    /// Change duration by `1 / rate` without changing pitch
    pub fn time_stretch(&self, samples: &[f32], rate: f32) -> Result<Vec<f32>> {
        if !(rate.is_finite() && rate > 0.0) {
            anyhow::bail!("Invalid stretch rate: {}", rate);
        }
        let spec = self.stft.forward(samples)?;
        let stretched = self.phase_vocoder(&spec, rate);
        let out_len = (samples.len() as f32 / rate).round() as usize;
        self.stft.inverse(&stretched, out_len)
    }

    /// Resample frames at fractional steps of `rate`, interpolating magnitude
    /// and accumulating phase from the measured per-bin frequency
    fn phase_vocoder(&self, spec: &Spectrogram, rate: f32) -> Spectrogram {
        let n_bins = spec.n_bins();
        let n_frames = spec.n_frames();
        let hop = self.stft.hop_length as f32;
        let n_fft = self.stft.n_fft as f32;

        let phase_advance: Vec<f32> = (0..n_bins)
            .map(|k| TWO_PI * k as f32 * hop / n_fft)
            .collect();

        let zero = vec![Complex::new(0.0f32, 0.0); n_bins];
        let column = |t: usize| spec.frames.get(t).unwrap_or(&zero);

        let mut phase_acc: Vec<f32> = spec.frames[0].iter().map(|c| c.arg()).collect();
        let mut frames = Vec::new();

        let mut step = 0.0f32;
        while step < n_frames as f32 {
            let t = step.floor() as usize;
            let alpha = step - t as f32;
            let (left, right) = (column(t), column(t + 1));

            let frame: Vec<Complex<f32>> = (0..n_bins)
                .map(|k| {
                    let mag = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
                    Complex::from_polar(mag, phase_acc[k])
                })
                .collect();
            frames.push(frame);

            for k in 0..n_bins {
                let dphase = right[k].arg() - left[k].arg() - phase_advance[k];
                let wrapped = dphase - TWO_PI * (dphase / TWO_PI).round();
                phase_acc[k] = (phase_acc[k] + phase_advance[k] + wrapped).rem_euclid(TWO_PI);
            }

            step += rate;
        }

        Spectrogram {
            frames,
            n_fft: spec.n_fft,
        }
    }
}
