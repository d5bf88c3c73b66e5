//! Mel filterbank and MFCC computation
//!
//! Slaney-style mel scale (linear below 1 kHz, logarithmic above) with
//! area-normalized triangular filters. MFCCs are the orthonormal DCT-II of the
//! dB-scaled mel power spectrogram.

use std::f32::consts::PI;

use super::stft::{bin_frequencies, Spectrogram};

/// Number of cepstral coefficients kept
pub const N_MFCC: usize = 13;

/// Power floor before the dB conversion
const AMIN: f32 = 1e-10;

/// Slaney mel scale constants
const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;

/// Triangular mel filterbank, `filters[m][k]` for band `m` and FFT bin `k`
pub struct MelFilterbank {
    pub n_mels: usize,
    pub n_fft: usize,
    filters: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build a Slaney-normalized filterbank spanning `fmin..fmax`
    pub fn new(n_fft: usize, n_mels: usize, sample_rate: u32, fmin: f32, fmax: f32) -> Self {
        let fft_freqs = bin_frequencies(n_fft, sample_rate);

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let mel_points: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let norm = 2.0 / (right - left);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let lower = (f - left) / (center - left);
                        let upper = (right - f) / (right - center);
                        lower.min(upper).max(0.0) * norm
                    })
                    .collect()
            })
            .collect();

        Self {
            n_mels,
            n_fft,
            filters,
        }
    }

    /// Apply to one frame of power values
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| filter.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}

/// MFCC computer over an existing spectrogram
pub struct Mfcc {
    filterbank: MelFilterbank,
    top_db: f32,
}

impl Mfcc {
    pub fn new(n_fft: usize, n_mels: usize, sample_rate: u32, top_db: f32) -> Self {
        Self {
            filterbank: MelFilterbank::new(n_fft, n_mels, sample_rate, 0.0, sample_rate as f32 / 2.0),
            top_db,
        }
    }

    /// Per-frame MFCCs, `[n_frames][N_MFCC]`
    pub fn compute(&self, spec: &Spectrogram) -> Vec<[f32; N_MFCC]> {
        let mel_db: Vec<Vec<f32>> = spec
            .frames
            .iter()
            .map(|frame| {
                let power: Vec<f32> = frame.iter().map(|c| c.norm_sqr()).collect();
                self.filterbank
                    .apply(&power)
                    .into_iter()
                    .map(|p| 10.0 * p.max(AMIN).log10())
                    .collect()
            })
            .collect();

        // Dynamic range is limited relative to the loudest cell of the whole matrix
        let global_max = mel_db
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let floor = global_max - self.top_db;

        mel_db
            .into_iter()
            .map(|frame| {
                let clipped: Vec<f32> = frame.into_iter().map(|v| v.max(floor)).collect();
                dct_ortho(&clipped)
            })
            .collect()
    }

    /// Mean of each coefficient across frames
    pub fn mean(&self, spec: &Spectrogram) -> [f32; N_MFCC] {
        let frames = self.compute(spec);
        let mut mean = [0.0f32; N_MFCC];
        if frames.is_empty() {
            return mean;
        }
        for frame in &frames {
            for (acc, &c) in mean.iter_mut().zip(frame) {
                *acc += c;
            }
        }
        for v in &mut mean {
            *v /= frames.len() as f32;
        }
        mean
    }
}

/// First `N_MFCC` coefficients of the orthonormal DCT-II
fn dct_ortho(x: &[f32]) -> [f32; N_MFCC] {
    let n = x.len() as f32;
    let mut out = [0.0f32; N_MFCC];
    for (k, slot) in out.iter_mut().enumerate() {
        let sum: f32 = x
            .iter()
            .enumerate()
            .map(|(i, &v)| v * (PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n)).cos())
            .sum();
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        *slot = sum * scale;
    }
    out
}

/// Hz to mel (Slaney)
pub fn hz_to_mel(hz: f32) -> f32 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

/// Mel to Hz (Slaney)
pub fn mel_to_hz(mel: f32) -> f32 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Stft;

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [0.0, 440.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 0.05 * hz.max(1.0));
        }
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_filterbank_shape() {
        let bank = MelFilterbank::new(2048, 128, 22050, 0.0, 11025.0);
        assert_eq!(bank.filters.len(), 128);
        assert!(bank.filters.iter().all(|f| f.len() == 1025));
        assert!(bank.filters.iter().flatten().all(|&w| w >= 0.0 && w.is_finite()));
    }

    #[test]
    fn test_mfcc_of_sine_is_finite() {
        let samples: Vec<f32> = (0..22050)
            .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / 22050.0).sin())
            .collect();
        let spec = Stft::new(2048, 512).forward(&samples).unwrap();
        let mfcc = Mfcc::new(2048, 128, 22050, 80.0);

        let frames = mfcc.compute(&spec);
        assert_eq!(frames.len(), spec.n_frames());
        assert!(mfcc.mean(&spec).iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_mfcc_of_silence_is_flat() {
        let spec = Stft::new(2048, 512).forward(&vec![0.0; 8192]).unwrap();
        let mean = Mfcc::new(2048, 128, 22050, 80.0).mean(&spec);
        // Constant dB floor: all energy lands in c0
        assert!(mean[1..].iter().all(|c| c.abs() < 1e-2));
        assert!(mean[0] < 0.0);
    }
}
