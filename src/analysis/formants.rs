//! Formant estimation
//!
//! A coarse proxy: the strongest local maxima of the whole-signal power
//! spectrum. This is not LPC formant tracking; on voiced speech it mostly
//! finds low harmonics. When the spectrum yields too few peaks the configured
//! fallback set is returned and flagged, so consumers can ignore it.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;

/// Estimated formant frequencies in ascending order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormantSet {
    pub frequencies: Vec<f32>,
    /// True when peak picking failed and these are the fixed defaults
    pub is_fallback: bool,
}

impl FormantSet {
    /// Formants usable as transformation targets (empty for the fallback set)
    pub fn defined(&self) -> &[f32] {
        if self.is_fallback {
            &[]
        } else {
            &self.frequencies
        }
    }
}

/// Spectral-peak formant estimator
#[derive(Debug, Clone)]
pub struct FormantEstimator {
    n_formants: usize,
    peak_ratio: f32,
    fallback: Vec<f32>,
}

impl FormantEstimator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            n_formants: config.n_formants,
            peak_ratio: config.formant_peak_ratio,
            fallback: config.fallback_formants.clone(),
        }
    }

    /// Estimate formants; never fails
    pub fn estimate(&self, samples: &[f32], sample_rate: u32) -> FormantSet {
        match self.pick_peaks(samples, sample_rate) {
            Some(frequencies) => FormantSet {
                frequencies,
                is_fallback: false,
            },
            None => {
                debug!("Formant estimation fell back to defaults");
                self.fallback_set()
            }
        }
    }

    pub fn fallback_set(&self) -> FormantSet {
        FormantSet {
            frequencies: self.fallback.clone(),
            is_fallback: true,
        }
    }

    fn pick_peaks(&self, samples: &[f32], sample_rate: u32) -> Option<Vec<f32>> {
        let n = samples.len();
        if n < 3 || samples.iter().any(|s| !s.is_finite()) {
            return None;
        }

        let mut spectrum: Vec<Complex<f32>> =
            samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut spectrum);

        let power: Vec<f32> = spectrum[..n / 2].iter().map(|c| c.norm_sqr()).collect();
        let max_power = power.iter().copied().fold(0.0f32, f32::max);
        if max_power <= 0.0 || !max_power.is_finite() {
            return None;
        }

        let height = max_power * self.peak_ratio;
        let mut peaks: Vec<usize> = local_maxima(&power)
            .into_iter()
            .filter(|&i| power[i] >= height)
            .collect();
        if peaks.len() < self.n_formants {
            return None;
        }

        peaks.sort_by(|&a, &b| power[b].total_cmp(&power[a]));
        let mut frequencies: Vec<f32> = peaks[..self.n_formants]
            .iter()
            .map(|&i| i as f32 * sample_rate as f32 / n as f32)
            .collect();
        frequencies.sort_by(f32::total_cmp);
        Some(frequencies)
    }
}

/// Indices of local maxima; a flat top counts once, at its middle
fn local_maxima(x: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < x.len() {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead + 1 < x.len() && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}
