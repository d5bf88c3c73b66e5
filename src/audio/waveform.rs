//! Mono waveform container

use serde::Serialize;

/// A mono waveform at a fixed sample rate
///
/// Samples are f32 in [-1, 1]. Stages never mutate a waveform they did not
/// produce; each returns a fresh buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveform {
    /// Audio samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    /// Create a waveform from mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create a waveform from interleaved multi-channel samples by averaging channels
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        let samples = if channels > 1 {
            samples
                .chunks(channels)
                .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
                .collect()
        } else {
            samples.to_vec()
        };
        Self::new(samples, sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Mean squared amplitude
    pub fn energy(&self) -> f32 {
        energy(&self.samples)
    }

    /// Root mean square amplitude
    pub fn rms(&self) -> f32 {
        self.energy().sqrt()
    }

    /// Largest absolute sample
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// True if every sample is a finite number
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }

    /// Copy scaled so the peak equals `level`; silent input is returned as is
    pub fn peak_normalized(&self, level: f32) -> Self {
        let peak = self.peak();
        if peak <= 0.0 {
            return self.clone();
        }
        let gain = level / peak;
        Self::new(
            self.samples.iter().map(|s| s * gain).collect(),
            self.sample_rate,
        )
    }
}

/// Mean squared amplitude of a slice (0 for empty input)
pub fn energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64) as f32
}

/// Largest absolute sample of a slice
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, v| acc.max(v.abs()))
}
