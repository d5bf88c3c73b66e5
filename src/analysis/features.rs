//! Voice feature extraction
//!
//! Reduces a waveform to a fixed-shape [`FeatureVector`]: pitch statistics
//! over voiced frames, spectral shape, mean MFCCs, formant estimates and
//! overall level. The same extractor describes the reference speaker, the
//! base utterance and the cloned output, so all comparisons share one
//! definition.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument};

use super::formants::{FormantEstimator, FormantSet};
use crate::audio::{AudioLoader, Mfcc, PitchTracker, Stft, Waveform, N_MFCC};
use crate::config::AnalysisConfig;
use crate::core::error::{CloneError, Result};

/// Acoustic summary of one recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Mean f0 over voiced frames, `None` if nothing was voiced
    pub f0_mean: Option<f32>,
    /// Standard deviation of f0 over voiced frames
    pub f0_std: Option<f32>,
    pub spectral_centroid_mean: f32,
    pub spectral_rolloff_mean: f32,
    pub zero_crossing_rate_mean: f32,
    pub mfcc_mean: [f32; N_MFCC],
    pub formants: FormantSet,
    /// Seconds
    pub duration: f32,
    /// Mean squared amplitude
    pub energy: f32,
}

/// Anything that can turn audio into a [`FeatureVector`]
pub trait FeatureExtractor: Send + Sync {
    /// Extract from a waveform already at the canonical rate
    fn extract(&self, wave: &Waveform) -> Result<FeatureVector>;

    /// Canonical sample rate inputs are converted to
    fn sample_rate(&self) -> u32;

    /// Load, convert and extract
    fn extract_file(&self, path: &Path) -> Result<FeatureVector> {
        let wave = AudioLoader::load(path, self.sample_rate()).map_err(|e| CloneError::Extraction {
            message: format!("{:#}", e),
        })?;
        self.extract(&wave)
    }
}

/// Default extractor: YIN pitch, STFT spectral statistics, MFCCs, formants
pub struct SpectralFeatureExtractor {
    config: AnalysisConfig,
    sample_rate: u32,
    stft: Stft,
    pitch: PitchTracker,
    mfcc: Mfcc,
    formants: FormantEstimator,
}

impl SpectralFeatureExtractor {
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Result<Self> {
        let pitch = PitchTracker::new(config, sample_rate).map_err(|e| CloneError::Config {
            message: format!("{:#}", e),
            path: None,
        })?;

        Ok(Self {
            config: config.clone(),
            sample_rate,
            stft: Stft::new(config.n_fft, config.hop_length),
            pitch,
            mfcc: Mfcc::new(config.n_fft, config.n_mels, sample_rate, config.top_db),
            formants: FormantEstimator::new(config),
        })
    }

    /// Mean zero-crossing rate over centered, edge-padded frames
    pub fn zero_crossing_rate(&self, samples: &[f32]) -> f32 {
        zero_crossing_rate(samples, self.config.n_fft, self.config.hop_length)
    }
}

impl FeatureExtractor for SpectralFeatureExtractor {
    #[instrument(skip_all, fields(samples = wave.len()))]
    fn extract(&self, wave: &Waveform) -> Result<FeatureVector> {
        if wave.is_empty() {
            return Err(CloneError::Extraction {
                message: "waveform is empty".to_string(),
            });
        }
        if !wave.is_finite() {
            return Err(CloneError::Extraction {
                message: "waveform contains non-finite samples".to_string(),
            });
        }
        if wave.sample_rate != self.sample_rate {
            return Err(CloneError::Extraction {
                message: format!(
                    "waveform is at {} Hz, extractor expects {} Hz",
                    wave.sample_rate, self.sample_rate
                ),
            });
        }

        let samples = &wave.samples;
        let track = self.pitch.track(samples);

        let spec = self.stft.forward(samples).map_err(|e| CloneError::Extraction {
            message: format!("{:#}", e),
        })?;
        let centroid = spec.mean_spectral_centroid(self.sample_rate);
        let rolloff = mean(&spec.spectral_rolloff(self.sample_rate, self.config.rolloff_percent));

        let features = FeatureVector {
            f0_mean: track.voiced_mean(),
            f0_std: track.voiced_std(),
            spectral_centroid_mean: centroid,
            spectral_rolloff_mean: rolloff,
            zero_crossing_rate_mean: self.zero_crossing_rate(samples),
            mfcc_mean: self.mfcc.mean(&spec),
            formants: self.formants.estimate(samples, self.sample_rate),
            duration: wave.duration(),
            energy: wave.energy(),
        };

        debug!(
            f0_mean = ?features.f0_mean,
            voiced_frames = track.voiced_count(),
            centroid = features.spectral_centroid_mean,
            energy = features.energy,
            "Extracted features"
        );
        Ok(features)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Fraction of sign changes per frame, averaged over frames
pub fn zero_crossing_rate(samples: &[f32], frame_length: usize, hop_length: usize) -> f32 {
    if samples.is_empty() || frame_length < 2 || hop_length == 0 {
        return 0.0;
    }
    let half = frame_length / 2;
    let last = samples.len() - 1;
    let at = |i: usize| -> f32 {
        // Edge padding
        let idx = i.saturating_sub(half).min(last);
        samples[idx]
    };

    let n_frames = 1 + samples.len() / hop_length;
    let rates: Vec<f32> = (0..n_frames)
        .map(|t| {
            let start = t * hop_length;
            let crossings = (start + 1..start + frame_length)
                .filter(|&i| (at(i) < 0.0) != (at(i - 1) < 0.0))
                .count();
            crossings as f32 / frame_length as f32
        })
        .collect();
    mean(&rates)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32
}
