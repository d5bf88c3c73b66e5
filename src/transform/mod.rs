//! Voice transformation cascade
//!
//! Five stages reshape a base utterance towards a target [`FeatureVector`]:
//! pitch, spectral envelope, formant emphasis, spectral tilt, level. Each
//! stage either produces a new waveform of the same length, declines to act
//! (`Skipped`), or fails; a failure is recovered by passing the stage's input
//! through unchanged. The [`QualityEnhancer`] runs after the cascade.

mod dynamics;
mod enhance;
mod envelope;
mod formant;
mod pipeline;
mod pitch;
mod texture;

pub use dynamics::{energy_ratio, DynamicsStage};
pub use enhance::QualityEnhancer;
pub use envelope::SpectralEnvelopeStage;
pub use formant::FormantStage;
pub use pipeline::{PipelineReport, StageRecord, StageStatus, TransformPipeline};
pub use pitch::{applied_shift, pitch_ratio, PitchStage};
pub use texture::TextureStage;

use crate::analysis::FeatureVector;
use crate::audio::Stft;
use crate::core::error::{StageError, StageKind, StageResult};

/// What a stage did with its input
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Transformed(Vec<f32>),
    /// Preconditions not met; the input passes through
    Skipped(String),
}

/// One step of the transformation cascade
pub trait TransformStage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Transform `samples` towards `target`
    fn process(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target: &FeatureVector,
    ) -> StageResult<StageOutput>;

    /// Run [`process`](Self::process), validate the result and fall back to
    /// the input on failure
    fn apply(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target: &FeatureVector,
    ) -> (Vec<f32>, StageStatus) {
        let outcome = self
            .process(samples, sample_rate, target)
            .and_then(|output| validate(self.kind(), samples.len(), output));

        match outcome {
            Ok(StageOutput::Transformed(out)) => (out, StageStatus::Applied),
            Ok(StageOutput::Skipped(reason)) => (samples.to_vec(), StageStatus::Skipped { reason }),
            Err(err) => (
                samples.to_vec(),
                StageStatus::Failed {
                    message: err.to_string(),
                },
            ),
        }
    }
}

/// Output must keep the input length and contain only finite samples
fn validate(kind: StageKind, expected_len: usize, output: StageOutput) -> StageResult<StageOutput> {
    if let StageOutput::Transformed(ref out) = output {
        if out.len() != expected_len {
            return Err(StageError::InvalidOutput {
                stage: kind,
                message: format!("length {} != input length {}", out.len(), expected_len),
            });
        }
        if out.iter().any(|s| !s.is_finite()) {
            return Err(StageError::InvalidOutput {
                stage: kind,
                message: "non-finite samples".to_string(),
            });
        }
    }
    Ok(output)
}

/// STFT, per-bin magnitude gain with the original phase, inverse STFT
pub(crate) fn apply_spectral_gain(
    stft: &Stft,
    kind: StageKind,
    samples: &[f32],
    gains: &[f32],
) -> StageResult<Vec<f32>> {
    let mut spec = stft
        .forward(samples)
        .map_err(|e| StageError::processing(kind, e))?;
    spec.apply_gain(gains);
    stft.inverse(&spec, samples.len())
        .map_err(|e| StageError::processing(kind, e))
}

/// Gaussian bump centered on `center` with standard deviation `sigma`
pub(crate) fn gaussian(freq: f32, center: f32, sigma: f32) -> f32 {
    (-0.5 * ((freq - center) / sigma).powi(2)).exp()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::analysis::{FeatureVector, FormantSet};
    use std::f32::consts::PI;

    pub fn target(f0: Option<f32>, centroid: f32, energy: f32) -> FeatureVector {
        FeatureVector {
            f0_mean: f0,
            f0_std: f0.map(|_| 2.0),
            spectral_centroid_mean: centroid,
            spectral_rolloff_mean: centroid * 2.0,
            zero_crossing_rate_mean: 0.05,
            mfcc_mean: [0.0; 13],
            formants: FormantSet {
                frequencies: vec![500.0, 1500.0, 2500.0, 3500.0],
                is_fallback: true,
            },
            duration: 1.0,
            energy,
        }
    }

    /// Five-harmonic voice-like tone
    pub fn voice(f0: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 22050.0;
                (1..=5)
                    .map(|h| 0.2 / h as f32 * (2.0 * PI * f0 * h as f32 * t).sin())
                    .sum::<f32>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::target;

    struct BrokenStage;

    impl TransformStage for BrokenStage {
        fn kind(&self) -> StageKind {
            StageKind::Texture
        }

        fn description(&self) -> &str {
            "always emits NaN"
        }

        fn process(&self, samples: &[f32], _: u32, _: &FeatureVector) -> StageResult<StageOutput> {
            Ok(StageOutput::Transformed(vec![f32::NAN; samples.len()]))
        }
    }

    struct ShorteningStage;

    impl TransformStage for ShorteningStage {
        fn kind(&self) -> StageKind {
            StageKind::Pitch
        }

        fn description(&self) -> &str {
            "drops the last sample"
        }

        fn process(&self, samples: &[f32], _: u32, _: &FeatureVector) -> StageResult<StageOutput> {
            Ok(StageOutput::Transformed(samples[..samples.len() - 1].to_vec()))
        }
    }

    #[test]
    fn test_invalid_output_falls_back_to_input() {
        let input = vec![0.1, 0.2, 0.3];
        let t = target(Some(150.0), 1000.0, 0.01);

        let (out, status) = BrokenStage.apply(&input, 22050, &t);
        assert_eq!(out, input);
        assert!(matches!(status, StageStatus::Failed { .. }));

        let (out, status) = ShorteningStage.apply(&input, 22050, &t);
        assert_eq!(out, input);
        assert!(matches!(status, StageStatus::Failed { ref message } if message.contains("length")));
    }

    #[test]
    fn test_gaussian_peak() {
        assert_eq!(gaussian(1000.0, 1000.0, 100.0), 1.0);
        assert!((gaussian(1100.0, 1000.0, 100.0) - (-0.5f32).exp()).abs() < 1e-6);
    }
}
