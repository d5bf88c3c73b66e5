//! Spectral envelope stage
//!
//! Nudges the brightness of the base towards the reference by boosting (or
//! cutting) a Gaussian band around the target centroid. The correction is
//! deliberately conservative: the centroid ratio is clamped and only a
//! fraction of it is applied.

use tracing::debug;

use super::{apply_spectral_gain, gaussian, StageOutput, TransformStage};
use crate::analysis::FeatureVector;
use crate::audio::{bin_frequencies, Stft};
use crate::config::TransformConfig;
use crate::core::error::{StageError, StageKind, StageResult};

pub struct SpectralEnvelopeStage {
    stft: Stft,
    ratio_min: f32,
    ratio_max: f32,
    bandwidth: f32,
    strength: f32,
}

impl SpectralEnvelopeStage {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            stft: Stft::new(config.n_fft, config.hop_length),
            ratio_min: config.envelope_ratio_min,
            ratio_max: config.envelope_ratio_max,
            bandwidth: config.envelope_bandwidth,
            strength: config.envelope_strength,
        }
    }

    /// Per-bin gain moving a spectrum with centroid `current` towards `target`
    pub fn gains(&self, current: f32, target: f32, sample_rate: u32) -> Vec<f32> {
        let ratio = (target / current).clamp(self.ratio_min, self.ratio_max);
        let sigma = target * self.bandwidth;
        bin_frequencies(self.stft.n_fft, sample_rate)
            .iter()
            .map(|&f| 1.0 + (ratio - 1.0) * gaussian(f, target, sigma) * self.strength)
            .collect()
    }
}

impl TransformStage for SpectralEnvelopeStage {
    fn kind(&self) -> StageKind {
        StageKind::SpectralEnvelope
    }

    fn description(&self) -> &str {
        "Gaussian gain around the reference spectral centroid"
    }

    fn process(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target: &FeatureVector,
    ) -> StageResult<StageOutput> {
        let spec = self
            .stft
            .forward(samples)
            .map_err(|e| StageError::processing(self.kind(), e))?;
        let current = spec.mean_spectral_centroid(sample_rate);
        let target_centroid = target.spectral_centroid_mean;

        if !(current > 0.0 && target_centroid > 0.0) {
            return Ok(StageOutput::Skipped("spectral centroid undefined".into()));
        }

        let gains = self.gains(current, target_centroid, sample_rate);
        debug!(current, target_centroid, "Spectral envelope");

        apply_spectral_gain(&self.stft, self.kind(), samples, &gains).map(StageOutput::Transformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::{target, voice};

    fn centroid(samples: &[f32]) -> f32 {
        Stft::new(2048, 512)
            .forward(samples)
            .unwrap()
            .mean_spectral_centroid(22050)
    }

    #[test]
    fn test_brighter_target_raises_centroid() {
        let stage = SpectralEnvelopeStage::new(&TransformConfig::default());
        let base = voice(200.0, 22050);
        let before = centroid(&base);

        let out = match stage.process(&base, 22050, &target(Some(200.0), before * 2.0, 0.01)).unwrap() {
            StageOutput::Transformed(out) => out,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(out.len(), base.len());
        assert!(centroid(&out) > before);
    }

    #[test]
    fn test_matching_centroid_is_near_identity() {
        let stage = SpectralEnvelopeStage::new(&TransformConfig::default());
        let base = voice(200.0, 16384);
        let (out, _) = stage.apply(&base, 22050, &target(None, centroid(&base), 0.01));
        let max_diff = base.iter().zip(&out).map(|(a, b)| (a - b).abs()).fold(0.0f32, f32::max);
        assert!(max_diff < 1e-3);
    }

    #[test]
    fn test_extreme_centroid_ratio_is_clamped() {
        let stage = SpectralEnvelopeStage::new(&TransformConfig::default());
        let max = |g: &[f32]| g.iter().copied().fold(f32::MIN, f32::max);
        let min = |g: &[f32]| g.iter().copied().fold(f32::MAX, f32::min);

        // 1 + (1.2 - 1) * 0.3
        let brighter = stage.gains(500.0, 5000.0, 22050);
        assert!(max(&brighter) <= 1.06 + 1e-6, "max gain {}", max(&brighter));
        assert!(max(&brighter) > 1.05);
        assert!(min(&brighter) >= 1.0);

        // 1 - (1 - 0.8) * 0.3
        let darker = stage.gains(5000.0, 500.0, 22050);
        assert!(min(&darker) >= 0.94 - 1e-6, "min gain {}", min(&darker));
        assert!(min(&darker) < 0.95);
        assert!(max(&darker) <= 1.0);
    }

    #[test]
    fn test_skips_silence() {
        let stage = SpectralEnvelopeStage::new(&TransformConfig::default());
        let result = stage.process(&vec![0.0; 4096], 22050, &target(None, 1500.0, 0.0)).unwrap();
        assert!(matches!(result, StageOutput::Skipped(_)));
    }
}
