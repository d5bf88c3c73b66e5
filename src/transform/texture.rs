//! Voice texture stage: a log-frequency spectral tilt

use tracing::debug;

use super::{apply_spectral_gain, StageOutput, TransformStage};
use crate::analysis::FeatureVector;
use crate::audio::Stft;
use crate::config::TransformConfig;
use crate::core::error::{StageError, StageKind, StageResult};

pub struct TextureStage {
    stft: Stft,
    tilt_strength: f32,
}

impl TextureStage {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            stft: Stft::new(config.n_fft, config.hop_length),
            tilt_strength: config.texture_tilt_strength,
        }
    }
}

impl TransformStage for TextureStage {
    fn kind(&self) -> StageKind {
        StageKind::Texture
    }

    fn description(&self) -> &str {
        "Tilts the spectrum towards the reference brightness"
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

        // tilt(f) = exp(k * ln(f + 1)) = (f + 1)^k
        let tilt = (target_centroid / current).ln() * self.tilt_strength;
        let gains: Vec<f32> = spec
            .bin_frequencies(sample_rate)
            .iter()
            .map(|&f| (tilt * (f + 1.0).ln()).exp())
            .collect();
        debug!(current, target_centroid, tilt, "Spectral tilt");

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
    fn test_tilt_direction_follows_target() {
        let stage = TextureStage::new(&TransformConfig::default());
        let base = voice(150.0, 22050);
        let before = centroid(&base);

        let (darker, _) = stage.apply(&base, 22050, &target(None, before / 3.0, 0.01));
        let (brighter, _) = stage.apply(&base, 22050, &target(None, before * 3.0, 0.01));

        assert!(centroid(&darker) < before);
        assert!(centroid(&brighter) > before);
    }

    #[test]
    fn test_skips_when_target_centroid_zero() {
        let stage = TextureStage::new(&TransformConfig::default());
        let result = stage.process(&voice(150.0, 8192), 22050, &target(None, 0.0, 0.0)).unwrap();
        assert!(matches!(result, StageOutput::Skipped(_)));
    }
}
