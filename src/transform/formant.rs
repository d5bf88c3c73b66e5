//! Formant emphasis stage

use tracing::debug;

use super::{apply_spectral_gain, gaussian, StageOutput, TransformStage};
use crate::analysis::{FeatureVector, FormantSet};
use crate::audio::{bin_frequencies, Stft};
use crate::config::TransformConfig;
use crate::core::error::{StageKind, StageResult};

/// Boosts narrow bands at the reference's estimated formants
pub struct FormantStage {
    stft: Stft,
    count: usize,
    bandwidth: f32,
    boost: f32,
}

impl FormantStage {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            stft: Stft::new(config.n_fft, config.hop_length),
            count: config.formant_count,
            bandwidth: config.formant_bandwidth,
            boost: config.formant_boost,
        }
    }

    /// Centers to emphasize: the first `count` formants, minus undefined ones
    fn centers(&self, formants: &FormantSet) -> Vec<f32> {
        formants
            .defined()
            .iter()
            .copied()
            .take(self.count)
            .filter(|&f| f > 0.0)
            .collect()
    }

    /// Per-bin gain for the given formant centers (gains multiply)
    pub fn gains(&self, formants: &[f32], sample_rate: u32) -> Vec<f32> {
        bin_frequencies(self.stft.n_fft, sample_rate)
            .iter()
            .map(|&f| {
                formants
                    .iter()
                    .map(|&center| 1.0 + gaussian(f, center, center * self.bandwidth) * self.boost)
                    .product::<f32>()
            })
            .collect()
    }
}

impl TransformStage for FormantStage {
    fn kind(&self) -> StageKind {
        StageKind::Formant
    }

    fn description(&self) -> &str {
        "Emphasizes the reference formant regions"
    }

    fn process(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target: &FeatureVector,
    ) -> StageResult<StageOutput> {
        let formants = self.centers(&target.formants);
        if formants.is_empty() {
            return Ok(StageOutput::Skipped("reference formants undefined".into()));
        }
        debug!(?formants, "Formant emphasis");

        let gains = self.gains(&formants, sample_rate);
        apply_spectral_gain(&self.stft, self.kind(), samples, &gains).map(StageOutput::Transformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::{target, voice};

    #[test]
    fn test_gain_peaks_at_formants() {
        let stage = FormantStage::new(&TransformConfig::default());
        let gains = stage.gains(&[1000.0], 22050);
        let freqs = bin_frequencies(2048, 22050);

        let (peak_bin, peak_gain) = gains
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &g)| if g > acc.1 { (i, g) } else { acc });
        assert!((freqs[peak_bin] - 1000.0).abs() < 11.0);
        assert!(peak_gain <= 1.2 + 1e-6 && peak_gain > 1.19);
        assert!((gains[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fallback_formants_skip() {
        let stage = FormantStage::new(&TransformConfig::default());
        let result = stage
            .process(&voice(120.0, 8192), 22050, &target(Some(120.0), 1000.0, 0.01))
            .unwrap();
        assert!(matches!(result, StageOutput::Skipped(_)));
    }

    #[test]
    fn test_only_first_three_formants_used() {
        let stage = FormantStage::new(&TransformConfig::default());
        let mut t = target(Some(120.0), 1000.0, 0.01);
        t.formants = FormantSet {
            frequencies: vec![300.0, 900.0, 1800.0, 3000.0],
            is_fallback: false,
        };

        let base = voice(120.0, 8192);
        let (out, status) = stage.apply(&base, 22050, &t);
        assert_eq!(status, crate::transform::StageStatus::Applied);
        assert_eq!(out.len(), base.len());

        let gains = stage.gains(&[300.0, 900.0, 1800.0], 22050);
        let bin_3000 = (3000.0f32 * 2048.0 / 22050.0).round() as usize;
        assert!((gains[bin_3000] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_formant_does_not_pull_in_fourth() {
        let stage = FormantStage::new(&TransformConfig::default());
        let formants = FormantSet {
            frequencies: vec![300.0, 0.0, 1800.0, 3000.0],
            is_fallback: false,
        };
        assert_eq!(stage.centers(&formants), vec![300.0, 1800.0]);

        let mut t = target(Some(120.0), 1000.0, 0.01);
        t.formants = formants;
        let base = voice(120.0, 8192);
        let (out, status) = stage.apply(&base, 22050, &t);
        assert_eq!(status, crate::transform::StageStatus::Applied);

        let gains = stage.gains(&[300.0, 1800.0], 22050);
        let expected = apply_spectral_gain(&stage.stft, StageKind::Formant, &base, &gains).unwrap();
        let max_diff = out
            .iter()
            .zip(&expected)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 1e-5, "max diff {}", max_diff);
    }
}
