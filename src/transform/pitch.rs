//! Pitch transformation stage

use tracing::debug;

use super::{StageOutput, TransformStage};
use crate::analysis::FeatureVector;
use crate::audio::{PitchShifter, PitchTracker};
use crate::config::{AnalysisConfig, TransformConfig};
use crate::core::error::{CloneError, Result, StageError, StageKind, StageResult};

/// Clamped frequency ratio moving `current` onto `target`
pub fn pitch_ratio(target: f32, current: f32, min: f32, max: f32) -> f32 {
    (target / current).clamp(min, max)
}

/// Frequency ratio actually applied for `ratio`
///
/// The shift is `12·log2(ratio)` steps on a `bins_per_octave` scale, so only
/// 12 bins per octave reproduces `ratio` exactly; 24 moves half way in log
/// frequency.
pub fn applied_shift(ratio: f32, bins_per_octave: u32) -> f32 {
    let steps = 12.0 * ratio.log2();
    2f32.powf(steps / bins_per_octave as f32)
}

/// Shifts the base utterance so its mean voiced f0 approaches the target's
pub struct PitchStage {
    tracker: PitchTracker,
    shifter: PitchShifter,
    sample_rate: u32,
    ratio_min: f32,
    ratio_max: f32,
    bins_per_octave: u32,
}

impl PitchStage {
    pub fn new(config: &TransformConfig, analysis: &AnalysisConfig, sample_rate: u32) -> Result<Self> {
        let tracker = PitchTracker::new(analysis, sample_rate).map_err(|e| CloneError::Config {
            message: format!("{:#}", e),
            path: None,
        })?;

        Ok(Self {
            tracker,
            shifter: PitchShifter::new(config.n_fft, config.hop_length),
            sample_rate,
            ratio_min: config.pitch_ratio_min,
            ratio_max: config.pitch_ratio_max,
            bins_per_octave: config.bins_per_octave,
        })
    }
}

impl TransformStage for PitchStage {
    fn kind(&self) -> StageKind {
        StageKind::Pitch
    }

    fn description(&self) -> &str {
        "Moves mean voiced pitch towards the reference (duration preserving)"
    }

    fn process(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target: &FeatureVector,
    ) -> StageResult<StageOutput> {
        let target_f0 = match target.f0_mean {
            Some(f0) if f0 > 0.0 => f0,
            _ => return Ok(StageOutput::Skipped("reference pitch undefined".into())),
        };
        if sample_rate != self.sample_rate {
            return Err(StageError::processing(
                self.kind(),
                format!("expected {} Hz input, got {} Hz", self.sample_rate, sample_rate),
            ));
        }

        let current_f0 = match self.tracker.track(samples).voiced_mean() {
            Some(f0) if f0 > 0.0 => f0,
            _ => return Ok(StageOutput::Skipped("base pitch undefined".into())),
        };

        let ratio = pitch_ratio(target_f0, current_f0, self.ratio_min, self.ratio_max);
        let applied = applied_shift(ratio, self.bins_per_octave);
        debug!(target_f0, current_f0, ratio, applied, "Pitch shift");

        self.shifter
            .shift(samples, applied)
            .map(StageOutput::Transformed)
            .map_err(|e| StageError::processing(self.kind(), format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::{target, voice};

    fn stage() -> PitchStage {
        PitchStage::new(&TransformConfig::default(), &AnalysisConfig::default(), 22050).unwrap()
    }

    fn stage_with_bins(bins_per_octave: u32) -> PitchStage {
        let config = TransformConfig {
            bins_per_octave,
            ..TransformConfig::default()
        };
        PitchStage::new(&config, &AnalysisConfig::default(), 22050).unwrap()
    }

    fn mean_f0(samples: &[f32]) -> f32 {
        PitchTracker::new(&AnalysisConfig::default(), 22050)
            .unwrap()
            .track(samples)
            .voiced_mean()
            .unwrap()
    }

    #[test]
    fn test_ratio_clamped() {
        assert_eq!(pitch_ratio(600.0, 100.0, 0.5, 2.0), 2.0);
        assert_eq!(pitch_ratio(40.0, 100.0, 0.5, 2.0), 0.5);
        assert!((pitch_ratio(150.0, 120.0, 0.5, 2.0) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_applied_shift_scales_with_bins_per_octave() {
        assert!((applied_shift(1.25, 12) - 1.25).abs() < 1e-5);
        assert!((applied_shift(1.25, 24) - 1.25f32.sqrt()).abs() < 1e-5);
        assert!((applied_shift(2.0, 48) - 2f32.powf(0.25)).abs() < 1e-5);
        assert!((applied_shift(0.5, 24) - 0.5f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_moves_pitch_towards_target() {
        let base = voice(120.0, 22050);
        let (out, status) = stage().apply(&base, 22050, &target(Some(150.0), 1000.0, 0.01));
        assert_eq!(status, crate::transform::StageStatus::Applied);
        assert_eq!(out.len(), base.len());

        // 24 bins per octave: 120 * sqrt(1.25) = 134.2 Hz
        let f0 = mean_f0(&out);
        assert!((f0 - 134.16).abs() < 6.0, "shifted f0 {}", f0);
    }

    #[test]
    fn test_bins_per_octave_changes_output() {
        let base = voice(120.0, 22050);
        let t = target(Some(150.0), 1000.0, 0.01);

        let (full, _) = stage_with_bins(12).apply(&base, 22050, &t);
        let (half, _) = stage_with_bins(24).apply(&base, 22050, &t);
        let (quarter, _) = stage_with_bins(48).apply(&base, 22050, &t);
        assert_ne!(full, half);

        let (f_full, f_half, f_quarter) = (mean_f0(&full), mean_f0(&half), mean_f0(&quarter));
        assert!((f_full - 150.0).abs() < 6.0, "12 bins: {}", f_full);
        assert!((f_half - 134.16).abs() < 6.0, "24 bins: {}", f_half);
        assert!(f_quarter > 120.0 && f_quarter < f_half, "48 bins: {}", f_quarter);
    }

    #[test]
    fn test_extreme_target_is_clamped_to_octave() {
        let base = voice(120.0, 22050);
        let (out, _) = stage().apply(&base, 22050, &target(Some(1000.0), 1000.0, 0.01));
        let f0 = mean_f0(&out);
        assert!(f0 < 250.0, "clamped f0 {}", f0);
    }

    #[test]
    fn test_skips_on_undefined_pitch() {
        let base = voice(120.0, 8192);
        let result = stage().process(&base, 22050, &target(None, 1000.0, 0.01)).unwrap();
        assert!(matches!(result, StageOutput::Skipped(_)));

        let silent = vec![0.0; 8192];
        let result = stage().process(&silent, 22050, &target(Some(150.0), 1000.0, 0.01)).unwrap();
        assert!(matches!(result, StageOutput::Skipped(_)));
    }
}
