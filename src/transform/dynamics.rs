//! Dynamics matching stage
//!
//! Scales by the clamped amplitude ratio to the reference, then renormalizes
//! to a fixed RMS so the enhancer always sees a predictable level.

use tracing::debug;

use super::{StageOutput, TransformStage};
use crate::analysis::FeatureVector;
use crate::audio::energy;
use crate::config::TransformConfig;
use crate::core::error::{StageKind, StageResult};

/// Clamped amplitude ratio taking energy `current` to `target`
pub fn energy_ratio(target: f32, current: f32, min: f32, max: f32) -> f32 {
    (target / current).sqrt().clamp(min, max)
}

pub struct DynamicsStage {
    ratio_min: f32,
    ratio_max: f32,
    target_rms: f32,
}

impl DynamicsStage {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            ratio_min: config.energy_ratio_min,
            ratio_max: config.energy_ratio_max,
            target_rms: config.target_rms,
        }
    }
}

impl TransformStage for DynamicsStage {
    fn kind(&self) -> StageKind {
        StageKind::Dynamics
    }

    fn description(&self) -> &str {
        "Matches energy to the reference and normalizes RMS"
    }

    fn process(
        &self,
        samples: &[f32],
        _sample_rate: u32,
        target: &FeatureVector,
    ) -> StageResult<StageOutput> {
        if !(target.energy > 0.0) {
            return Ok(StageOutput::Skipped("reference energy undefined".into()));
        }
        let current = energy(samples);
        if !(current > 0.0) {
            return Ok(StageOutput::Skipped("base is silent".into()));
        }

        let ratio = energy_ratio(target.energy, current, self.ratio_min, self.ratio_max);
        let scaled: Vec<f32> = samples.iter().map(|s| s * ratio).collect();

        let rms = energy(&scaled).sqrt();
        let gain = if rms > 0.0 { self.target_rms / rms } else { 1.0 };
        debug!(current, target = target.energy, ratio, gain, "Dynamics");

        Ok(StageOutput::Transformed(scaled.into_iter().map(|s| s * gain).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::{target, voice};

    #[test]
    fn test_energy_ratio_clamped() {
        assert_eq!(energy_ratio(100.0, 1.0, 0.3, 3.0), 3.0);
        assert_eq!(energy_ratio(0.001, 1.0, 0.3, 3.0), 0.3);
        assert!((energy_ratio(4.0, 1.0, 0.3, 3.0) - 2.0).abs() < 1e-6);
        assert!((energy_ratio(0.25, 1.0, 0.3, 3.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_output_rms_is_target() {
        let stage = DynamicsStage::new(&TransformConfig::default());
        let base = voice(120.0, 8192);
        for reference_energy in [1e-6f32, 0.01, 0.5] {
            let (out, _) = stage.apply(&base, 22050, &target(None, 0.0, reference_energy));
            let rms = energy(&out).sqrt();
            assert!((rms - 0.1).abs() < 1e-4, "rms {}", rms);
        }
    }

    #[test]
    fn test_undefined_target_energy_is_identity() {
        let stage = DynamicsStage::new(&TransformConfig::default());
        let base = voice(120.0, 4096);
        let (out, status) = stage.apply(&base, 22050, &target(None, 0.0, 0.0));
        assert_eq!(out, base);
        assert!(matches!(status, crate::transform::StageStatus::Skipped { .. }));
    }

    #[test]
    fn test_silent_base_is_identity() {
        let stage = DynamicsStage::new(&TransformConfig::default());
        let (out, _) = stage.apply(&[0.0; 512], 22050, &target(None, 0.0, 0.01));
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
