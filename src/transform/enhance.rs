//! Final quality enhancement
//!
//! Zero-phase Butterworth low-pass to strip resynthesis artifacts, a
//! sign-preserving soft compressor above a fixed threshold, and peak
//! normalization. Non-finite input samples are zeroed first.

use tracing::warn;

use crate::audio::{peak, ButterworthLowPass};
use crate::config::EnhancerConfig;
use crate::core::error::{StageError, StageKind, StageResult};

pub struct QualityEnhancer {
    filter: std::result::Result<ButterworthLowPass, String>,
    threshold: f32,
    ratio: f32,
    peak_level: f32,
}

impl QualityEnhancer {
    pub fn new(config: &EnhancerConfig, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let cutoff = config.cutoff_hz.min(nyquist * config.nyquist_fraction);
        let filter = ButterworthLowPass::new(config.filter_order, cutoff, sample_rate)
            .map_err(|e| format!("{:#}", e));

        Self {
            filter,
            threshold: config.compressor_threshold,
            ratio: config.compressor_ratio,
            peak_level: config.peak_level,
        }
    }

    /// Enhance, returning the input unchanged if anything fails
    pub fn enhance(&self, samples: &[f32]) -> Vec<f32> {
        self.try_enhance(samples).unwrap_or_else(|e| {
            warn!("{}", e);
            samples.to_vec()
        })
    }

    pub fn try_enhance(&self, samples: &[f32]) -> StageResult<Vec<f32>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }
        let filter = self
            .filter
            .as_ref()
            .map_err(|e| StageError::processing(StageKind::Enhancement, e))?;

        let sanitized: Vec<f32> = samples
            .iter()
            .map(|&s| if s.is_finite() { s } else { 0.0 })
            .collect();

        let filtered = filter.filtfilt(&sanitized);
        let compressed: Vec<f32> = filtered.iter().map(|&s| self.compress(s)).collect();

        let max = peak(&compressed);
        let out: Vec<f32> = if max > 0.0 {
            let gain = self.peak_level / max;
            compressed.iter().map(|s| s * gain).collect()
        } else {
            compressed
        };

        if out.iter().any(|s| !s.is_finite()) {
            return Err(StageError::InvalidOutput {
                stage: StageKind::Enhancement,
                message: "non-finite samples after enhancement".into(),
            });
        }
        Ok(out)
    }

    fn compress(&self, sample: f32) -> f32 {
        let magnitude = sample.abs();
        if magnitude > self.threshold {
            sample.signum() * (self.threshold + (magnitude - self.threshold) / self.ratio)
        } else {
            sample
        }
    }
}
