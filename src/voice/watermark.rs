//! Output watermark
//!
//! A low-amplitude sine near the top of the band plus a provenance tag
//! (`CLONED_<timestamp>_<owner>`) returned alongside the file.

use std::f32::consts::PI;

use chrono::Utc;

use crate::config::WatermarkConfig;
use crate::core::error::{AudioOperation, CloneError, Result};

#[derive(Debug, Clone)]
pub struct Watermark {
    frequency_hz: f32,
    amplitude: f32,
    owner: String,
}

impl Watermark {
    /// `None` when disabled; errors if the tone cannot exist at `sample_rate`
    pub fn from_config(config: &WatermarkConfig, sample_rate: u32) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !(config.frequency_hz > 0.0 && config.frequency_hz < nyquist) {
            return Err(CloneError::Audio {
                message: format!(
                    "watermark at {} Hz is not representable at {} Hz sample rate",
                    config.frequency_hz, sample_rate
                ),
                operation: AudioOperation::Watermarking,
            });
        }
        Ok(Some(Self {
            frequency_hz: config.frequency_hz,
            amplitude: config.amplitude,
            owner: config.owner.clone(),
        }))
    }

    /// Add the tone and return the provenance tag
    pub fn apply(&self, samples: &[f32], sample_rate: u32) -> (Vec<f32>, String) {
        let sr = sample_rate as f32;
        let marked = samples
            .iter()
            .enumerate()
            .map(|(i, &s)| s + self.amplitude * (2.0 * PI * self.frequency_hz * i as f32 / sr).sin())
            .collect();
        (marked, self.tag())
    }

    pub fn tag(&self) -> String {
        format!("CLONED_{}_{}", Utc::now().to_rfc3339(), self.owner)
    }
}
