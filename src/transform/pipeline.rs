//! Transformation pipeline
//!
//! Runs the stages in [`StageKind`] order and records what each one did.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    DynamicsStage, FormantStage, PitchStage, SpectralEnvelopeStage, TextureStage, TransformStage,
};
use crate::analysis::FeatureVector;
use crate::config::{AnalysisConfig, TransformConfig};
use crate::core::error::{Result, StageKind};

/// Result of one stage invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Applied,
    Skipped { reason: String },
    /// The stage failed and its input was passed through
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: StageKind,
    #[serde(flatten)]
    pub status: StageStatus,
    pub elapsed_ms: f64,
}

/// Per-stage outcomes of one cascade run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageRecord>,
}

impl PipelineReport {
    pub fn record(&mut self, stage: StageKind, status: StageStatus, started: Instant) {
        self.stages.push(StageRecord {
            stage,
            status,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        });
    }

    pub fn status(&self, stage: StageKind) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    pub fn applied(&self) -> usize {
        self.count(|s| matches!(s, StageStatus::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, StageStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StageStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&StageStatus) -> bool) -> usize {
        self.stages.iter().filter(|r| pred(&r.status)).count()
    }
}

/// Ordered cascade of transformation stages
pub struct TransformPipeline {
    stages: Vec<Box<dyn TransformStage>>,
}

impl TransformPipeline {
    /// Build from arbitrary stages; they always run in [`StageKind`] order
    pub fn new(mut stages: Vec<Box<dyn TransformStage>>) -> Self {
        stages.sort_by_key(|s| s.kind());
        Self { stages }
    }

    /// Pitch, spectral envelope, formant, texture, dynamics
    pub fn standard(
        transform: &TransformConfig,
        analysis: &AnalysisConfig,
        sample_rate: u32,
    ) -> Result<Self> {
        Ok(Self::new(vec![
            Box::new(PitchStage::new(transform, analysis, sample_rate)?),
            Box::new(SpectralEnvelopeStage::new(transform)),
            Box::new(FormantStage::new(transform)),
            Box::new(TextureStage::new(transform)),
            Box::new(DynamicsStage::new(transform)),
        ]))
    }

    pub fn stages(&self) -> &[Box<dyn TransformStage>] {
        &self.stages
    }

    /// Run every stage; never fails, failures are in the report
    pub fn run(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target: &FeatureVector,
    ) -> (Vec<f32>, PipelineReport) {
        let mut current = samples.to_vec();
        let mut report = PipelineReport::default();

        for stage in &self.stages {
            let started = Instant::now();
            let (next, status) = stage.apply(&current, sample_rate, target);

            match &status {
                StageStatus::Applied => debug!(stage = stage.kind().name(), "Stage applied"),
                StageStatus::Skipped { reason } => {
                    debug!(stage = stage.kind().name(), %reason, "Stage skipped")
                }
                StageStatus::Failed { message } => {
                    warn!(stage = stage.kind().name(), %message, "Stage failed, keeping its input")
                }
            }

            report.record(stage.kind(), status, started);
            current = next;
        }

        info!(
            applied = report.applied(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Transformation cascade finished"
        );
        (current, report)
    }
}
