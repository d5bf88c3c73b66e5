//! Configuration types

mod engine_config;

pub use engine_config::{
    AnalysisConfig, AudioConfig, EngineConfig, EnhancerConfig, QualityConfig, TransformConfig,
    WatermarkConfig,
};
