//! # SDKWork Voice Clone - DSP Voice Cloning Engine
//!
//! Speaks arbitrary text in the voice of a short reference recording without
//! any trained model. A base synthesizer renders the text in a neutral voice,
//! then a cascade of signal-processing stages pulls that rendering toward the
//! acoustic features measured on the reference.
//!
//! ## Features
//!
//! - **Feature Extraction**: YIN pitch, spectral centroid/rolloff, zero-crossing rate, MFCCs, formants
//! - **Transformation Cascade**: pitch, spectral envelope, formant emphasis, texture, dynamics
//! - **Graceful Degradation**: a failing stage passes its input through and is reported
//! - **Quality Enhancement**: zero-phase low-pass, soft compression, peak normalization
//! - **Similarity Scoring**: pitch/centroid closeness between two recordings
//! - **Reference Quality Check**: duration, level and noise heuristics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sdkwork_voice_clone::{EngineConfig, CommandSynthesizer, VoiceCloningEngine};
//! use std::path::Path;
//!
//! let mut engine = VoiceCloningEngine::new(
//!     EngineConfig::default(),
//!     Box::new(CommandSynthesizer::default()),
//! )?;
//!
//! let output = engine.clone_voice("Hello, world!", Path::new("speaker.wav"))?;
//! println!("Wrote {:?} ({:.2}s)", output.path, output.duration);
//!
//! let score = engine.similarity(Path::new("speaker.wav"), &output.path);
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Driven by | Skipped when |
//! |-------|-----------|--------------|
//! | Pitch | mean f0 | either voice unvoiced |
//! | Spectral envelope | spectral centroid | either centroid is zero |
//! | Formant | estimated formants | estimation fell back to defaults |
//! | Texture | target/current centroid ratio (spectral tilt) | either centroid is zero |
//! | Dynamics | energy | reference or base silent |

pub mod analysis;
pub mod audio;
pub mod config;
pub mod core;
pub mod transform;
pub mod voice;

// Re-exports for convenience
pub use analysis::{
    check_reference_quality, similarity_from_features, FeatureExtractor, FeatureVector,
    FormantSet, ReferenceQualityReport, SpectralFeatureExtractor, VoiceType,
};
pub use audio::{AudioLoader, AudioOutput, Waveform};
pub use config::EngineConfig;
pub use core::error::{CloneError, ErrorCategory, Result, StageError, StageKind};
pub use transform::{
    PipelineReport, QualityEnhancer, StageOutput, StageStatus, TransformPipeline, TransformStage,
};
pub use voice::{
    BaseSynthesizer, CloneOutput, CommandSynthesizer, EngineState, EngineStats,
    SharedVoiceCloningEngine, ToneSynthesizer, VoiceCloningEngine, Watermark,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework name
pub const FRAMEWORK_NAME: &str = "SDKWork-VoiceClone";

/// Canonical sample rate for all analysis and output (22050 Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
