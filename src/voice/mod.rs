//! Voice Module
//!
//! - Base speech synthesizers the cascade starts from
//! - The cloning orchestrator and its shared wrapper
//! - Output watermarking

pub mod cloning;
pub mod synthesizer;
pub mod watermark;

pub use cloning::{
    CloneOutput, EngineState, EngineStats, ReferenceSession, SharedVoiceCloningEngine,
    VoiceCloningEngine,
};
pub use synthesizer::{BaseSynthesizer, CommandSynthesizer, ToneSynthesizer};
pub use watermark::Watermark;
