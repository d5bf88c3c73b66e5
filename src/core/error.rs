//! Structured error handling for the voice cloning engine
//!
//! Two layers:
//! - [`CloneError`]: surfaced to callers of the orchestrator. Every variant maps
//!   to an [`ErrorCategory`] so a UI can tell bad input from a degraded engine
//!   from an unavailable upstream dependency.
//! - [`StageError`]: raised inside a single transformation/enhancement stage.
//!   It never reaches the caller; the pipeline recovers by keeping the stage's
//!   input waveform and records the failure in its report.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with CloneError
pub type Result<T> = std::result::Result<T, CloneError>;

/// Result type for a single pipeline stage
pub type StageResult<T> = std::result::Result<T, StageError>;

/// Main error type for the cloning engine
#[derive(Error, Debug, Clone)]
pub enum CloneError {
    /// Rejected before any work began (empty text, missing reference, ...)
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// The reference recording could not be analyzed
    #[error("Reference analysis failed for {path:?}: {message}")]
    ReferenceAnalysis { message: String, path: PathBuf },

    /// Feature computation could not complete
    #[error("Feature extraction failed: {message}")]
    Extraction { message: String },

    /// Base synthesizer unavailable or produced no audio
    #[error("Base synthesis failed ({synthesizer}): {message}")]
    Synthesis {
        message: String,
        synthesizer: String,
    },

    /// Audio decoding / encoding / resampling errors
    #[error("Audio processing error ({operation}): {message}")]
    Audio {
        message: String,
        operation: AudioOperation,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

/// User-facing classification of a [`CloneError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller supplied something unusable
    BadInput,
    /// The engine could not do its own work (analysis, audio processing)
    EngineDegraded,
    /// An external collaborator (synthesizer, filesystem) is unavailable
    UpstreamUnavailable,
    /// Bug or misconfiguration
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::BadInput => write!(f, "bad input"),
            ErrorCategory::EngineDegraded => write!(f, "engine degraded"),
            ErrorCategory::UpstreamUnavailable => write!(f, "upstream dependency unavailable"),
            ErrorCategory::Internal => write!(f, "internal error"),
        }
    }
}

impl CloneError {
    /// Shorthand for an input validation failure
    pub fn invalid_input(message: impl Into<String>, field: &str) -> Self {
        CloneError::InvalidInput {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Classify the error for reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            CloneError::InvalidInput { .. } => ErrorCategory::BadInput,
            CloneError::ReferenceAnalysis { .. }
            | CloneError::Extraction { .. }
            | CloneError::Audio { .. } => ErrorCategory::EngineDegraded,
            CloneError::Synthesis { .. } | CloneError::Io { .. } => {
                ErrorCategory::UpstreamUnavailable
            }
            CloneError::Config { .. } | CloneError::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Audio operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOperation {
    Loading,
    Resampling,
    Saving,
    Watermarking,
}

impl fmt::Display for AudioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioOperation::Loading => write!(f, "loading"),
            AudioOperation::Resampling => write!(f, "resampling"),
            AudioOperation::Saving => write!(f, "saving"),
            AudioOperation::Watermarking => write!(f, "watermarking"),
        }
    }
}

/// Transformation / enhancement stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Pitch,
    SpectralEnvelope,
    Formant,
    Texture,
    Dynamics,
    Enhancement,
}

impl StageKind {
    /// Stable snake_case name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Pitch => "pitch",
            StageKind::SpectralEnvelope => "spectral_envelope",
            StageKind::Formant => "formant",
            StageKind::Texture => "texture",
            StageKind::Dynamics => "dynamics",
            StageKind::Enhancement => "enhancement",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Pitch => write!(f, "pitch transformation"),
            StageKind::SpectralEnvelope => write!(f, "spectral envelope modification"),
            StageKind::Formant => write!(f, "formant shifting"),
            StageKind::Texture => write!(f, "voice texture adjustment"),
            StageKind::Dynamics => write!(f, "dynamics matching"),
            StageKind::Enhancement => write!(f, "quality enhancement"),
        }
    }
}

/// Failure inside one stage. Always recovered locally.
#[derive(Error, Debug, Clone)]
pub enum StageError {
    /// A DSP primitive (STFT, resampler, filter) failed
    #[error("{stage} failed: {message}")]
    Processing { stage: StageKind, message: String },

    /// The stage produced samples that cannot be passed downstream
    #[error("{stage} produced invalid output: {message}")]
    InvalidOutput { stage: StageKind, message: String },
}

impl StageError {
    pub fn processing(stage: StageKind, err: impl fmt::Display) -> Self {
        StageError::Processing {
            stage,
            message: err.to_string(),
        }
    }

    pub fn stage(&self) -> StageKind {
        match self {
            StageError::Processing { stage, .. } | StageError::InvalidOutput { stage, .. } => *stage,
        }
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for CloneError {
    fn from(err: anyhow::Error) -> Self {
        CloneError::Internal {
            message: format!("{:#}", err),
            location: None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CloneError {
    fn from(err: std::io::Error) -> Self {
        CloneError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}
