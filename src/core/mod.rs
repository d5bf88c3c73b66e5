//! Core abstractions shared by every module
//!
//! - `error`: structured errors, user-facing categories, stage failures

pub mod error;

pub use error::{
    AudioOperation, CloneError, ErrorCategory, Result, StageError, StageKind, StageResult,
};
