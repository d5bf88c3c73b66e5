//! Coarse voice register from mean pitch

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoiceType {
    Deep,
    MediumLow,
    Medium,
    High,
    /// No voiced frames
    Unknown,
}

impl VoiceType {
    pub fn from_pitch(f0_mean: Option<f32>) -> Self {
        match f0_mean {
            None => VoiceType::Unknown,
            Some(f0) if f0 < 150.0 => VoiceType::Deep,
            Some(f0) if f0 < 200.0 => VoiceType::MediumLow,
            Some(f0) if f0 < 250.0 => VoiceType::Medium,
            Some(_) => VoiceType::High,
        }
    }
}

impl fmt::Display for VoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceType::Deep => write!(f, "deep"),
            VoiceType::MediumLow => write!(f, "medium-low"),
            VoiceType::Medium => write!(f, "medium"),
            VoiceType::High => write!(f, "high"),
            VoiceType::Unknown => write!(f, "unknown"),
        }
    }
}
