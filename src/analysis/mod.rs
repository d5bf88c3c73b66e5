//! Voice analysis
//!
//! - Feature extraction (pitch, spectral shape, MFCCs, level)
//! - Formant estimation from spectral peaks
//! - Similarity scoring between two feature vectors
//! - Reference recording quality check and voice register

mod features;
mod formants;
mod quality;
mod similarity;
mod voice_type;

pub use features::{zero_crossing_rate, FeatureExtractor, FeatureVector, SpectralFeatureExtractor};
pub use formants::{FormantEstimator, FormantSet};
pub use quality::{check_reference_quality, QualityIssue, ReferenceQualityReport};
pub use similarity::{closeness, similarity_from_features};
pub use voice_type::VoiceType;
