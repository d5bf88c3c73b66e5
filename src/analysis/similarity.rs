//! Scalar voice similarity
//!
//! The score is the mean of two closeness terms, pitch and spectral centroid,
//! each `1 - |a - b| / max(a, b)`. It is symmetric, bounded to [0, 1] and
//! equals 1 for identical feature vectors.

use super::features::FeatureVector;

/// Similarity of two feature vectors in [0, 1]
pub fn similarity_from_features(a: &FeatureVector, b: &FeatureVector) -> f32 {
    let pitch = match (a.f0_mean, b.f0_mean) {
        (Some(fa), Some(fb)) => closeness(fa, fb),
        (None, None) => 1.0,
        // One voiced, one not: no pitch agreement
        _ => 0.0,
    };
    let spectral = closeness(a.spectral_centroid_mean, b.spectral_centroid_mean);

    ((pitch + spectral) / 2.0).clamp(0.0, 1.0)
}

/// `1 - |a - b| / max(a, b)`; two non-positive values count as identical
pub fn closeness(a: f32, b: f32) -> f32 {
    let max = a.max(b);
    if !(max > 0.0) {
        return 1.0;
    }
    (1.0 - (a - b).abs() / max).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FormantSet;

    fn features(f0: Option<f32>, centroid: f32) -> FeatureVector {
        FeatureVector {
            f0_mean: f0,
            f0_std: f0.map(|_| 1.0),
            spectral_centroid_mean: centroid,
            spectral_rolloff_mean: 0.0,
            zero_crossing_rate_mean: 0.0,
            mfcc_mean: [0.0; 13],
            formants: FormantSet {
                frequencies: vec![500.0, 1500.0, 2500.0, 3500.0],
                is_fallback: true,
            },
            duration: 1.0,
            energy: 0.01,
        }
    }

    #[test]
    fn test_identical_is_one() {
        let a = features(Some(150.0), 1200.0);
        assert_eq!(similarity_from_features(&a, &a), 1.0);

        let silent = features(None, 0.0);
        assert_eq!(similarity_from_features(&silent, &silent), 1.0);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let cases = [
            features(Some(100.0), 800.0),
            features(Some(220.0), 2500.0),
            features(None, 1500.0),
            features(Some(80.0), 0.0),
        ];
        for a in &cases {
            for b in &cases {
                let ab = similarity_from_features(a, b);
                let ba = similarity_from_features(b, a);
                assert_eq!(ab, ba);
                assert!((0.0..=1.0).contains(&ab));
            }
        }
    }

    #[test]
    fn test_known_value() {
        let a = features(Some(100.0), 1000.0);
        let b = features(Some(200.0), 1000.0);
        // pitch 0.5, spectral 1.0
        assert!((similarity_from_features(&a, &b) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_one_unvoiced_pitch_scores_zero() {
        let a = features(Some(150.0), 1000.0);
        let b = features(None, 1000.0);
        assert!((similarity_from_features(&a, &b) - 0.5).abs() < 1e-6);
    }
}
