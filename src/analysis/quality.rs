//! Reference recording quality check
//!
//! Three pass/fail checks worth 25 points each on top of a 25-point base:
//! duration window, RMS window, and a zero-crossing-rate noise proxy.

use serde::Serialize;

use super::features::zero_crossing_rate;
use crate::audio::Waveform;
use crate::config::QualityConfig;

const POINTS_PER_CHECK: u32 = 25;

/// A problem found in a reference recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QualityIssue {
    Duration { seconds: f32, min: f32, max: f32 },
    TooQuiet { rms: f32 },
    TooLoud { rms: f32 },
    Noisy { zero_crossing_rate: f32 },
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityIssue::Duration { seconds, min, max } => write!(
                f,
                "Duration should be {}-{} seconds (current: {:.1}s)",
                min, max, seconds
            ),
            QualityIssue::TooQuiet { rms } => write!(f, "Audio too quiet (RMS {:.4})", rms),
            QualityIssue::TooLoud { rms } => write!(f, "Audio too loud (RMS {:.4})", rms),
            QualityIssue::Noisy { zero_crossing_rate } => write!(
                f,
                "High background noise detected (zero-crossing rate {:.3})",
                zero_crossing_rate
            ),
        }
    }
}

/// Outcome of [`check_reference_quality`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceQualityReport {
    /// 0-100 in steps of 25
    pub score: u32,
    pub duration: f32,
    pub rms: f32,
    pub zero_crossing_rate: f32,
    pub issues: Vec<QualityIssue>,
}

impl ReferenceQualityReport {
    pub fn is_acceptable(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Score a reference recording against the configured thresholds
pub fn check_reference_quality(
    wave: &Waveform,
    config: &QualityConfig,
    frame_length: usize,
    hop_length: usize,
) -> ReferenceQualityReport {
    let duration = wave.duration();
    let rms = wave.rms();
    let zcr = zero_crossing_rate(&wave.samples, frame_length, hop_length);

    let mut score = POINTS_PER_CHECK;
    let mut issues = Vec::new();

    if (config.min_duration_secs..=config.max_duration_secs).contains(&duration) {
        score += POINTS_PER_CHECK;
    } else {
        issues.push(QualityIssue::Duration {
            seconds: duration,
            min: config.min_duration_secs,
            max: config.max_duration_secs,
        });
    }

    if rms < config.min_rms {
        issues.push(QualityIssue::TooQuiet { rms });
    } else if rms > config.max_rms {
        issues.push(QualityIssue::TooLoud { rms });
    } else {
        score += POINTS_PER_CHECK;
    }

    if zcr < config.max_zero_crossing_rate {
        score += POINTS_PER_CHECK;
    } else {
        issues.push(QualityIssue::Noisy {
            zero_crossing_rate: zcr,
        });
    }

    ReferenceQualityReport {
        score,
        duration,
        rms,
        zero_crossing_rate: zcr,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(secs: f32, amplitude: f32) -> Waveform {
        let n = (22050.0 * secs) as usize;
        Waveform::new(
            (0..n)
                .map(|i| amplitude * (2.0 * PI * 150.0 * i as f32 / 22050.0).sin())
                .collect(),
            22050,
        )
    }

    #[test]
    fn test_good_recording_scores_full() {
        let report = check_reference_quality(&tone(5.0, 0.2), &QualityConfig::default(), 2048, 512);
        assert_eq!(report.score, 100);
        assert!(report.is_acceptable());
    }

    #[test]
    fn test_short_quiet_recording() {
        let report =
            check_reference_quality(&tone(1.0, 0.001), &QualityConfig::default(), 2048, 512);
        assert_eq!(report.score, 50);
        assert!(matches!(report.issues[0], QualityIssue::Duration { .. }));
        assert!(matches!(report.issues[1], QualityIssue::TooQuiet { .. }));
    }

    #[test]
    fn test_noisy_recording() {
        let noisy: Vec<f32> = (0..22050 * 4).map(|i| if i % 2 == 0 { 0.2 } else { -0.2 }).collect();
        let report = check_reference_quality(
            &Waveform::new(noisy, 22050),
            &QualityConfig::default(),
            2048,
            512,
        );
        assert_eq!(report.score, 75);
        assert!(matches!(report.issues[0], QualityIssue::Noisy { .. }));
        assert!(report.issues[0].to_string().contains("noise"));
    }
}
