//! Engine configuration
//!
//! Every tuning constant of the cloning cascade lives here as a named field.
//! The defaults are the empirically chosen values the engine has always used;
//! none of them has a documented acoustic derivation, so treat them as
//! calibration starting points rather than ground truth.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::CloneError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Canonical audio format
    pub audio: AudioConfig,

    /// Feature extraction parameters
    pub analysis: AnalysisConfig,

    /// Transformation stage parameters
    pub transform: TransformConfig,

    /// Final enhancement parameters
    pub enhancer: EnhancerConfig,

    /// Reference recording quality thresholds
    pub quality: QualityConfig,

    /// Output watermark
    pub watermark: WatermarkConfig,

    /// Directory for cloned output files (None = system temp dir)
    pub output_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content).with_context(|| "Failed to parse config YAML")
    }

    /// Save configuration as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Directory cloned files are written to
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Check internal consistency
    pub fn validate(&self) -> std::result::Result<(), CloneError> {
        let nyquist = self.audio.sample_rate as f32 / 2.0;
        let fail = |message: String| {
            Err(CloneError::Config {
                message,
                path: None,
            })
        };

        if self.audio.sample_rate == 0 {
            return fail("sample_rate must be positive".into());
        }
        let a = &self.analysis;
        if a.n_fft < 16 || a.hop_length == 0 || a.hop_length > a.n_fft {
            return fail(format!(
                "invalid STFT geometry: n_fft={} hop_length={}",
                a.n_fft, a.hop_length
            ));
        }
        if !(a.pitch_fmin > 0.0 && a.pitch_fmin < a.pitch_fmax && a.pitch_fmax < nyquist) {
            return fail(format!(
                "pitch range {}..{} Hz must be positive, ordered and below Nyquist ({} Hz)",
                a.pitch_fmin, a.pitch_fmax, nyquist
            ));
        }
        let max_period = (self.audio.sample_rate as f32 / a.pitch_fmin).ceil() as usize;
        if max_period * 2 > a.pitch_frame_length {
            return fail(format!(
                "pitch_frame_length {} too short for fmin {} Hz",
                a.pitch_frame_length, a.pitch_fmin
            ));
        }
        if a.n_formants == 0 || a.fallback_formants.len() != a.n_formants {
            return fail("fallback_formants must contain exactly n_formants entries".into());
        }

        let t = &self.transform;
        for (name, lo, hi) in [
            ("pitch ratio", t.pitch_ratio_min, t.pitch_ratio_max),
            ("envelope ratio", t.envelope_ratio_min, t.envelope_ratio_max),
            ("energy ratio", t.energy_ratio_min, t.energy_ratio_max),
        ] {
            if !(lo > 0.0 && lo <= hi) {
                return fail(format!("{} clamp [{}, {}] is invalid", name, lo, hi));
            }
        }
        if t.bins_per_octave == 0 || t.target_rms <= 0.0 {
            return fail("bins_per_octave and target_rms must be positive".into());
        }

        let e = &self.enhancer;
        if e.filter_order == 0 || e.filter_order % 2 != 0 || e.filter_order > 8 {
            return fail(format!("filter_order {} must be even and <= 8", e.filter_order));
        }
        if e.compressor_ratio < 1.0 || !(e.peak_level > 0.0 && e.peak_level <= 1.0) {
            return fail("compressor_ratio must be >= 1 and peak_level in (0, 1]".into());
        }

        let w = &self.watermark;
        if w.enabled && !(w.frequency_hz > 0.0 && w.frequency_hz < nyquist) {
            return fail(format!(
                "watermark frequency {} Hz must be below Nyquist ({} Hz) at {} Hz sample rate",
                w.frequency_hz, nyquist, self.audio.sample_rate
            ));
        }

        Ok(())
    }
}

/// Canonical audio format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate every waveform is converted to
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// FFT size for spectral features
    pub n_fft: usize,
    /// Hop length between frames
    pub hop_length: usize,
    /// Lowest tracked pitch (C2)
    pub pitch_fmin: f32,
    /// Highest tracked pitch (C7)
    pub pitch_fmax: f32,
    /// Pitch tracker frame length
    pub pitch_frame_length: usize,
    /// YIN aperiodicity threshold for the voiced decision
    pub voicing_threshold: f32,
    /// Frames quieter than this RMS are always unvoiced
    pub silence_rms: f32,
    /// Mel bands used for MFCCs
    pub n_mels: usize,
    /// Dynamic range kept by the dB conversion before the DCT
    pub top_db: f32,
    /// Spectral rolloff energy fraction
    pub rolloff_percent: f32,
    /// Number of formants to estimate
    pub n_formants: usize,
    /// Peak must exceed this fraction of the strongest bin's power
    pub formant_peak_ratio: f32,
    /// Returned when peak picking cannot produce enough formants
    pub fallback_formants: Vec<f32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            pitch_fmin: 65.406,
            pitch_fmax: 2093.005,
            pitch_frame_length: 2048,
            voicing_threshold: 0.1,
            silence_rms: 1e-4,
            n_mels: 128,
            top_db: 80.0,
            rolloff_percent: 0.85,
            n_formants: 4,
            formant_peak_ratio: 0.1,
            fallback_formants: vec![500.0, 1500.0, 2500.0, 3500.0],
        }
    }
}

/// Transformation stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// STFT size used by the spectral stages
    pub n_fft: usize,
    /// STFT hop used by the spectral stages
    pub hop_length: usize,

    pub pitch_ratio_min: f32,
    pub pitch_ratio_max: f32,
    /// Scale the `12·log2(ratio)` shift is expressed on; 12 applies the
    /// full ratio, 24 half of it in log frequency
    pub bins_per_octave: u32,

    pub envelope_ratio_min: f32,
    pub envelope_ratio_max: f32,
    /// Gaussian sigma as a fraction of the target centroid
    pub envelope_bandwidth: f32,
    /// Fraction of the centroid correction actually applied
    pub envelope_strength: f32,

    /// How many target formants are emphasized
    pub formant_count: usize,
    /// Gaussian sigma as a fraction of each formant frequency
    pub formant_bandwidth: f32,
    /// Peak gain added at each formant center
    pub formant_boost: f32,

    /// Exponent scale of the log-frequency tilt
    pub texture_tilt_strength: f32,

    pub energy_ratio_min: f32,
    pub energy_ratio_max: f32,
    /// RMS level after dynamics matching
    pub target_rms: f32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            pitch_ratio_min: 0.5,
            pitch_ratio_max: 2.0,
            bins_per_octave: 24,
            envelope_ratio_min: 0.8,
            envelope_ratio_max: 1.2,
            envelope_bandwidth: 0.3,
            envelope_strength: 0.3,
            formant_count: 3,
            formant_bandwidth: 0.1,
            formant_boost: 0.2,
            texture_tilt_strength: 0.1,
            energy_ratio_min: 0.3,
            energy_ratio_max: 3.0,
            target_rms: 0.1,
        }
    }
}

/// Quality enhancer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Upper bound for the low-pass cutoff
    pub cutoff_hz: f32,
    /// Cutoff never exceeds this fraction of Nyquist
    pub nyquist_fraction: f32,
    /// Butterworth order (even)
    pub filter_order: usize,
    pub compressor_threshold: f32,
    pub compressor_ratio: f32,
    /// Final peak level (fraction of full scale)
    pub peak_level: f32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            cutoff_hz: 8000.0,
            nyquist_fraction: 0.9,
            filter_order: 4,
            compressor_threshold: 0.1,
            compressor_ratio: 3.0,
            peak_level: 0.8,
        }
    }
}

/// Reference recording quality thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_duration_secs: f32,
    pub max_duration_secs: f32,
    pub min_rms: f32,
    pub max_rms: f32,
    /// Above this mean zero-crossing rate the recording is considered noisy
    pub max_zero_crossing_rate: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: 3.0,
            max_duration_secs: 15.0,
            min_rms: 0.01,
            max_rms: 0.5,
            max_zero_crossing_rate: 0.3,
        }
    }
}

/// Output watermark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub enabled: bool,
    /// Must be below Nyquist of `audio.sample_rate`
    pub frequency_hz: f32,
    pub amplitude: f32,
    /// Owner label embedded in the watermark tag
    pub owner: String,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency_hz: 18000.0,
            amplitude: 0.001,
            owner: "anonymous".to_string(),
        }
    }
}
