//! Base speech synthesizers
//!
//! The cloning engine does not speak by itself: a [`BaseSynthesizer`] renders
//! the text in some neutral voice and the cascade reshapes that rendering.
//! The result is handed over as a [`TempArtifact`] so the engine controls its
//! lifetime.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::audio::{AudioOutput, TempArtifact};
use crate::core::error::{CloneError, Result};

/// Smallest file that can hold a WAV header plus one sample
const MIN_WAV_BYTES: u64 = 46;

/// Renders text to a WAV file
pub trait BaseSynthesizer: Send {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Synthesize `text`; the artifact is removed when dropped
    fn synthesize(&self, text: &str) -> Result<TempArtifact>;
}

/// Runs an external text-to-speech program (espeak-ng compatible CLI)
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    /// Words per minute
    rate: u32,
    /// Amplitude on the 0-200 scale
    amplitude: u32,
    voice: Option<String>,
    temp_dir: PathBuf,
}

impl Default for CommandSynthesizer {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            rate: 150,
            // Volume 0.9 of the 0-200 range
            amplitude: 180,
            voice: None,
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_rate(mut self, words_per_minute: u32) -> Self {
        self.rate = words_per_minute;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.amplitude = (volume.clamp(0.0, 1.0) * 200.0).round() as u32;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    fn error(&self, message: impl Into<String>) -> CloneError {
        CloneError::Synthesis {
            message: message.into(),
            synthesizer: self.program.clone(),
        }
    }
}

impl BaseSynthesizer for CommandSynthesizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn synthesize(&self, text: &str) -> Result<TempArtifact> {
        let artifact = TempArtifact::unique_in(&self.temp_dir, "base", "wav");

        let mut command = Command::new(&self.program);
        command
            .arg("-s")
            .arg(self.rate.to_string())
            .arg("-a")
            .arg(self.amplitude.to_string())
            .arg("-w")
            .arg(artifact.path());
        if let Some(voice) = &self.voice {
            command.arg("-v").arg(voice);
        }
        command.arg(text);

        debug!(program = %self.program, path = ?artifact.path(), "Running base synthesizer");
        let output = command
            .output()
            .map_err(|e| self.error(format!("failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.error(format!("exited with {}: {}", output.status, stderr.trim())));
        }
        check_non_empty(artifact.path()).map_err(|m| self.error(m))?;

        info!(program = %self.program, "Base speech synthesized");
        Ok(artifact)
    }
}

/// Deterministic harmonic placeholder voice
///
/// Produces a steady five-harmonic tone with a gentle syllable-rate swell,
/// one fixed duration per character. Useful wherever a real TTS program is
/// unavailable.
#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    f0: f32,
    sample_rate: u32,
    seconds_per_char: f32,
    min_seconds: f32,
    temp_dir: PathBuf,
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self::new(120.0, crate::DEFAULT_SAMPLE_RATE)
    }
}

impl ToneSynthesizer {
    pub fn new(f0: f32, sample_rate: u32) -> Self {
        Self {
            f0,
            sample_rate,
            seconds_per_char: 0.06,
            min_seconds: 0.5,
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Duration rendered for `text`
    pub fn duration_for(&self, text: &str) -> f32 {
        (text.chars().count() as f32 * self.seconds_per_char).max(self.min_seconds)
    }

    /// Render `text` in memory
    pub fn render(&self, text: &str) -> Vec<f32> {
        let n = (self.duration_for(text) * self.sample_rate as f32) as usize;
        let sr = self.sample_rate as f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / sr;
                let swell = 0.8 + 0.2 * (2.0 * std::f32::consts::PI * 4.0 * t).sin();
                let voice: f32 = (1..=5)
                    .map(|h| {
                        let h = h as f32;
                        (0.3 / h) * (2.0 * std::f32::consts::PI * self.f0 * h * t).sin()
                    })
                    .sum();
                swell * voice
            })
            .collect()
    }
}

impl BaseSynthesizer for ToneSynthesizer {
    fn name(&self) -> &str {
        "tone"
    }

    fn synthesize(&self, text: &str) -> Result<TempArtifact> {
        let artifact = TempArtifact::unique_in(&self.temp_dir, "base", "wav");
        AudioOutput::save_float(&self.render(text), self.sample_rate, artifact.path()).map_err(
            |e| CloneError::Synthesis {
                message: format!("{:#}", e),
                synthesizer: self.name().to_string(),
            },
        )?;
        Ok(artifact)
    }
}

fn check_non_empty(path: &Path) -> std::result::Result<(), String> {
    let len = std::fs::metadata(path)
        .map_err(|e| format!("no output file at {:?}: {}", path, e))?
        .len();
    if len < MIN_WAV_BYTES {
        return Err(format!("output file {:?} holds no audio ({} bytes)", path, len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioLoader;

    #[test]
    fn test_tone_duration_scales_with_text() {
        let synth = ToneSynthesizer::default();
        assert_eq!(synth.duration_for("hi"), 0.5);
        assert!((synth.duration_for(&"a".repeat(50)) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_tone_synthesizer_writes_wav() {
        let synth = ToneSynthesizer::default();
        let artifact = synth.synthesize("hello there, this is a test").unwrap();
        let wave = AudioLoader::load(artifact.path(), 22050).unwrap();
        assert_eq!(wave.len(), synth.render("hello there, this is a test").len());
        assert!(wave.peak() > 0.1 && wave.peak() <= 1.0);

        let path = artifact.path().to_path_buf();
        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_tone_is_deterministic() {
        let synth = ToneSynthesizer::default();
        assert_eq!(synth.render("same text"), synth.render("same text"));
    }

    #[test]
    fn test_missing_program_is_synthesis_error() {
        let synth = CommandSynthesizer::new("definitely-not-a-tts-program-xyz");
        match synth.synthesize("hello") {
            Err(CloneError::Synthesis { synthesizer, .. }) => {
                assert_eq!(synthesizer, "definitely-not-a-tts-program-xyz")
            }
            other => panic!("unexpected {:?}", other.map(|a| a.path().to_path_buf())),
        }
    }

    #[test]
    fn test_volume_maps_to_amplitude() {
        let synth = CommandSynthesizer::default().with_volume(0.5);
        assert_eq!(synth.amplitude, 100);
        assert_eq!(CommandSynthesizer::default().amplitude, 180);
    }
}
