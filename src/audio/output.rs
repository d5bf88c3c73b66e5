//! Audio output
//!
//! WAV writing for cloned results and synthesized base audio. Cloned output
//! is written to a `.partial` sibling first and renamed into place, so a
//! failure never leaves a truncated file under the final name.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Audio output handler for saving waveforms
pub struct AudioOutput;

impl AudioOutput {
    /// Save audio samples to a WAV file (16-bit PCM)
    ///
    /// # Arguments
    /// * `samples` - Audio samples (f32, normalized to [-1, 1])
    /// * `sample_rate` - Sample rate in Hz
    /// * `path` - Output file path
    pub fn save<P: AsRef<Path>>(samples: &[f32], sample_rate: u32, path: P) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path.as_ref(), spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path.as_ref()))?;

        for &sample in samples {
            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(scaled)?;
        }

        writer.finalize()?;
        Ok(())
    }

    /// Save audio samples to a WAV file (32-bit float)
    pub fn save_float<P: AsRef<Path>>(samples: &[f32], sample_rate: u32, path: P) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut writer = hound::WavWriter::create(path.as_ref(), spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path.as_ref()))?;

        for &sample in samples {
            writer.write_sample(sample)?;
        }

        writer.finalize()?;
        Ok(())
    }

    /// Save as 16-bit PCM through a partial file renamed on success
    pub fn save_atomic<P: AsRef<Path>>(samples: &[f32], sample_rate: u32, path: P) -> Result<()> {
        let path = path.as_ref();
        let partial = Self::partial_path(path);

        if let Err(e) = Self::save(samples, sample_rate, &partial) {
            std::fs::remove_file(&partial).ok();
            return Err(e);
        }

        std::fs::rename(&partial, path).map_err(|e| {
            std::fs::remove_file(&partial).ok();
            anyhow::anyhow!("Failed to move {:?} into place: {}", partial, e)
        })
    }

    /// `<name>.partial` sibling used while a file is being written
    pub fn partial_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".partial");
        path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_wav() {
        let path = std::env::temp_dir().join(format!("test_audio_output_{}.wav", uuid::Uuid::new_v4()));

        let samples: Vec<f32> = (0..22050)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22050.0).sin() * 0.5)
            .collect();

        AudioOutput::save(&samples, 22050, &path).unwrap();
        assert!(path.exists());

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 22050);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_atomic_leaves_no_partial() {
        let path = std::env::temp_dir().join(format!("test_atomic_{}.wav", uuid::Uuid::new_v4()));
        AudioOutput::save_atomic(&[0.1, 0.2, -0.3], 22050, &path).unwrap();

        assert!(path.exists());
        assert!(!AudioOutput::partial_path(&path).exists());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_atomic_failure_leaves_nothing() {
        let path = std::env::temp_dir()
            .join(format!("missing_dir_{}", uuid::Uuid::new_v4()))
            .join("out.wav");
        assert!(AudioOutput::save_atomic(&[0.1], 22050, &path).is_err());
        assert!(!path.exists());
        assert!(!AudioOutput::partial_path(&path).exists());
    }
}
