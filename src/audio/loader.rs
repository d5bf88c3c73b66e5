//! Audio file loading
//!
//! Every waveform entering the engine goes through here, so this is where
//! stereo is downmixed and the sample rate is brought to the canonical rate.
//!
//! - WAV via hound (PCM int and float)
//! - MP3, FLAC, OGG/Vorbis, M4A/AAC via symphonia

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{Resampler, Waveform};

/// Audio loader that supports various formats via hound and symphonia
pub struct AudioLoader;

impl AudioLoader {
    /// Load a mono waveform from a file at the specified sample rate
    ///
    /// # Arguments
    /// * `path` - Path to the audio file
    /// * `target_sr` - Target sample rate (will resample if necessary)
    pub fn load<P: AsRef<Path>>(path: P, target_sr: u32) -> Result<Waveform> {
        let path = path.as_ref();

        let decoded = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav")) {
            Self::load_wav(path)?
        } else {
            Self::load_with_symphonia(path)?
        };

        Self::conform(decoded, target_sr)
    }

    /// Bring in-memory samples to the target rate
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, target_sr: u32) -> Result<Waveform> {
        Self::conform(Waveform::new(samples, sample_rate), target_sr)
    }

    fn conform(wave: Waveform, target_sr: u32) -> Result<Waveform> {
        if wave.sample_rate == target_sr {
            return Ok(wave);
        }
        let resampled = Resampler::resample(&wave.samples, wave.sample_rate, target_sr)
            .with_context(|| format!("Failed to resample {} Hz -> {} Hz", wave.sample_rate, target_sr))?;
        Ok(Waveform::new(resampled, target_sr))
    }

    /// Load WAV files using hound
    fn load_wav(path: &Path) -> Result<Waveform> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {:?}", path))?;

        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("Corrupt float samples in {:?}", path))?,
            hound::SampleFormat::Int => {
                let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_value))
                    .collect::<std::result::Result<_, _>>()
                    .with_context(|| format!("Corrupt PCM samples in {:?}", path))?
            }
        };

        Ok(Waveform::from_interleaved(
            &samples,
            spec.channels as usize,
            spec.sample_rate,
        ))
    }

    /// Load audio using symphonia (MP3, FLAC, OGG, M4A, ...)
    fn load_with_symphonia(path: &Path) -> Result<Waveform> {
        let src = File::open(path).with_context(|| format!("Failed to open audio file: {:?}", path))?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("Unsupported audio format: {:?}", path))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow::anyhow!("No supported audio tracks found in {:?}", path))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| anyhow::anyhow!("Unknown sample rate in {:?}", path))?;
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .with_context(|| format!("Unsupported codec in {:?}", path))?;

        let mut interleaved: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let buf = sample_buf.get_or_insert_with(|| {
                        SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
                    });
                    buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buf.samples());
                }
                // Skip corrupted packets
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(anyhow::anyhow!("Decode error: {}", e)),
            }
        }

        Ok(Waveform::from_interleaved(&interleaved, channels, sample_rate))
    }

    /// Get audio file duration without decoding samples (WAV only)
    pub fn get_duration<P: AsRef<Path>>(path: P) -> Result<f64> {
        let path = path.as_ref();

        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav")) {
            let reader = hound::WavReader::open(path)?;
            let spec = reader.spec();
            let num_samples = reader.len() as f64;
            return Ok(num_samples / spec.channels as f64 / spec.sample_rate as f64);
        }

        Ok(Self::load_with_symphonia(path)?.duration() as f64)
    }
}
