//! Audio resampling using rubato
//!
//! Sinc interpolation for both sample-rate conversion (loading references
//! recorded at 44.1/48 kHz) and arbitrary-ratio length changes (the second
//! half of the duration-preserving pitch shift).

use anyhow::{Context, Result};
use rubato::{
    calculate_cutoff, Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

/// Default chunk size for processing
const CHUNK_SIZE: usize = 1024;

/// Sinc length of the single-pass path
const SIMPLE_SINC_LEN: usize = 256;

/// Sinc length of the chunked path
const CHUNKED_SINC_LEN: usize = 128;

/// Zeros appended before a length-exact resample so the filter tail is flushed
const FLUSH_LEN: usize = SIMPLE_SINC_LEN;

/// Audio resampler using sinc interpolation
pub struct Resampler;

impl Resampler {
    /// Resample audio from one sample rate to another
    ///
    /// # Arguments
    /// * `samples` - Input audio samples (mono, f32)
    /// * `from_sr` - Source sample rate
    /// * `to_sr` - Target sample rate
    pub fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>> {
        if from_sr == to_sr {
            return Ok(samples.to_vec());
        }
        if from_sr == 0 || to_sr == 0 {
            anyhow::bail!("Invalid sample rates: {} -> {}", from_sr, to_sr);
        }

        Self::resample_by_ratio(samples, to_sr as f64 / from_sr as f64)
    }

    /// Resample by an arbitrary output/input ratio
    pub fn resample_by_ratio(samples: &[f32], ratio: f64) -> Result<Vec<f32>> {
        if !(ratio.is_finite() && ratio > 0.0) {
            anyhow::bail!("Invalid resample ratio: {}", ratio);
        }
        if samples.is_empty() {
            return Ok(vec![]);
        }
        if (ratio - 1.0).abs() < f64::EPSILON {
            return Ok(samples.to_vec());
        }

        if Self::uses_simple_path(samples.len()) {
            Self::resample_simple(samples, ratio)
        } else {
            Self::resample_chunked(samples, ratio)
        }
    }

    /// Resample to exactly `out_len` samples, compensating the filter delay
    ///
    /// The output is time-aligned with the input: sample `i` of the output
    /// corresponds to time `i / out_len` of the input.
    pub fn resample_to_length(samples: &[f32], out_len: usize) -> Result<Vec<f32>> {
        if samples.is_empty() || out_len == 0 {
            return Ok(vec![0.0; out_len]);
        }
        if samples.len() == out_len {
            return Ok(samples.to_vec());
        }

        let ratio = out_len as f64 / samples.len() as f64;
        let mut padded = Vec::with_capacity(samples.len() + FLUSH_LEN);
        padded.extend_from_slice(samples);
        padded.resize(samples.len() + FLUSH_LEN, 0.0);

        let sinc_len = if Self::uses_simple_path(padded.len()) {
            SIMPLE_SINC_LEN
        } else {
            CHUNKED_SINC_LEN
        };
        let delay = Self::delay_for_ratio(ratio, sinc_len);

        let resampled = Self::resample_by_ratio(&padded, ratio)?;
        let mut out: Vec<f32> = resampled.into_iter().skip(delay).take(out_len).collect();
        out.resize(out_len, 0.0);
        Ok(out)
    }

    fn uses_simple_path(len: usize) -> bool {
        len <= CHUNK_SIZE * 2
    }

    /// Simple single-pass resampling for short audio
    fn resample_simple(samples: &[f32], ratio: f64) -> Result<Vec<f32>> {
        let window = WindowFunction::BlackmanHarris2;
        let params = SincInterpolationParameters {
            sinc_len: SIMPLE_SINC_LEN,
            f_cutoff: calculate_cutoff(SIMPLE_SINC_LEN, window),
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window,
        };

        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
            .context("Failed to create resampler")?;

        let input = vec![samples.to_vec()];
        let output = resampler
            .process(&input, None)
            .context("Resampling failed")?;

        Ok(output.into_iter().next().unwrap_or_default())
    }

    /// Chunked resampling for longer audio
    fn resample_chunked(samples: &[f32], ratio: f64) -> Result<Vec<f32>> {
        let window = WindowFunction::Blackman2;
        let params = SincInterpolationParameters {
            sinc_len: CHUNKED_SINC_LEN,
            f_cutoff: calculate_cutoff(CHUNKED_SINC_LEN, window),
            interpolation: SincInterpolationType::Quadratic,
            oversampling_factor: 256,
            window,
        };

        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.1, params, CHUNK_SIZE, 1)
            .context("Failed to create chunked resampler")?;

        let estimated_output_len = (samples.len() as f64 * ratio * 1.1) as usize + CHUNK_SIZE;
        let mut output_samples = Vec::with_capacity(estimated_output_len);

        let mut pos = 0;
        while pos + CHUNK_SIZE <= samples.len() {
            let input = [&samples[pos..pos + CHUNK_SIZE]];
            let output = resampler
                .process(&input, None)
                .context("Chunked resampling failed")?;
            if let Some(out_chunk) = output.into_iter().next() {
                output_samples.extend(out_chunk);
            }
            pos += CHUNK_SIZE;
        }

        if pos < samples.len() {
            let input = [&samples[pos..]];
            let output = resampler
                .process_partial(Some(&input), None)
                .context("Final partial chunk failed")?;
            if let Some(out_chunk) = output.into_iter().next() {
                output_samples.extend(out_chunk);
            }
        }

        Ok(output_samples)
    }

    /// Delay introduced by the sinc filter, in output samples
    fn delay_for_ratio(ratio: f64, sinc_len: usize) -> usize {
        ((sinc_len as f64 / 2.0) * ratio) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_no_change() {
        let samples: Vec<f32> = (0..100).map(|i| (i as f32 * 0.01).sin()).collect();
        let result = Resampler::resample(&samples, 44100, 44100).unwrap();
        assert_eq!(result, samples);
    }

    #[test]
    fn test_empty_input() {
        let result = Resampler::resample(&[], 44100, 22050).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_downsample() {
        let samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();

        let result = Resampler::resample(&samples, 44100, 22050).unwrap();

        assert!(result.len() > samples.len() / 3);
        assert!(result.len() < samples.len());
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        assert!(Resampler::resample_by_ratio(&[0.1, 0.2], 0.0).is_err());
        assert!(Resampler::resample_by_ratio(&[0.1, 0.2], f64::NAN).is_err());
        assert!(Resampler::resample(&[0.1], 0, 22050).is_err());
    }

    #[test]
    fn test_resample_to_length_exact() {
        let samples: Vec<f32> = (0..6000)
            .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 22050.0).sin() * 0.5)
            .collect();

        for out_len in [3000usize, 4500, 9000, 12000] {
            let out = Resampler::resample_to_length(&samples, out_len).unwrap();
            assert_eq!(out.len(), out_len);
            // Energy survives (no large leading gap from the filter delay)
            let rms = (out.iter().map(|x| x * x).sum::<f32>() / out.len() as f32).sqrt();
            assert!(rms > 0.25, "rms {} for out_len {}", rms, out_len);
        }
    }
}
