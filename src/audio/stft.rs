//! Short-time Fourier transform
//!
//! Centered frames (reflect padding of `n_fft / 2` on both sides), periodic
//! Hann window. The inverse is a weighted overlap-add normalized by the
//! squared-window sum, so `inverse(forward(x), x.len())` reproduces `x` up to
//! float error. Spectral stages edit magnitudes only and reuse the analysis
//! phase; this keeps them simple at the cost of some phasiness on large edits.

use anyhow::Result;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Squared-window sums below this are treated as uncovered samples
const WINDOW_SUM_FLOOR: f32 = 1e-8;

/// Complex spectrogram, `frames[t][k]` for frame `t` and bin `k` in `0..=n_fft/2`
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<Complex<f32>>>,
    pub n_fft: usize,
}

impl Spectrogram {
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Center frequency of every bin in Hz
    pub fn bin_frequencies(&self, sample_rate: u32) -> Vec<f32> {
        bin_frequencies(self.n_fft, sample_rate)
    }

    /// Magnitude per frame and bin
    pub fn magnitudes(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Scale every bin's magnitude by `gains[k]`, keeping the phase
    pub fn apply_gain(&mut self, gains: &[f32]) {
        for frame in &mut self.frames {
            for (bin, &g) in frame.iter_mut().zip(gains) {
                *bin *= g;
            }
        }
    }

    /// Magnitude-weighted mean frequency per frame; silent frames give 0
    pub fn spectral_centroid(&self, sample_rate: u32) -> Vec<f32> {
        let freqs = self.bin_frequencies(sample_rate);
        self.frames
            .iter()
            .map(|frame| {
                let mut weighted = 0.0f64;
                let mut total = 0.0f64;
                for (c, &f) in frame.iter().zip(&freqs) {
                    let m = c.norm() as f64;
                    weighted += m * f as f64;
                    total += m;
                }
                if total > 0.0 {
                    (weighted / total) as f32
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Lowest frequency below which `percent` of the frame's magnitude lies
    pub fn spectral_rolloff(&self, sample_rate: u32, percent: f32) -> Vec<f32> {
        let freqs = self.bin_frequencies(sample_rate);
        self.frames
            .iter()
            .map(|frame| {
                let total: f64 = frame.iter().map(|c| c.norm() as f64).sum();
                let threshold = percent as f64 * total;
                let mut cumulative = 0.0f64;
                for (c, &f) in frame.iter().zip(&freqs) {
                    cumulative += c.norm() as f64;
                    if cumulative >= threshold {
                        return f;
                    }
                }
                freqs.last().copied().unwrap_or(0.0)
            })
            .collect()
    }

    /// Mean of the per-frame spectral centroid
    pub fn mean_spectral_centroid(&self, sample_rate: u32) -> f32 {
        mean(&self.spectral_centroid(sample_rate))
    }
}

/// STFT analysis/synthesis with cached FFT plans
pub struct Stft {
    pub n_fft: usize,
    pub hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            fft: planner.plan_fft_forward(n_fft),
            ifft: planner.plan_fft_inverse(n_fft),
        }
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Forward transform of a mono signal
    pub fn forward(&self, samples: &[f32]) -> Result<Spectrogram> {
        if samples.is_empty() {
            anyhow::bail!("STFT of an empty signal");
        }
        if self.hop_length == 0 || self.n_fft == 0 {
            anyhow::bail!("Invalid STFT geometry: n_fft={} hop={}", self.n_fft, self.hop_length);
        }

        let pad = self.n_fft / 2;
        let padded = reflect_pad(samples, pad);
        let n_frames = self.num_frames(samples.len());
        let n_bins = self.n_fft / 2 + 1;

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut frames = Vec::with_capacity(n_frames);

        for t in 0..n_frames {
            let start = t * self.hop_length;
            for (j, slot) in buffer.iter_mut().enumerate() {
                let sample = padded.get(start + j).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[j], 0.0);
            }
            self.fft.process(&mut buffer);
            frames.push(buffer[..n_bins].to_vec());
        }

        Ok(Spectrogram {
            frames,
            n_fft: self.n_fft,
        })
    }

    /// Inverse transform; output is trimmed or zero-padded to `length`
    pub fn inverse(&self, spec: &Spectrogram, length: usize) -> Result<Vec<f32>> {
        if spec.n_fft != self.n_fft {
            anyhow::bail!(
                "Spectrogram n_fft {} does not match STFT n_fft {}",
                spec.n_fft,
                self.n_fft
            );
        }

        let n = self.n_fft;
        let n_bins = n / 2 + 1;
        let pad = n / 2;
        let total = n + self.hop_length * spec.n_frames().saturating_sub(1);

        let mut output = vec![0.0f32; total];
        let mut window_sum = vec![0.0f32; total];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        let scale = 1.0 / n as f32;

        for (t, frame) in spec.frames.iter().enumerate() {
            if frame.len() != n_bins {
                anyhow::bail!("Frame {} has {} bins, expected {}", t, frame.len(), n_bins);
            }
            // Rebuild the Hermitian-symmetric spectrum
            buffer[..n_bins].copy_from_slice(frame);
            for k in 1..(n - n_bins + 1) {
                buffer[n - k] = frame[k].conj();
            }
            self.ifft.process(&mut buffer);

            let start = t * self.hop_length;
            for j in 0..n {
                let w = self.window[j];
                output[start + j] += buffer[j].re * scale * w;
                window_sum[start + j] += w * w;
            }
        }

        for (y, &ws) in output.iter_mut().zip(&window_sum) {
            if ws > WINDOW_SUM_FLOOR {
                *y /= ws;
            }
        }

        let mut trimmed: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        trimmed.resize(length, 0.0);
        Ok(trimmed)
    }
}

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Bin center frequencies for an `n_fft`-point real FFT
pub fn bin_frequencies(n_fft: usize, sample_rate: u32) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

/// Pad by mirroring around the edge samples (edge not repeated)
pub fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let n = samples.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);
    if n == 1 {
        padded.resize(n + 2 * pad, samples[0]);
        return padded;
    }

    let period = 2 * (n - 1) as isize;
    let reflect = |i: isize| -> f32 {
        let mut m = i.rem_euclid(period);
        if m >= n as isize {
            m = period - m;
        }
        samples[m as usize]
    };

    for i in -(pad as isize)..(n + pad) as isize {
        padded.push(reflect(i));
    }
    padded
}

pub(crate) fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_reflect_pad() {
        let padded = reflect_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_reflect_pad_longer_than_signal() {
        let padded = reflect_pad(&[1.0, 2.0], 3);
        assert_eq!(padded.len(), 8);
        assert!(padded.iter().all(|&v| v == 1.0 || v == 2.0));
    }

    #[test]
    fn test_frame_count() {
        let stft = Stft::new(2048, 512);
        let spec = stft.forward(&vec![0.1; 22050]).unwrap();
        assert_eq!(spec.n_frames(), 1 + 22050 / 512);
        assert_eq!(spec.frames[0].len(), 1025);
    }

    #[test]
    fn test_roundtrip_reconstructs_signal() {
        let stft = Stft::new(2048, 512);
        let x = sine(220.0, 22050, 10_000);
        let spec = stft.forward(&x).unwrap();
        let y = stft.inverse(&spec, x.len()).unwrap();

        assert_eq!(y.len(), x.len());
        let max_err = x.iter().zip(&y).map(|(a, b)| (a - b).abs()).fold(0.0f32, f32::max);
        assert!(max_err < 1e-3, "max reconstruction error {}", max_err);
    }

    #[test]
    fn test_unit_gain_is_identity() {
        let stft = Stft::new(1024, 256);
        let x = sine(440.0, 22050, 4096);
        let mut spec = stft.forward(&x).unwrap();
        spec.apply_gain(&vec![1.0; spec.n_bins()]);
        let y = stft.inverse(&spec, x.len()).unwrap();
        assert!(x.iter().zip(&y).all(|(a, b)| (a - b).abs() < 1e-3));
    }

    #[test]
    fn test_centroid_of_sine() {
        let stft = Stft::new(2048, 512);
        let spec = stft.forward(&sine(1000.0, 22050, 22050)).unwrap();
        let centroid = spec.mean_spectral_centroid(22050);
        assert!((centroid - 1000.0).abs() < 100.0, "centroid {}", centroid);
    }

    #[test]
    fn test_silent_frames_have_zero_centroid_and_rolloff() {
        let stft = Stft::new(2048, 512);
        let spec = stft.forward(&vec![0.0; 4096]).unwrap();
        assert!(spec.spectral_centroid(22050).iter().all(|&c| c == 0.0));
        assert!(spec.spectral_rolloff(22050, 0.85).iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_empty_signal_rejected() {
        assert!(Stft::new(2048, 512).forward(&[]).is_err());
    }
}
