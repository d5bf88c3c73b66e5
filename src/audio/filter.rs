//! Butterworth low-pass filtering
//!
//! An order-N filter is a cascade of N/2 biquads (bilinear transform with
//! frequency prewarping). `filtfilt` runs it forward then backward for zero
//! phase, padding both ends with an odd extension and starting each pass from
//! the steady state of its first sample to suppress edge transients.

use anyhow::Result;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn low_pass(cutoff_hz: f64, sample_rate: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Run over `data` in place (transposed direct form II), starting at rest on `initial`
    fn run(&self, data: &mut [f64], initial: f64) {
        // Unity DC gain: steady state for a constant input `c` outputs `c`
        let mut z1 = initial * (1.0 - self.b0);
        let mut z2 = initial * (self.b2 - self.a2);
        for x in data.iter_mut() {
            let input = *x;
            let y = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * y + z2;
            z2 = self.b2 * input - self.a2 * y;
            *x = y;
        }
    }
}

/// Cascaded-biquad Butterworth low-pass
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    sections: Vec<Biquad>,
    order: usize,
}

impl ButterworthLowPass {
    /// Design a low-pass of even `order` at `cutoff_hz`
    pub fn new(order: usize, cutoff_hz: f32, sample_rate: u32) -> Result<Self> {
        let nyquist = sample_rate as f32 / 2.0;
        if order == 0 || order % 2 != 0 {
            anyhow::bail!("Butterworth order must be even and positive, got {}", order);
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            anyhow::bail!("Cutoff {} Hz outside (0, {}) Hz", cutoff_hz, nyquist);
        }

        let sections = (1..=order / 2)
            .map(|k| {
                let theta = (2 * k - 1) as f64 * PI / (2 * order) as f64;
                let q = 1.0 / (2.0 * theta.cos());
                Biquad::low_pass(cutoff_hz as f64, sample_rate as f64, q)
            })
            .collect();

        Ok(Self { sections, order })
    }

    /// Edge extension length used by `filtfilt` for a signal of `len` samples
    pub fn pad_len(&self, len: usize) -> usize {
        (3 * (self.order + 1)).min(len.saturating_sub(1))
    }

    /// Zero-phase filtering; output has the input's length
    pub fn filtfilt(&self, samples: &[f32]) -> Vec<f32> {
        if samples.is_empty() {
            return Vec::new();
        }
        let n = samples.len();
        let pad = self.pad_len(n);
        let first = samples[0] as f64;
        let last = samples[n - 1] as f64;

        let mut ext: Vec<f64> = Vec::with_capacity(n + 2 * pad);
        ext.extend((0..pad).map(|i| 2.0 * first - samples[pad - i] as f64));
        ext.extend(samples.iter().map(|&s| s as f64));
        ext.extend((0..pad).map(|i| 2.0 * last - samples[n - 2 - i] as f64));

        self.run_cascade(&mut ext);
        ext.reverse();
        self.run_cascade(&mut ext);
        ext.reverse();

        ext[pad..pad + n].iter().map(|&v| v as f32).collect()
    }

    fn run_cascade(&self, data: &mut [f64]) {
        for section in &self.sections {
            let initial = data.first().copied().unwrap_or(0.0);
            section.run(data, initial);
        }
    }
}
