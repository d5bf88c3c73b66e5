//! Benchmarks for the voice cloning cascade
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use sdkwork_voice_clone::audio::{Resampler, Stft, Waveform};
use sdkwork_voice_clone::config::{AnalysisConfig, EnhancerConfig, TransformConfig};
use sdkwork_voice_clone::{
    FeatureExtractor, QualityEnhancer, SpectralFeatureExtractor, ToneSynthesizer,
    TransformPipeline,
};

const SR: u32 = 22050;

fn voice(f0: f32, seconds: f32) -> Vec<f32> {
    let text = "x".repeat((seconds / 0.06) as usize);
    ToneSynthesizer::new(f0, SR).render(&text)
}

/// Benchmark STFT analysis and resynthesis
fn bench_stft(c: &mut Criterion) {
    let stft = Stft::new(2048, 512);
    let mut group = c.benchmark_group("stft");
    group.measurement_time(Duration::from_secs(10));

    for duration in [1.0f32, 3.0, 10.0] {
        let samples = voice(120.0, duration);
        group.bench_with_input(
            BenchmarkId::new("roundtrip", format!("{:.1}s", duration)),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let spec = stft.forward(black_box(samples)).unwrap();
                    stft.inverse(&spec, samples.len())
                })
            },
        );
    }
    group.finish();
}

/// Benchmark feature extraction
fn bench_extraction(c: &mut Criterion) {
    let extractor = SpectralFeatureExtractor::new(&AnalysisConfig::default(), SR).unwrap();
    let mut group = c.benchmark_group("extraction");
    group.measurement_time(Duration::from_secs(10));

    for duration in [1.0f32, 5.0] {
        let wave = Waveform::new(voice(150.0, duration), SR);
        group.bench_with_input(
            BenchmarkId::new("extract", format!("{:.1}s", duration)),
            &wave,
            |b, wave| b.iter(|| extractor.extract(black_box(wave)).unwrap()),
        );
    }
    group.finish();
}

/// Benchmark resampling to the canonical rate
fn bench_resampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampler");
    let samples: Vec<f32> = voice(150.0, 2.0);

    for (from_sr, to_sr) in [(44100u32, SR), (16000, SR), (48000, SR)] {
        group.bench_with_input(
            BenchmarkId::new("resample", format!("{}→{}", from_sr, to_sr)),
            &samples,
            |b, samples| b.iter(|| Resampler::resample(black_box(samples), from_sr, to_sr).unwrap()),
        );
    }
    group.finish();
}

/// Benchmark the full five-stage cascade plus enhancement
fn bench_cascade(c: &mut Criterion) {
    let extractor = SpectralFeatureExtractor::new(&AnalysisConfig::default(), SR).unwrap();
    let target = extractor
        .extract(&Waveform::new(voice(150.0, 2.0), SR))
        .unwrap();
    let pipeline =
        TransformPipeline::standard(&TransformConfig::default(), &AnalysisConfig::default(), SR)
            .unwrap();
    let enhancer = QualityEnhancer::new(&EnhancerConfig::default(), SR);
    let base = voice(120.0, 3.0);

    c.bench_function("cascade_3s", |b| {
        b.iter(|| {
            let (out, _) = pipeline.run(black_box(&base), SR, &target);
            enhancer.enhance(&out)
        })
    });
}

criterion_group!(benches, bench_stft, bench_extraction, bench_resampler);

criterion_group!(
    name = slow_benches;
    config = Criterion::default().sample_size(10);
    targets = bench_cascade
);

criterion_main!(benches, slow_benches);
