//! Voice cloning orchestrator
//!
//! [`VoiceCloningEngine`] ties the pieces together:
//!
//! 1. analyze the reference recording (cached per reference),
//! 2. have the base synthesizer speak the text,
//! 3. run the transformation cascade towards the reference features,
//! 4. enhance, optionally watermark, and persist the result.
//!
//! The engine holds at most one analyzed reference. A request naming a
//! different reference replaces it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::synthesizer::BaseSynthesizer;
use super::watermark::Watermark;
use crate::analysis::{
    check_reference_quality, similarity_from_features, FeatureExtractor, FeatureVector,
    ReferenceQualityReport, SpectralFeatureExtractor,
};
use crate::audio::{AudioLoader, AudioOutput, Waveform};
use crate::config::EngineConfig;
use crate::core::error::{AudioOperation, CloneError, Result, StageKind};
use crate::transform::{PipelineReport, QualityEnhancer, StageStatus, TransformPipeline};

/// Peak level in-memory recordings are normalized to on import
const IMPORT_PEAK_LEVEL: f32 = 0.8;

/// Lifecycle of the engine across requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    ReferenceLoading,
    ReferenceLoaded,
    Synthesizing,
    Transforming,
    Done,
    Error,
}

/// The analyzed reference currently held by the engine
#[derive(Debug, Clone)]
pub struct ReferenceSession {
    pub id: String,
    pub features: FeatureVector,
    pub quality: Option<ReferenceQualityReport>,
}

/// Counters over the engine's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Reference requests answered from the session
    pub reference_hits: u64,
    /// Reference requests that ran extraction
    pub reference_misses: u64,
    pub clones_completed: u64,
    pub clones_failed: u64,
}

impl EngineStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.reference_hits + self.reference_misses;
        if total == 0 {
            0.0
        } else {
            self.reference_hits as f64 / total as f64
        }
    }
}

/// A finished clone
#[derive(Debug, Clone, Serialize)]
pub struct CloneOutput {
    pub path: PathBuf,
    /// Seconds
    pub duration: f32,
    pub sample_rate: u32,
    pub report: PipelineReport,
    pub watermark_tag: Option<String>,
}

pub struct VoiceCloningEngine {
    config: EngineConfig,
    extractor: Box<dyn FeatureExtractor>,
    synthesizer: Box<dyn BaseSynthesizer>,
    pipeline: TransformPipeline,
    enhancer: QualityEnhancer,
    watermark: Option<Watermark>,
    session: Option<ReferenceSession>,
    state: EngineState,
    stats: EngineStats,
}

impl VoiceCloningEngine {
    /// Validate `config` and build every component
    pub fn new(config: EngineConfig, synthesizer: Box<dyn BaseSynthesizer>) -> Result<Self> {
        config.validate()?;
        let sr = config.audio.sample_rate;

        let extractor = SpectralFeatureExtractor::new(&config.analysis, sr)?;
        let pipeline = TransformPipeline::standard(&config.transform, &config.analysis, sr)?;
        let enhancer = QualityEnhancer::new(&config.enhancer, sr);
        let watermark = Watermark::from_config(&config.watermark, sr)?;

        info!(
            sample_rate = sr,
            synthesizer = synthesizer.name(),
            watermark = watermark.is_some(),
            "Voice cloning engine ready"
        );

        Ok(Self {
            config,
            extractor: Box::new(extractor),
            synthesizer,
            pipeline,
            enhancer,
            watermark,
            session: None,
            state: EngineState::Idle,
            stats: EngineStats::default(),
        })
    }

    /// Replace the feature extractor
    pub fn with_extractor(mut self, extractor: Box<dyn FeatureExtractor>) -> Self {
        self.extractor = extractor;
        self.session = None;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn session(&self) -> Option<&ReferenceSession> {
        self.session.as_ref()
    }

    pub fn reference_features(&self) -> Option<&FeatureVector> {
        self.session.as_ref().map(|s| &s.features)
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.audio.sample_rate
    }

    /// Analyze the reference at `path` unless it is already the session
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn load_reference(&mut self, path: &Path) -> Result<FeatureVector> {
        let id = path.to_string_lossy().into_owned();
        if let Some(features) = self.session_hit(&id) {
            return Ok(features);
        }

        if !path.is_file() {
            self.state = EngineState::Error;
            return Err(CloneError::invalid_input(
                format!("reference audio not found: {}", path.display()),
                "reference_path",
            ));
        }

        self.state = EngineState::ReferenceLoading;
        let wave = match AudioLoader::load(path, self.sample_rate()) {
            Ok(wave) => wave,
            Err(e) => return Err(self.reference_failed(path, format!("{:#}", e))),
        };
        self.analyze_reference(id, &wave, path)
    }

    /// Analyze an in-memory recording under the caller-chosen `id`
    ///
    /// The recording is converted to the canonical rate and peak normalized.
    pub fn load_reference_waveform(&mut self, id: &str, wave: &Waveform) -> Result<FeatureVector> {
        if let Some(features) = self.session_hit(id) {
            return Ok(features);
        }

        self.state = EngineState::ReferenceLoading;
        let converted =
            match AudioLoader::from_samples(wave.samples.clone(), wave.sample_rate, self.sample_rate())
            {
                Ok(converted) => converted.peak_normalized(IMPORT_PEAK_LEVEL),
                Err(e) => return Err(self.reference_failed(Path::new(id), format!("{:#}", e))),
            };
        self.analyze_reference(id.to_string(), &converted, Path::new(id))
    }

    fn session_hit(&mut self, id: &str) -> Option<FeatureVector> {
        let session = self.session.as_ref().filter(|s| s.id == id)?;
        self.stats.reference_hits += 1;
        self.state = EngineState::ReferenceLoaded;
        debug!(reference = id, "Reference features reused");
        Some(session.features.clone())
    }

    fn analyze_reference(
        &mut self,
        id: String,
        wave: &Waveform,
        path: &Path,
    ) -> Result<FeatureVector> {
        self.stats.reference_misses += 1;

        let quality = check_reference_quality(
            wave,
            &self.config.quality,
            self.config.analysis.n_fft,
            self.config.analysis.hop_length,
        );
        for issue in &quality.issues {
            warn!(reference = %id, "Reference quality: {}", issue);
        }

        let features = match self.extractor.extract(wave) {
            Ok(features) => features,
            Err(e) => return Err(self.reference_failed(path, e.to_string())),
        };

        info!(
            reference = %id,
            f0_mean = ?features.f0_mean,
            centroid = features.spectral_centroid_mean,
            quality_score = quality.score,
            "Reference analyzed"
        );
        self.session = Some(ReferenceSession {
            id,
            features: features.clone(),
            quality: Some(quality),
        });
        self.state = EngineState::ReferenceLoaded;
        Ok(features)
    }

    fn reference_failed(&mut self, path: &Path, message: String) -> CloneError {
        warn!(path = %path.display(), %message, "Reference analysis failed");
        self.session = None;
        self.state = EngineState::Error;
        CloneError::ReferenceAnalysis {
            message,
            path: path.to_path_buf(),
        }
    }

    /// Speak `text` in the voice of the recording at `reference`
    #[instrument(skip(self, text), fields(chars = text.chars().count(), reference = %reference.display()))]
    pub fn clone_voice(&mut self, text: &str, reference: &Path) -> Result<CloneOutput> {
        let result = self.run_clone(text, reference);
        match &result {
            Ok(output) => {
                self.stats.clones_completed += 1;
                self.state = EngineState::Done;
                info!(path = %output.path.display(), duration = output.duration, "Voice cloned");
            }
            Err(e) => {
                self.stats.clones_failed += 1;
                self.state = EngineState::Error;
                warn!(category = %e.category(), "Clone failed: {}", e);
            }
        }
        result
    }

    fn run_clone(&mut self, text: &str, reference: &Path) -> Result<CloneOutput> {
        if text.trim().is_empty() {
            return Err(CloneError::invalid_input("text is empty", "text"));
        }

        let target = self.load_reference(reference)?;
        let sr = self.sample_rate();

        self.state = EngineState::Synthesizing;
        // Removed when this function returns, whichever way
        let base_file = self.synthesizer.synthesize(text)?;
        let base = AudioLoader::load(base_file.path(), sr).map_err(|e| CloneError::Synthesis {
            message: format!("unreadable base speech: {:#}", e),
            synthesizer: self.synthesizer.name().to_string(),
        })?;
        if base.is_empty() {
            return Err(CloneError::Synthesis {
                message: "base speech holds no audio".into(),
                synthesizer: self.synthesizer.name().to_string(),
            });
        }
        debug!(samples = base.len(), "Base speech loaded");

        self.state = EngineState::Transforming;
        let (transformed, mut report) = self.pipeline.run(&base.samples, sr, &target);

        let started = Instant::now();
        let enhanced = match self.enhancer.try_enhance(&transformed) {
            Ok(enhanced) => {
                report.record(StageKind::Enhancement, StageStatus::Applied, started);
                enhanced
            }
            Err(e) => {
                warn!("{}", e);
                report.record(
                    StageKind::Enhancement,
                    StageStatus::Failed {
                        message: e.to_string(),
                    },
                    started,
                );
                transformed
            }
        };

        let (samples, watermark_tag) = match &self.watermark {
            Some(mark) => {
                let (marked, tag) = mark.apply(&enhanced, sr);
                (marked, Some(tag))
            }
            None => (enhanced, None),
        };

        let dir = self.config.output_dir();
        std::fs::create_dir_all(&dir).map_err(|e| CloneError::Io {
            message: e.to_string(),
            path: Some(dir.clone()),
        })?;
        let path = dir.join(format!("cloned_{}.wav", uuid::Uuid::new_v4()));
        AudioOutput::save_atomic(&samples, sr, &path).map_err(|e| CloneError::Audio {
            message: format!("{:#}", e),
            operation: AudioOperation::Saving,
        })?;

        Ok(CloneOutput {
            duration: samples.len() as f32 / sr as f32,
            path,
            sample_rate: sr,
            report,
            watermark_tag,
        })
    }

    /// Similarity in [0, 1] of the voices in two recordings, 0.0 if either
    /// cannot be analyzed
    pub fn similarity(&self, a: &Path, b: &Path) -> f32 {
        match (self.extractor.extract_file(a), self.extractor.extract_file(b)) {
            (Ok(fa), Ok(fb)) => similarity_from_features(&fa, &fb),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Similarity unavailable: {}", e);
                0.0
            }
        }
    }

    pub fn similarity_waveforms(&self, a: &Waveform, b: &Waveform) -> f32 {
        match (self.extractor.extract(a), self.extractor.extract(b)) {
            (Ok(fa), Ok(fb)) => similarity_from_features(&fa, &fb),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Similarity unavailable: {}", e);
                0.0
            }
        }
    }

    /// Extract features from a file with the engine's extractor
    pub fn analyze(&self, path: &Path) -> Result<FeatureVector> {
        self.extractor.extract_file(path)
    }
}

/// A [`VoiceCloningEngine`] shared between threads; requests are serialized
#[derive(Clone)]
pub struct SharedVoiceCloningEngine {
    inner: Arc<Mutex<VoiceCloningEngine>>,
}

impl SharedVoiceCloningEngine {
    pub fn new(engine: VoiceCloningEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, VoiceCloningEngine>> {
        self.inner.lock().map_err(|_| CloneError::Internal {
            message: "engine lock poisoned".into(),
            location: Some("SharedVoiceCloningEngine".into()),
        })
    }

    pub fn clone_voice(&self, text: &str, reference: &Path) -> Result<CloneOutput> {
        self.lock()?.clone_voice(text, reference)
    }

    pub fn load_reference(&self, path: &Path) -> Result<FeatureVector> {
        self.lock()?.load_reference(path)
    }

    pub fn similarity(&self, a: &Path, b: &Path) -> Result<f32> {
        Ok(self.lock()?.similarity(a, b))
    }

    pub fn state(&self) -> Result<EngineState> {
        Ok(self.lock()?.state())
    }

    pub fn stats(&self) -> Result<EngineStats> {
        Ok(self.lock()?.stats().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::ToneSynthesizer;

    fn engine(dir: &Path) -> VoiceCloningEngine {
        let config = EngineConfig {
            output_dir: Some(dir.to_path_buf()),
            ..EngineConfig::default()
        };
        VoiceCloningEngine::new(config, Box::new(ToneSynthesizer::default().with_temp_dir(dir)))
            .unwrap()
    }

    fn tone(f0: f32, seconds: f32) -> Waveform {
        let text = "x".repeat((seconds / 0.06) as usize);
        Waveform::new(ToneSynthesizer::new(f0, 22050).render(&text), 22050)
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clone_engine_{}_{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_new_engine_is_idle() {
        let dir = scratch("idle");
        let engine = engine(&dir);
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.reference_features().is_none());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.enhancer.filter_order = 3;
        assert!(matches!(
            VoiceCloningEngine::new(config, Box::new(ToneSynthesizer::default())),
            Err(CloneError::Config { .. })
        ));
    }

    #[test]
    fn test_missing_reference_is_invalid_input() {
        let dir = scratch("missing");
        let mut engine = engine(&dir);
        let err = engine.load_reference(&dir.join("nope.wav")).unwrap_err();
        assert!(matches!(err, CloneError::InvalidInput { .. }));
        assert_eq!(engine.state(), EngineState::Error);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_unreadable_reference_is_analysis_failure() {
        let dir = scratch("garbage");
        let path = dir.join("ref.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let mut engine = engine(&dir);
        let err = engine.load_reference(&path).unwrap_err();
        assert!(matches!(err, CloneError::ReferenceAnalysis { .. }));
        assert_eq!(engine.state(), EngineState::Error);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_waveform_reference_cached_by_id() {
        let dir = scratch("cache");
        let mut engine = engine(&dir);
        let wave = tone(150.0, 1.0);

        engine.load_reference_waveform("a", &wave).unwrap();
        engine.load_reference_waveform("a", &wave).unwrap();
        assert_eq!(engine.state(), EngineState::ReferenceLoaded);
        assert_eq!(engine.stats().reference_misses, 1);
        assert_eq!(engine.stats().reference_hits, 1);
        assert_eq!(engine.session().map(|s| s.id.as_str()), Some("a"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_clone_reports_every_stage() {
        let dir = scratch("clone");
        let reference = dir.join("ref.wav");
        AudioOutput::save(&tone(150.0, 1.0).samples, 22050, &reference).unwrap();

        let mut engine = engine(&dir);
        let output = engine.clone_voice("hello from the cloning engine", &reference).unwrap();

        assert_eq!(engine.state(), EngineState::Done);
        assert!(output.path.exists());
        assert_eq!(output.sample_rate, 22050);
        assert_eq!(output.report.stages.len(), 6);
        assert_eq!(
            output.report.status(StageKind::Enhancement),
            Some(&StageStatus::Applied)
        );
        assert!(output.watermark_tag.is_none());
        assert_eq!(engine.stats().clones_completed, 1);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_watermark_tag_returned_when_enabled() {
        let dir = scratch("watermark");
        let reference = dir.join("ref.wav");
        AudioOutput::save(&tone(150.0, 1.0).samples, 22050, &reference).unwrap();

        let mut config = EngineConfig {
            output_dir: Some(dir.clone()),
            ..EngineConfig::default()
        };
        config.watermark.enabled = true;
        config.watermark.frequency_hz = 10_000.0;
        config.watermark.owner = "tester".into();
        let mut engine =
            VoiceCloningEngine::new(config, Box::new(ToneSynthesizer::default().with_temp_dir(&dir)))
                .unwrap();

        let output = engine.clone_voice("watermarked", &reference).unwrap();
        let tag = output.watermark_tag.unwrap();
        assert!(tag.starts_with("CLONED_") && tag.ends_with("_tester"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_shared_engine_serializes_requests() {
        let dir = scratch("shared");
        let shared = SharedVoiceCloningEngine::new(engine(&dir));
        let other = shared.clone();

        let handle = std::thread::spawn(move || other.state().unwrap());
        assert_eq!(handle.join().unwrap(), EngineState::Idle);
        assert_eq!(shared.stats().unwrap(), EngineStats::default());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_hit_rate() {
        let stats = EngineStats {
            reference_hits: 3,
            reference_misses: 1,
            ..EngineStats::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < 1e-9);
        assert_eq!(EngineStats::default().hit_rate(), 0.0);
    }
}
