//! SDKWork Voice Clone CLI - speak text in the voice of a reference recording
//!
//! Subcommands:
//! - `clone`: synthesize text and reshape it toward a reference speaker
//! - `analyze`: print the features and quality report of a recording
//! - `similarity`: score how alike two recordings sound
//! - `init-config`: write the default configuration as YAML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sdkwork_voice_clone::audio::{AudioLoader, AudioOutput};
use sdkwork_voice_clone::{
    check_reference_quality, BaseSynthesizer, CommandSynthesizer, EngineConfig, FeatureVector,
    StageStatus, ToneSynthesizer, VoiceCloningEngine, VoiceType, VERSION,
};

/// Base voice the cascade starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum SynthesizerType {
    /// External TTS program (espeak-ng compatible)
    #[default]
    Command,
    /// Built-in harmonic tone, no external program needed
    Tone,
}

#[derive(Parser, Debug)]
#[command(name = "sdkwork-voice-clone")]
#[command(author, version, about = "DSP voice cloning from a short reference recording")]
#[command(long_about = "
SDKWork Voice Clone speaks text in the voice of a reference recording.

A base synthesizer renders the text, then pitch, spectral envelope, formant,
texture and dynamics stages pull it toward the reference speaker.

Examples:
  # Clone with espeak-ng as the base voice
  sdkwork-voice-clone clone --reference voice.wav --text \"Hello world\" --output out.wav

  # Inspect a reference recording
  sdkwork-voice-clone analyze voice.wav --json

  # Compare two recordings
  sdkwork-voice-clone similarity voice.wav out.wav
")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration file (YAML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Speak text in the voice of a reference recording
    Clone {
        /// Text to speak
        #[arg(short, long)]
        text: String,

        /// Reference recording of the target speaker
        #[arg(short, long)]
        reference: PathBuf,

        /// Output WAV path (defaults to a generated name in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base synthesizer
        #[arg(long, value_enum, default_value = "command")]
        synthesizer: SynthesizerType,

        /// Program run by the command synthesizer
        #[arg(long, default_value = "espeak-ng")]
        program: String,

        /// Speaking rate of the command synthesizer (words per minute)
        #[arg(long, default_value = "150")]
        rate: u32,

        /// Volume of the command synthesizer (0.0 - 1.0)
        #[arg(long, default_value = "0.9")]
        volume: f32,

        /// Base pitch of the tone synthesizer in Hz
        #[arg(long, default_value = "120.0")]
        tone_f0: f32,
    },

    /// Print features, voice type and quality report of a recording
    Analyze {
        /// Recording to analyze
        input: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Score the voice similarity of two recordings (0.0 - 1.0)
    Similarity {
        first: PathBuf,
        second: PathBuf,
    },

    /// Write the default configuration
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "voice-clone.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading config from {:?}", path);
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Move `from` to `to`, copying when a rename crosses filesystems.
///
/// The copy goes to a `.partial` sibling first so `to` is either absent or
/// complete.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    let partial = AudioOutput::partial_path(to);
    let copied = std::fs::copy(from, &partial)
        .with_context(|| format!("Failed to write {:?}", partial))
        .and_then(|_| {
            std::fs::rename(&partial, to).with_context(|| format!("Failed to write {:?}", to))
        });
    if let Err(e) = copied {
        std::fs::remove_file(&partial).ok();
        return Err(e);
    }
    std::fs::remove_file(from).with_context(|| format!("Failed to remove {:?}", from))
}

#[allow(clippy::too_many_arguments)]
fn run_clone(
    config: EngineConfig,
    text: &str,
    reference: &Path,
    output: Option<&Path>,
    synthesizer: SynthesizerType,
    program: &str,
    rate: u32,
    volume: f32,
    tone_f0: f32,
) -> Result<()> {
    let base: Box<dyn BaseSynthesizer> = match synthesizer {
        SynthesizerType::Command => Box::new(
            CommandSynthesizer::new(program)
                .with_rate(rate)
                .with_volume(volume),
        ),
        SynthesizerType::Tone => Box::new(ToneSynthesizer::new(tone_f0, config.audio.sample_rate)),
    };
    let mut engine = VoiceCloningEngine::new(config, base)?;

    info!("Reference: {:?}", reference);
    info!("Text: {} ({} chars)", text.chars().take(50).collect::<String>(), text.chars().count());

    let start = Instant::now();
    let pb = create_spinner("Cloning voice...");
    let result = engine.clone_voice(text, reference);
    pb.finish_and_clear();
    let cloned = result?;

    for record in &cloned.report.stages {
        match &record.status {
            StageStatus::Applied => info!("  {:<18} applied ({:.1} ms)", record.stage.name(), record.elapsed_ms),
            StageStatus::Skipped { reason } => info!("  {:<18} skipped: {}", record.stage.name(), reason),
            StageStatus::Failed { message } => warn!("  {:<18} failed: {}", record.stage.name(), message),
        }
    }

    let path = match output {
        Some(output) => {
            move_file(&cloned.path, output)?;
            output.to_path_buf()
        }
        None => cloned.path.clone(),
    };

    let elapsed = start.elapsed().as_secs_f32();
    info!("Saved to {:?}", path);
    info!(
        "Duration: {:.2}s, processing: {:.2}s (RTF {:.3})",
        cloned.duration,
        elapsed,
        elapsed / cloned.duration.max(f32::EPSILON)
    );
    if let Some(tag) = &cloned.watermark_tag {
        info!("Watermark: {}", tag);
    }
    Ok(())
}

fn print_features(features: &FeatureVector) {
    let hz = |v: Option<f32>| v.map_or_else(|| "undefined".to_string(), |f| format!("{:.1} Hz", f));
    println!("  Pitch mean:         {}", hz(features.f0_mean));
    println!("  Pitch std:          {}", hz(features.f0_std));
    println!("  Voice type:         {}", VoiceType::from_pitch(features.f0_mean));
    println!("  Spectral centroid:  {:.1} Hz", features.spectral_centroid_mean);
    println!("  Spectral rolloff:   {:.1} Hz", features.spectral_rolloff_mean);
    println!("  Zero-crossing rate: {:.4}", features.zero_crossing_rate_mean);
    println!("  Energy:             {:.6}", features.energy);
    println!("  Duration:           {:.2}s", features.duration);
    let formants = if features.formants.is_fallback {
        "undefined (fallback)".to_string()
    } else {
        features
            .formants
            .frequencies
            .iter()
            .map(|f| format!("{:.0}", f))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("  Formants:           {}", formants);
}

fn run_analyze(config: EngineConfig, input: &Path, json: bool) -> Result<()> {
    let sr = config.audio.sample_rate;
    let wave = AudioLoader::load(input, sr)?;
    let engine = VoiceCloningEngine::new(config, Box::new(ToneSynthesizer::default()))?;
    let features = engine.analyze(input)?;
    let c = engine.config();
    let quality = check_reference_quality(&wave, &c.quality, c.analysis.n_fft, c.analysis.hop_length);

    if json {
        let report = serde_json::json!({
            "path": input,
            "voice_type": VoiceType::from_pitch(features.f0_mean).to_string(),
            "features": features,
            "quality": quality,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", input.display());
    print_features(&features);
    println!("\nReference quality: {}/100", quality.score);
    if quality.is_acceptable() {
        println!("  No issues found");
    }
    for issue in &quality.issues {
        println!("  - {}", issue);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    info!("SDKWork Voice Clone v{}", VERSION);

    match &cli.command {
        Commands::Clone {
            text,
            reference,
            output,
            synthesizer,
            program,
            rate,
            volume,
            tone_f0,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_clone(
                config,
                text,
                reference,
                output.as_deref(),
                *synthesizer,
                program,
                *rate,
                *volume,
                *tone_f0,
            )
        }

        Commands::Analyze { input, json } => {
            let config = load_config(cli.config.as_deref())?;
            run_analyze(config, input, *json)
        }

        Commands::Similarity { first, second } => {
            let config = load_config(cli.config.as_deref())?;
            let engine = VoiceCloningEngine::new(config, Box::new(ToneSynthesizer::default()))?;
            let score = engine.similarity(first, second);
            println!("{:.4}", score);
            Ok(())
        }

        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                anyhow::bail!("{:?} already exists (use --force to overwrite)", output);
            }
            EngineConfig::default().save(output)?;
            println!("Wrote default configuration to {:?}", output);
            Ok(())
        }
    }
}
