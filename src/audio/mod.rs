//! Audio processing modules
//!
//! - Audio file loading and decoding (WAV, MP3, FLAC, OGG, M4A)
//! - Sample rate conversion and length-exact resampling
//! - STFT/ISTFT, mel filterbank and MFCCs
//! - Zero-phase Butterworth low-pass
//! - YIN pitch tracking and phase-vocoder pitch shifting
//! - WAV output and scoped temporary files

mod filter;
mod loader;
mod mel;
mod output;
mod pitch;
mod pitch_shift;
mod resampler;
mod stft;
mod temp;
mod waveform;

pub use filter::ButterworthLowPass;
pub use loader::AudioLoader;
pub use mel::{hz_to_mel, mel_to_hz, MelFilterbank, Mfcc, N_MFCC};
pub use output::AudioOutput;
pub use pitch::{PitchTrack, PitchTracker};
pub use pitch_shift::PitchShifter;
pub use resampler::Resampler;
pub use stft::{bin_frequencies, hann_window, reflect_pad, Spectrogram, Stft};
pub use temp::TempArtifact;
pub use waveform::{energy, peak, Waveform};
