//! Audio hardware behind two small capabilities.
//!
//! [`AudioRecorder`] saves what the microphone hears between a start and a
//! stop; [`AudioPlayback`] loads and plays clips. The live implementations are
//! [`Microphone`] (CPAL capture, resampled to 16 kHz mono, with a continuous
//! voice activity monitor) and [`SpeakerPlayback`] (rodio).

use anyhow::Result;
use std::path::Path;

/// Rate every recording is written at and every VAD frame is classified at.
pub const TARGET_RATE: u32 = 16_000;

mod dispatch;
mod microphone;
mod monitor;
mod playback;
mod resample;
mod vad;
mod wav;

pub use microphone::Microphone;
pub use playback::{Clip, SpeakerPlayback};
pub use vad::{SimpleThresholdVad, VadDecision, VadEngine};
pub use wav::{read_wav, write_wav};

pub trait AudioRecorder {
    fn start_recording(&mut self) -> Result<()>;

    /// Close the open recording and write it to `path`. Returning `Ok` means
    /// the file is on disk.
    fn stop_recording(&mut self, path: &Path) -> Result<()>;
}

pub trait AudioPlayback {
    fn load_clip(&mut self, path: &Path) -> Result<Clip>;

    /// Start playing `clip` and return without waiting for it to finish.
    fn play(&mut self, clip: &Clip) -> Result<()>;
}
