//! Clip playback through rodio.

use super::wav::read_wav;
use super::AudioPlayback;
use anyhow::{anyhow, Result};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Ramp applied to both ends of a generated tone, to avoid clicks.
const TONE_RAMP: Duration = Duration::from_millis(10);

/// Decoded mono audio ready to play.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl Clip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Sine tone of exactly `length`, used for the low beep.
    pub fn tone(frequency_hz: f32, length: Duration, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let total = (length.as_secs_f64() * sample_rate as f64).round() as usize;
        let ramp = ((TONE_RAMP.as_secs_f64() * sample_rate as f64) as usize)
            .min(total / 2)
            .max(1);
        let samples = (0..total)
            .map(|n| {
                let t = n as f32 / sample_rate as f32;
                let edge = n.min(total - 1 - n);
                let gain = (edge as f32 / ramp as f32).min(1.0);
                0.5 * gain * (2.0 * PI * frequency_hz * t).sin()
            })
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn length(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Default output device. Each `play` replaces whatever was still playing.
pub struct SpeakerPlayback {
    stream: OutputStream,
    sink: Option<Sink>,
}

impl SpeakerPlayback {
    pub fn open() -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|err| anyhow!("failed to open audio output: {err}"))?;
        stream.log_on_drop(false);
        Ok(Self { stream, sink: None })
    }
}

impl AudioPlayback for SpeakerPlayback {
    fn load_clip(&mut self, path: &Path) -> Result<Clip> {
        let (samples, sample_rate) = read_wav(path)?;
        Ok(Clip::new(samples, sample_rate))
    }

    fn play(&mut self, clip: &Clip) -> Result<()> {
        if let Some(previous) = self.sink.take() {
            previous.stop();
        }
        let sink = Sink::connect_new(self.stream.mixer());
        sink.append(SamplesBuffer::new(
            1,
            clip.sample_rate(),
            clip.samples().to_vec(),
        ));
        self.sink = Some(sink);
        Ok(())
    }
}
