//! Voice-activity capability consumed by the recall windows.
//!
//! The sequencer only ever asks "is someone speaking right now?". Sampling
//! must be cheap and side-effect free since trial recall polls it every tick.

use crate::clock::{Clock, VirtualClock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub trait VoiceActivity {
    fn is_speaking(&self) -> bool;
}

/// Shared speech flag written by the microphone monitor thread.
#[derive(Clone, Debug, Default)]
pub struct SpeechFlag {
    speaking: Arc<AtomicBool>,
}

impl SpeechFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, speaking: bool) {
        self.speaking.store(speaking, Ordering::Relaxed);
    }
}

impl VoiceActivity for SpeechFlag {
    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }
}

/// Voice activity read off a [`VirtualClock`]: speaking inside any of the
/// half-open `[from, to)` spans, silent elsewhere.
#[derive(Clone, Debug)]
pub struct ScriptedVoice {
    clock: VirtualClock,
    spans: Vec<(Duration, Duration)>,
}

impl ScriptedVoice {
    pub fn silent(clock: VirtualClock) -> Self {
        Self {
            clock,
            spans: Vec::new(),
        }
    }

    /// Add a speaking span in absolute clock time.
    pub fn speaking(mut self, from: Duration, to: Duration) -> Self {
        self.spans.push((from, to));
        self
    }

    /// Add a speaking span in seconds of absolute clock time.
    pub fn speaking_secs(self, from: f64, to: f64) -> Self {
        self.speaking(Duration::from_secs_f64(from), Duration::from_secs_f64(to))
    }
}

impl VoiceActivity for ScriptedVoice {
    fn is_speaking(&self) -> bool {
        let now = self.clock.now();
        self.spans.iter().any(|(from, to)| (*from..*to).contains(&now))
    }
}
