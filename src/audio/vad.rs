//! Frame-level speech/silence classification for the microphone monitor.

use std::cmp::Ordering as CmpOrdering;
use std::collections::VecDeque;

/// Classifies one 16 kHz mono frame.
///
/// Engines may expect a fixed frame length (Earshot wants 10, 20 or 30 ms);
/// the monitor pads or truncates each frame to `vad_frame_ms` before calling in.
pub trait VadEngine: Send {
    fn process_frame(&mut self, samples: &[f32]) -> VadDecision;
    fn reset(&mut self);
    fn name(&self) -> &'static str {
        "unknown_vad"
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VadDecision {
    Speech,
    Silence,
    Uncertain,
}

/// Majority vote over the last few decisions so a single noisy frame does not
/// flip the speaking flag. Ties and `Uncertain` frames keep the newest decision.
pub(super) struct VadSmoother {
    window: VecDeque<VadDecision>,
    window_size: usize,
}

impl VadSmoother {
    pub(super) fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::new(),
            window_size: window_size.max(1),
        }
    }

    pub(super) fn smooth(&mut self, decision: VadDecision) -> VadDecision {
        if self.window_size == 1 {
            return decision;
        }
        self.window.push_back(decision);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
        let (speech, silence) = self
            .window
            .iter()
            .fold((0usize, 0usize), |(speech, silence), item| match item {
                VadDecision::Speech => (speech + 1, silence),
                VadDecision::Silence => (speech, silence + 1),
                VadDecision::Uncertain => (speech, silence),
            });
        match speech.cmp(&silence) {
            CmpOrdering::Greater => VadDecision::Speech,
            CmpOrdering::Less => VadDecision::Silence,
            CmpOrdering::Equal => decision,
        }
    }

    pub(super) fn reset(&mut self) {
        self.window.clear();
    }
}

/// RMS energy gate. Used when Earshot is disabled or not compiled in.
#[derive(Debug, Clone)]
pub struct SimpleThresholdVad {
    threshold_db: f32,
}

impl SimpleThresholdVad {
    pub fn new(threshold_db: f32) -> Self {
        Self { threshold_db }
    }
}

/// RMS level of a frame in dBFS, floored at -120 dB.
pub(super) fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return -120.0;
    }
    let energy = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    20.0 * energy.sqrt().max(1e-6).log10()
}

impl VadEngine for SimpleThresholdVad {
    fn process_frame(&mut self, samples: &[f32]) -> VadDecision {
        if samples.is_empty() {
            return VadDecision::Uncertain;
        }
        if rms_db(samples) >= self.threshold_db {
            VadDecision::Speech
        } else {
            VadDecision::Silence
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "simple_threshold_vad"
    }
}
