//! The microphone monitor thread: classifies every frame, keeps the shared
//! speaking flag current, and appends frames to the capture while a recording
//! is open.

use super::resample::convert_frame_to_target;
use super::vad::{VadDecision, VadEngine, VadSmoother};
use super::TARGET_RATE;
use crate::config::{VadEngineKind, VoicePipelineConfig};
use crate::lock_or_recover;
use crate::voice::SpeechFlag;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Samples gathered between `start_recording` and `stop_recording`.
#[derive(Debug, Default)]
pub(super) struct CaptureBuffer {
    recording: bool,
    samples: Vec<f32>,
}

impl CaptureBuffer {
    pub(super) fn is_recording(&self) -> bool {
        self.recording
    }

    pub(super) fn start(&mut self) {
        self.samples.clear();
        self.recording = true;
    }

    pub(super) fn push(&mut self, frame: &[f32]) {
        if self.recording {
            self.samples.extend_from_slice(frame);
        }
    }

    pub(super) fn finish(&mut self) -> Vec<f32> {
        self.recording = false;
        std::mem::take(&mut self.samples)
    }
}

pub(crate) fn create_vad_engine(cfg: &VoicePipelineConfig) -> Box<dyn VadEngine> {
    match cfg.vad_engine {
        VadEngineKind::Simple => Box::new(super::SimpleThresholdVad::new(cfg.vad_threshold_db)),
        VadEngineKind::Earshot => {
            #[cfg(feature = "vad_earshot")]
            {
                Box::new(crate::vad_earshot::EarshotVad::from_config(cfg))
            }
            #[cfg(not(feature = "vad_earshot"))]
            {
                Box::new(super::SimpleThresholdVad::new(cfg.vad_threshold_db))
            }
        }
    }
}

pub(super) struct VoiceMonitor {
    vad: Box<dyn VadEngine>,
    smoother: VadSmoother,
    flag: SpeechFlag,
    capture: Arc<Mutex<CaptureBuffer>>,
    device_rate: u32,
    frame_samples: usize,
    frame_ms: u64,
}

impl VoiceMonitor {
    pub(super) fn new(
        cfg: &VoicePipelineConfig,
        device_rate: u32,
        flag: SpeechFlag,
        capture: Arc<Mutex<CaptureBuffer>>,
    ) -> Self {
        Self {
            vad: create_vad_engine(cfg),
            smoother: VadSmoother::new(cfg.vad_smoothing_frames),
            flag,
            capture,
            device_rate,
            frame_samples: (TARGET_RATE as u64 * cfg.vad_frame_ms / 1000).max(1) as usize,
            frame_ms: cfg.vad_frame_ms,
        }
    }

    pub(super) fn vad_name(&self) -> &'static str {
        self.vad.name()
    }

    /// Classify one device-rate frame; returns the smoothed speaking state.
    pub(super) fn process_frame(&mut self, frame: Vec<f32>) -> bool {
        let frame = convert_frame_to_target(frame, self.device_rate, self.frame_samples);
        lock_or_recover(&self.capture, "voice_monitor_capture").push(&frame);
        let decision = self.smoother.smooth(self.vad.process_frame(&frame));
        let speaking = decision == VadDecision::Speech;
        self.flag.set(speaking);
        speaking
    }

    /// Drain frames until the stream is dropped or `shutdown` is raised.
    pub(super) fn run(mut self, frames: Receiver<Vec<f32>>, shutdown: Arc<AtomicBool>) {
        let wait = Duration::from_millis(self.frame_ms.max(5) * 4);
        while !shutdown.load(Ordering::Relaxed) {
            match frames.recv_timeout(wait) {
                Ok(frame) => {
                    self.process_frame(frame);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.vad.reset();
        self.smoother.reset();
        self.flag.set(false);
    }
}
