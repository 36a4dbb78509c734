//! Earshot voice activity detector behind the crate's `VadEngine` trait.

use crate::audio::{VadDecision, VadEngine, TARGET_RATE};
use crate::config::VoicePipelineConfig;
use earshot::{VoiceActivityDetector, VoiceActivityProfile};

pub struct EarshotVad {
    detector: VoiceActivityDetector,
    frame_samples: usize,
    pcm: Vec<i16>,
}

impl EarshotVad {
    /// Lower thresholds pick more aggressive profiles, so quiet rooms are not
    /// read as constant speech.
    pub fn from_config(cfg: &VoicePipelineConfig) -> Self {
        let profile = if cfg.vad_threshold_db <= -50.0 {
            VoiceActivityProfile::VERY_AGGRESSIVE
        } else if cfg.vad_threshold_db <= -40.0 {
            VoiceActivityProfile::AGGRESSIVE
        } else if cfg.vad_threshold_db <= -30.0 {
            VoiceActivityProfile::LBR
        } else {
            VoiceActivityProfile::QUALITY
        };
        // Earshot only accepts 10, 20 or 30 ms frames.
        let frame_ms = match cfg.vad_frame_ms {
            0..=14 => 10,
            15..=24 => 20,
            _ => 30,
        };
        Self {
            detector: VoiceActivityDetector::new(profile),
            frame_samples: TARGET_RATE as usize * frame_ms / 1000,
            pcm: Vec::new(),
        }
    }
}

impl VadEngine for EarshotVad {
    fn process_frame(&mut self, samples: &[f32]) -> VadDecision {
        if samples.is_empty() {
            return VadDecision::Uncertain;
        }
        self.pcm.clear();
        self.pcm.extend(
            samples
                .iter()
                .take(self.frame_samples)
                .map(|sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
        );
        self.pcm.resize(self.frame_samples, 0);
        match self.detector.predict_16khz(&self.pcm) {
            Ok(true) => VadDecision::Speech,
            Ok(false) => VadDecision::Silence,
            Err(_) => VadDecision::Uncertain,
        }
    }

    fn reset(&mut self) {
        self.detector.reset();
    }

    fn name(&self) -> &'static str {
        "earshot_vad"
    }
}
