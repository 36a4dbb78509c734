//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub use defaults::{
    default_vad_engine, DEFAULT_BEEP_MS, DEFAULT_BLOCK_SIZE, DEFAULT_DATA_ROOT,
    DEFAULT_EXPERIMENT, DEFAULT_MIC_TEST_MS, DEFAULT_NUMBERING_POOL, DEFAULT_RECALL_CEILING_MS,
    DEFAULT_SESSION_POLL_MS, DEFAULT_SHELL_CMD, DEFAULT_TRIALS, DEFAULT_TRIAL_POLL_MS,
    DEFAULT_VAD_CHANNEL_CAPACITY, DEFAULT_VAD_FRAME_MS, DEFAULT_VAD_SMOOTHING_FRAMES,
    DEFAULT_VAD_THRESHOLD_DB, DEFAULT_WORD_POOL, FINAL_RECALL_FROM_SESSION,
    INITIAL_RECALL_FROM_SESSION,
};
pub use validation::is_valid_subject;

use crate::recall::{RecallWindowParams, TrialRecallParams};
use crate::timeline::JitterRange;

/// CLI options for a VFFR session. Validation runs before any hardware is touched.
#[derive(Debug, Parser, Clone)]
#[command(about = "VFFR voice free-recall session controller", author, version)]
pub struct AppConfig {
    /// Root directory for per-subject session data
    #[arg(long, env = "VFFR_DATA_ROOT", default_value = DEFAULT_DATA_ROOT)]
    pub data_root: PathBuf,

    /// Experiment name used as the first level under the data root
    #[arg(long, default_value = DEFAULT_EXPERIMENT)]
    pub experiment: String,

    /// Subject identifier (LTP followed by three digits, or TEST); prompted when omitted
    #[arg(long)]
    pub subject: Option<String>,

    /// Stimulus word pool, one word per line (shuffled per session)
    #[arg(long, default_value = DEFAULT_WORD_POOL)]
    pub word_pool: PathBuf,

    /// Reference pool used to assign stable word numbers in the event log
    #[arg(long, default_value = DEFAULT_NUMBERING_POOL)]
    pub numbering_pool: PathBuf,

    /// Number of study/recall trials in the block
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    pub trials: usize,

    /// Words per language-model block
    #[arg(long = "block-size", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Seed for word shuffling and interval jitter (random when omitted)
    #[arg(long, env = "VFFR_SEED")]
    pub seed: Option<u64>,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Voice activity detection threshold (decibels)
    #[arg(long = "vad-threshold-db", default_value_t = DEFAULT_VAD_THRESHOLD_DB)]
    pub vad_threshold_db: f32,

    /// Voice activity detection frame size (milliseconds)
    #[arg(long = "vad-frame-ms", default_value_t = DEFAULT_VAD_FRAME_MS)]
    pub vad_frame_ms: u64,

    /// VAD smoothing window (frames)
    #[arg(long = "vad-smoothing-frames", default_value_t = DEFAULT_VAD_SMOOTHING_FRAMES)]
    pub vad_smoothing_frames: usize,

    /// Voice activity detector implementation to use
    #[arg(long = "vad-engine", value_enum, default_value_t = default_vad_engine())]
    pub vad_engine: VadEngineKind,

    /// Voice sampling cadence during trial recall (milliseconds)
    #[arg(long = "trial-poll-ms", default_value_t = DEFAULT_TRIAL_POLL_MS)]
    pub trial_poll_ms: u64,

    /// Voice sampling cadence during free recall (milliseconds)
    #[arg(long = "session-poll-ms", default_value_t = DEFAULT_SESSION_POLL_MS)]
    pub session_poll_ms: u64,

    /// Hard ceiling on a trial's recall window, measured from recall start (milliseconds)
    #[arg(long = "recall-ceiling-ms", default_value_t = DEFAULT_RECALL_CEILING_MS)]
    pub recall_ceiling_ms: u64,

    /// Abort the session when a trial hits the recall ceiling without a response
    #[arg(long = "strict-liveness", default_value_t = false)]
    pub strict_liveness: bool,

    /// Length of the end-of-trial beep (milliseconds)
    #[arg(long = "beep-ms", default_value_t = DEFAULT_BEEP_MS)]
    pub beep_ms: u64,

    /// Length of each microphone test recording (milliseconds)
    #[arg(long = "mic-test-ms", default_value_t = DEFAULT_MIC_TEST_MS)]
    pub mic_test_ms: u64,

    /// Shell used to run annotation scripts (may include leading flags)
    #[arg(long = "shell-cmd", default_value = DEFAULT_SHELL_CMD)]
    pub shell_cmd: String,

    /// Script that builds an n-gram model from a block list
    #[arg(long = "kenlm-script")]
    pub kenlm_script: Option<PathBuf>,

    /// Script that compiles the recognizer language model for a block
    #[arg(long = "create-lm-script")]
    pub create_lm_script: Option<PathBuf>,

    /// Pronunciation dictionary handed to the language-model script
    #[arg(long = "lm-dictionary")]
    pub lm_dictionary: Option<PathBuf>,

    /// Script that transcribes one response recording
    #[arg(long = "recognition-script")]
    pub recognition_script: Option<PathBuf>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "VFFR_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "VFFR_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging participant content (subject ids, stimulus words)
    #[arg(long = "log-content", env = "VFFR_LOG_CONTENT", default_value_t = false)]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}

/// Runtime-selectable voice activity detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VadEngineKind {
    Earshot,
    Simple,
}

impl VadEngineKind {
    pub fn label(self) -> &'static str {
        match self {
            VadEngineKind::Earshot => "earshot",
            VadEngineKind::Simple => "simple",
        }
    }
}

/// Tunables for the live microphone monitor.
#[derive(Debug, Clone)]
pub struct VoicePipelineConfig {
    pub vad_threshold_db: f32,
    pub vad_frame_ms: u64,
    pub vad_smoothing_frames: usize,
    pub channel_capacity: usize,
    pub vad_engine: VadEngineKind,
}

/// Every duration and count the session protocol runs on.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    pub isi: JitterRange,
    pub stimulus_display: JitterRange,
    pub trial_recall: TrialRecallParams,
    pub initial_recall: RecallWindowParams,
    pub final_recall: RecallWindowParams,
    pub beep_length: Duration,
    pub mic_test_length: Duration,
    pub trials: usize,
    pub block_size: usize,
    pub strict_liveness: bool,
    pub initial_recall_from_session: u32,
    pub final_recall_from_session: u32,
}

impl ProtocolConfig {
    /// The reference protocol: 10 single-word blocks, 10 ms trial polling,
    /// 5 s free-recall polling.
    pub fn reference() -> Self {
        Self {
            isi: JitterRange::from_secs(1.0, 1.6),
            stimulus_display: JitterRange::from_secs(1.2, 1.8),
            trial_recall: TrialRecallParams::reference(
                Duration::from_millis(DEFAULT_TRIAL_POLL_MS),
                Duration::from_millis(DEFAULT_RECALL_CEILING_MS),
            ),
            initial_recall: RecallWindowParams::initial_free_recall(Duration::from_millis(
                DEFAULT_SESSION_POLL_MS,
            )),
            final_recall: RecallWindowParams::final_free_recall(Duration::from_millis(
                DEFAULT_SESSION_POLL_MS,
            )),
            beep_length: Duration::from_millis(DEFAULT_BEEP_MS),
            mic_test_length: Duration::from_millis(DEFAULT_MIC_TEST_MS),
            trials: DEFAULT_TRIALS,
            block_size: DEFAULT_BLOCK_SIZE,
            strict_liveness: false,
            initial_recall_from_session: INITIAL_RECALL_FROM_SESSION,
            final_recall_from_session: FINAL_RECALL_FROM_SESSION,
        }
    }

    /// Number of `.lst` blocks needed to cover every trial word.
    pub fn block_count(&self) -> usize {
        self.trials.div_ceil(self.block_size.max(1))
    }
}
