use super::VadEngineKind;

pub const DEFAULT_EXPERIMENT: &str = "VFFR";
pub const DEFAULT_DATA_ROOT: &str = "data";
pub const DEFAULT_WORD_POOL: &str = "wordpools/wordpool_en.txt";
pub const DEFAULT_NUMBERING_POOL: &str = "wordpools/wasnorm_wordpool.txt";

pub const DEFAULT_TRIALS: usize = 10;
pub const DEFAULT_BLOCK_SIZE: usize = 1;
pub const DEFAULT_TRIAL_POLL_MS: u64 = 10;
pub const DEFAULT_SESSION_POLL_MS: u64 = 5_000;
pub const DEFAULT_RECALL_CEILING_MS: u64 = 10_000;
pub const DEFAULT_BEEP_MS: u64 = 500;
pub const DEFAULT_MIC_TEST_MS: u64 = 5_000;

pub const DEFAULT_VAD_THRESHOLD_DB: f32 = -45.0;
pub const DEFAULT_VAD_FRAME_MS: u64 = 20;
pub const DEFAULT_VAD_SMOOTHING_FRAMES: usize = 3;
pub const DEFAULT_VAD_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_SHELL_CMD: &str = "sh";

/// Sessions at or past this ordinal open with an initial free recall.
pub const INITIAL_RECALL_FROM_SESSION: u32 = 5;
/// Sessions at or past this ordinal close with a final free recall.
pub const FINAL_RECALL_FROM_SESSION: u32 = 10;

pub(super) const MAX_TRIALS: usize = 1_000;
pub(super) const MAX_BLOCK_SIZE: usize = 100;
pub(super) const MAX_RECALL_CEILING_MS: u64 = 120_000;
pub(super) const ALLOWED_SHELLS: &[&str] = &["sh", "bash", "zsh"];

pub const fn default_vad_engine() -> VadEngineKind {
    #[cfg(feature = "vad_earshot")]
    {
        VadEngineKind::Earshot
    }
    #[cfg(not(feature = "vad_earshot"))]
    {
        VadEngineKind::Simple
    }
}
