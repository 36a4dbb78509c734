use super::defaults::{ALLOWED_SHELLS, MAX_BLOCK_SIZE, MAX_RECALL_CEILING_MS, MAX_TRIALS};
use super::{
    AppConfig, ProtocolConfig, VoicePipelineConfig, DEFAULT_VAD_CHANNEL_CAPACITY,
    FINAL_RECALL_FROM_SESSION, INITIAL_RECALL_FROM_SESSION,
};
use crate::recall::{RecallWindowParams, TrialRecallParams};
use crate::timeline::JitterRange;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Token accepted in place of a real subject id for dry runs.
pub(super) const TEST_SUBJECT: &str = "TEST";

fn subject_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^LTP[0-9]{3}$").expect("subject pattern compiles"))
}

/// Subject ids are `LTP` plus exactly three ASCII digits, or the literal `TEST`.
pub fn is_valid_subject(candidate: &str) -> bool {
    candidate == TEST_SUBJECT || subject_pattern().is_match(candidate)
}

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if let Some(subject) = &self.subject {
            if !is_valid_subject(subject) {
                bail!("--subject must be LTP followed by three digits or {TEST_SUBJECT}, got '{subject}'");
            }
        }

        let experiment = self.experiment.trim();
        if experiment.is_empty()
            || !experiment
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            bail!("--experiment must be non-empty and contain only [A-Za-z0-9_-]");
        }
        self.experiment = experiment.to_string();

        if !(1..=MAX_TRIALS).contains(&self.trials) {
            bail!("--trials must be between 1 and {MAX_TRIALS}, got {}", self.trials);
        }
        if !(1..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            bail!(
                "--block-size must be between 1 and {MAX_BLOCK_SIZE}, got {}",
                self.block_size
            );
        }
        if !(1..=100).contains(&self.trial_poll_ms) {
            bail!(
                "--trial-poll-ms must be between 1 and 100, got {}",
                self.trial_poll_ms
            );
        }
        if !(10..=10_000).contains(&self.session_poll_ms) {
            bail!(
                "--session-poll-ms must be between 10 and 10000, got {}",
                self.session_poll_ms
            );
        }
        let minimum_ceiling = TrialRecallParams::minimum_ceiling().as_millis() as u64;
        if self.recall_ceiling_ms < minimum_ceiling || self.recall_ceiling_ms > MAX_RECALL_CEILING_MS
        {
            bail!(
                "--recall-ceiling-ms must be between {minimum_ceiling} and {MAX_RECALL_CEILING_MS}, got {}",
                self.recall_ceiling_ms
            );
        }
        if !(50..=5_000).contains(&self.beep_ms) {
            bail!("--beep-ms must be between 50 and 5000, got {}", self.beep_ms);
        }
        if !(1_000..=30_000).contains(&self.mic_test_ms) {
            bail!(
                "--mic-test-ms must be between 1000 and 30000, got {}",
                self.mic_test_ms
            );
        }
        if !(-120.0..=0.0).contains(&self.vad_threshold_db) {
            bail!(
                "--vad-threshold-db must be between -120.0 and 0.0 dB, got {}",
                self.vad_threshold_db
            );
        }
        if !(5..=120).contains(&self.vad_frame_ms) {
            bail!(
                "--vad-frame-ms must be between 5 and 120, got {}",
                self.vad_frame_ms
            );
        }
        if !(1..=10).contains(&self.vad_smoothing_frames) {
            bail!(
                "--vad-smoothing-frames must be between 1 and 10, got {}",
                self.vad_smoothing_frames
            );
        }

        #[cfg(not(feature = "vad_earshot"))]
        if matches!(self.vad_engine, super::VadEngineKind::Earshot) {
            bail!("--vad-engine earshot requires building with the 'vad_earshot' feature");
        }

        self.shell_cmd = sanitize_shell(&self.shell_cmd)?;

        // The two language-model steps run back to back, so they are configured together.
        let lm_parts = [
            self.kenlm_script.is_some(),
            self.create_lm_script.is_some(),
            self.lm_dictionary.is_some(),
        ];
        if lm_parts.iter().any(|set| *set) && !lm_parts.iter().all(|set| *set) {
            bail!("--kenlm-script, --create-lm-script and --lm-dictionary must be given together");
        }
        for (path, flag) in [
            (&mut self.kenlm_script, "--kenlm-script"),
            (&mut self.create_lm_script, "--create-lm-script"),
            (&mut self.lm_dictionary, "--lm-dictionary"),
            (&mut self.recognition_script, "--recognition-script"),
        ] {
            if let Some(value) = path {
                *value = canonical_file(value, flag)?;
            }
        }

        Ok(())
    }

    /// Snapshot the VAD settings for the microphone monitor.
    pub fn voice_pipeline_config(&self) -> VoicePipelineConfig {
        VoicePipelineConfig {
            vad_threshold_db: self.vad_threshold_db,
            vad_frame_ms: self.vad_frame_ms,
            vad_smoothing_frames: self.vad_smoothing_frames,
            channel_capacity: DEFAULT_VAD_CHANNEL_CAPACITY,
            vad_engine: self.vad_engine,
        }
    }

    /// Resolve CLI timings into the protocol the orchestrator runs.
    pub fn protocol(&self) -> ProtocolConfig {
        let session_poll = Duration::from_millis(self.session_poll_ms);
        ProtocolConfig {
            isi: JitterRange::from_secs(1.0, 1.6),
            stimulus_display: JitterRange::from_secs(1.2, 1.8),
            trial_recall: TrialRecallParams::reference(
                Duration::from_millis(self.trial_poll_ms),
                Duration::from_millis(self.recall_ceiling_ms),
            ),
            initial_recall: RecallWindowParams::initial_free_recall(session_poll),
            final_recall: RecallWindowParams::final_free_recall(session_poll),
            beep_length: Duration::from_millis(self.beep_ms),
            mic_test_length: Duration::from_millis(self.mic_test_ms),
            trials: self.trials,
            block_size: self.block_size,
            strict_liveness: self.strict_liveness,
            initial_recall_from_session: INITIAL_RECALL_FROM_SESSION,
            final_recall_from_session: FINAL_RECALL_FROM_SESSION,
        }
    }

    /// Split `--shell-cmd` into program and leading arguments.
    pub fn shell_command(&self) -> Result<(String, Vec<String>)> {
        split_shell(&self.shell_cmd)
    }
}

fn split_shell(value: &str) -> Result<(String, Vec<String>)> {
    let mut words = shell_words::split(value)
        .with_context(|| format!("failed to parse --shell-cmd '{value}'"))?;
    if words.is_empty() {
        bail!("--shell-cmd cannot be empty");
    }
    let program = words.remove(0);
    Ok((program, words))
}

/// Accept a known shell name or an executable path, keeping any trailing flags.
pub(super) fn sanitize_shell(value: &str) -> Result<String> {
    let (program, args) = split_shell(value.trim())?;
    let resolved = if let Some(allowed) = ALLOWED_SHELLS
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(&program))
    {
        (*allowed).to_string()
    } else {
        let path = Path::new(&program);
        if !(path.is_absolute() || program.contains(std::path::MAIN_SEPARATOR)) {
            bail!("--shell-cmd must start with one of {ALLOWED_SHELLS:?} or an existing binary path");
        }
        let canonical = canonical_file(path, "--shell-cmd")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&canonical)
                .with_context(|| format!("failed to inspect --shell-cmd '{}'", canonical.display()))?
                .permissions()
                .mode();
            if mode & 0o111 == 0 {
                bail!(
                    "--shell-cmd '{}' exists but is not executable (mode {:o})",
                    canonical.display(),
                    mode
                );
            }
        }
        canonical
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("--shell-cmd must be valid UTF-8"))?
    };
    let mut words = vec![resolved];
    words.extend(args);
    Ok(shell_words::join(words))
}

/// Canonicalize a path that must name an existing regular file.
pub(super) fn canonical_file(path: &Path, flag: &str) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {flag} '{}'", path.display()))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
    if !metadata.is_file() {
        bail!("{flag} '{}' is not a file", canonical.display());
    }
    Ok(canonical)
}
