//! Hand-off to the external language-model and speech-recognition scripts.
//!
//! Language-model precomputation blocks: the trial block does not start until
//! every block model is built. Recognition of a response recording runs
//! detached so the next trial is not delayed; those jobs are reaped when the
//! session ends and their exit statuses are reported then.

use crate::config::AppConfig;
use crate::log_debug;
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;

/// Exit status of one external script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub tool: String,
    /// `None` when the process could not be spawned or was killed by a signal.
    pub status: Option<i32>,
    pub stderr: String,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    fn from_output(tool: &str, result: io::Result<Output>) -> Self {
        match result {
            Ok(output) => Self {
                tool: tool.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Err(err) => Self {
                tool: tool.to_string(),
                status: None,
                stderr: err.to_string(),
            },
        }
    }
}

/// Files for one block's language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageModelRequest {
    pub block: usize,
    pub list: PathBuf,
    pub prefix: PathBuf,
    pub arpa: PathBuf,
}

/// Files for one response transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub block: usize,
    pub index: usize,
    pub recording: PathBuf,
    pub annotation: PathBuf,
}

pub trait AnnotationPipeline {
    /// Build the model for one block and wait for it. Stops at the first failing step.
    fn build_language_model(&mut self, request: &LanguageModelRequest) -> Vec<ToolOutcome>;

    /// Start transcribing a response without waiting for it.
    fn recognize(&mut self, request: RecognitionRequest);

    /// Wait for every outstanding recognition job.
    fn finish(&mut self) -> Vec<(RecognitionRequest, ToolOutcome)>;
}

struct PendingRecognition {
    request: RecognitionRequest,
    done: Receiver<io::Result<Output>>,
}

/// Runs each script through the configured shell with positional arguments.
pub struct ShellPipeline {
    shell: String,
    shell_args: Vec<String>,
    kenlm_script: Option<PathBuf>,
    create_lm_script: Option<PathBuf>,
    dictionary: Option<PathBuf>,
    recognition_script: Option<PathBuf>,
    pending: Vec<PendingRecognition>,
}

impl ShellPipeline {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let (shell, shell_args) = config.shell_command()?;
        Ok(Self {
            shell,
            shell_args,
            kenlm_script: config.kenlm_script.clone(),
            create_lm_script: config.create_lm_script.clone(),
            dictionary: config.lm_dictionary.clone(),
            recognition_script: config.recognition_script.clone(),
            pending: Vec::new(),
        })
    }

    /// True when neither the model scripts nor the recognition script are configured.
    pub fn is_disabled(&self) -> bool {
        self.kenlm_script.is_none() && self.recognition_script.is_none()
    }

    fn command(&self, script: &Path, args: &[&Path]) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.args(&self.shell_args)
            .arg(script)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn run_blocking(&self, tool: &str, script: &Path, args: &[&Path]) -> ToolOutcome {
        log_debug(&format!("annotation: running {tool} ({})", script.display()));
        let result = self.command(script, args).output();
        ToolOutcome::from_output(tool, result)
    }
}

impl AnnotationPipeline for ShellPipeline {
    fn build_language_model(&mut self, request: &LanguageModelRequest) -> Vec<ToolOutcome> {
        let (Some(kenlm), Some(create_lm), Some(dictionary)) = (
            self.kenlm_script.as_deref(),
            self.create_lm_script.as_deref(),
            self.dictionary.as_deref(),
        ) else {
            return Vec::new();
        };

        let mut outcomes = Vec::with_capacity(2);
        let ngram = self.run_blocking("kenlm", kenlm, &[request.prefix.as_path(), request.list.as_path()]);
        let ok = ngram.success();
        outcomes.push(ngram);
        if !ok {
            return outcomes;
        }
        let block_name = PathBuf::from(request.block.to_string());
        outcomes.push(self.run_blocking(
            "create_lm",
            create_lm,
            &[block_name.as_path(), dictionary, request.arpa.as_path()],
        ));
        outcomes
    }

    fn recognize(&mut self, request: RecognitionRequest) {
        let Some(script) = self.recognition_script.as_deref() else {
            return;
        };
        let block_name = PathBuf::from(request.block.to_string());
        let mut cmd = self.command(script, &[
            block_name.as_path(),
            request.recording.as_path(),
            request.annotation.as_path(),
        ]);
        let (tx, rx) = bounded(1);
        match cmd.spawn() {
            Ok(child) => {
                thread::spawn(move || {
                    let _ = tx.send(child.wait_with_output());
                });
            }
            Err(err) => {
                let _ = tx.send(Err(err));
            }
        }
        self.pending.push(PendingRecognition { request, done: rx });
    }

    fn finish(&mut self) -> Vec<(RecognitionRequest, ToolOutcome)> {
        self.pending
            .drain(..)
            .map(|job| {
                let result = job.done.recv().unwrap_or_else(|_| {
                    Err(io::Error::other("recognition waiter disconnected"))
                });
                let outcome = ToolOutcome::from_output("recognition", result);
                if !outcome.success() {
                    log_debug(&format!(
                        "annotation: recognition for trial {} exited with {:?}",
                        job.request.index, outcome.status
                    ));
                }
                (job.request, outcome)
            })
            .collect()
    }
}
