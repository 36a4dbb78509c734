//! Session failure taxonomy.

use super::phase::SessionPhase;
use std::io;
use std::time::Duration;
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Recorder or playback hardware failed.
    #[error("audio failure during {phase}{}: {source}", trial_suffix(.trial))]
    Resource {
        phase: SessionPhase,
        trial: Option<usize>,
        #[source]
        source: BoxError,
    },

    #[error("{tool} for block {block} exited with {} during {phase}: {stderr}", status_label(.status))]
    ExternalTool {
        phase: SessionPhase,
        block: usize,
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A trial's response window reached its ceiling with strict liveness on.
    #[error("trial {trial} produced no response within {} ms", .elapsed.as_millis())]
    ProtocolLiveness { trial: usize, elapsed: Duration },

    #[error("session aborted by operator during {phase}")]
    Aborted { phase: SessionPhase },

    /// The console failed to draw or read input.
    #[error("console failure during {phase}: {source}")]
    Interface {
        phase: SessionPhase,
        #[source]
        source: BoxError,
    },

    #[error("{context} failed during {phase}: {source}")]
    Io {
        phase: SessionPhase,
        context: String,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    pub fn is_abort(&self) -> bool {
        matches!(self, SessionError::Aborted { .. })
    }
}

fn trial_suffix(trial: &Option<usize>) -> String {
    match trial {
        Some(index) => format!(" (trial {index})"),
        None => String::new(),
    }
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status".to_string(),
    }
}

/// Attach session position to adapter errors.
pub(crate) trait AdapterResultExt<T> {
    fn interface(self, phase: SessionPhase) -> SessionResult<T>;
    fn resource(self, phase: SessionPhase, trial: Option<usize>) -> SessionResult<T>;
}

impl<T> AdapterResultExt<T> for anyhow::Result<T> {
    fn interface(self, phase: SessionPhase) -> SessionResult<T> {
        self.map_err(|err| SessionError::Interface {
            phase,
            source: err.into(),
        })
    }

    fn resource(self, phase: SessionPhase, trial: Option<usize>) -> SessionResult<T> {
        self.map_err(|err| SessionError::Resource {
            phase,
            trial,
            source: err.into(),
        })
    }
}

pub(crate) trait IoResultExt<T> {
    fn storage(self, phase: SessionPhase, context: impl Into<String>) -> SessionResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn storage(self, phase: SessionPhase, context: impl Into<String>) -> SessionResult<T> {
        self.map_err(|source| SessionError::Io {
            phase,
            context: context.into(),
            source,
        })
    }
}
