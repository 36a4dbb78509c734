use super::error::{AdapterResultExt, SessionError, SessionResult};
use super::phase::SessionPhase;
use crate::audio::AudioRecorder;
use std::path::Path;

/// Sole handle on the recorder for a session. Start and stop must alternate.
pub struct ExclusiveRecorder<'a> {
    inner: &'a mut dyn AudioRecorder,
    open: bool,
}

impl<'a> ExclusiveRecorder<'a> {
    pub fn new(inner: &'a mut dyn AudioRecorder) -> Self {
        Self { inner, open: false }
    }

    pub fn is_recording(&self) -> bool {
        self.open
    }

    pub fn start(&mut self, phase: SessionPhase, trial: Option<usize>) -> SessionResult<()> {
        if self.open {
            return Err(out_of_order(phase, trial, "recording started twice"));
        }
        self.inner.start_recording().resource(phase, trial)?;
        self.open = true;
        Ok(())
    }

    /// Close the open recording into `path`.
    pub fn stop(
        &mut self,
        path: &Path,
        phase: SessionPhase,
        trial: Option<usize>,
    ) -> SessionResult<()> {
        if !self.open {
            return Err(out_of_order(phase, trial, "no recording to stop"));
        }
        self.open = false;
        self.inner.stop_recording(path).resource(phase, trial)
    }

    /// Pass `result` through, first closing the open recording into `path`
    /// when it is an error. A failing stop is logged and the original error
    /// is returned.
    pub fn close_on_error<T>(
        &mut self,
        result: SessionResult<T>,
        path: &Path,
        phase: SessionPhase,
        trial: Option<usize>,
    ) -> SessionResult<T> {
        if result.is_err() && self.open {
            if let Err(err) = self.stop(path, phase, trial) {
                tracing::warn!(path = %path.display(), error = %err, "recording not saved");
            }
        }
        result
    }
}

fn out_of_order(phase: SessionPhase, trial: Option<usize>, what: &str) -> SessionError {
    SessionError::Resource {
        phase,
        trial,
        source: what.into(),
    }
}
