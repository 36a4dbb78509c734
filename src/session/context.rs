use super::error::{IoResultExt, SessionResult};
use super::phase::SessionPhase;
use crate::config::ProtocolConfig;
use crate::events::{EventSink, ScriptedEvent, SessionEvent};
use crate::log_debug;
use crate::storage::SessionPaths;

/// Explicit per-session state handed to every protocol step.
pub struct SessionContext {
    subject: String,
    paths: SessionPaths,
    phase: SessionPhase,
    events: Box<dyn EventSink>,
    recall_timeouts: usize,
}

impl SessionContext {
    pub fn new(subject: String, paths: SessionPaths, events: Box<dyn EventSink>) -> Self {
        Self {
            subject,
            paths,
            phase: SessionPhase::NotStarted,
            events,
            recall_timeouts: 0,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Ordinal assigned when the session directory was claimed.
    pub fn session(&self) -> u32 {
        self.paths.session()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Move to the next phase of the protocol and return it.
    pub fn advance(&mut self, protocol: &ProtocolConfig) -> SessionPhase {
        let next = self.phase.next(self.session(), protocol);
        if next != self.phase {
            log_debug(&format!("session phase: {} -> {}", self.phase, next));
            tracing::info!(from = self.phase.label(), to = next.label(), "session phase");
        }
        self.phase = next;
        next
    }

    /// Append `event` to the session log, stamped with `time` (wall-clock ms).
    pub fn emit(&mut self, time: u64, event: SessionEvent) -> SessionResult<()> {
        tracing::debug!(event = event.label(), time, "session event");
        self.events
            .record(ScriptedEvent { time, event })
            .storage(self.phase, "writing the event log")
    }

    pub fn count_recall_timeout(&mut self) {
        self.recall_timeouts += 1;
    }

    pub fn recall_timeouts(&self) -> usize {
        self.recall_timeouts
    }
}
