//! Append-only session event log.
//!
//! Every protocol step reports a [`SessionEvent`] stamped with wall-clock
//! milliseconds. Records are newline-delimited JSON with a `"type"` tag and a
//! `"data"` payload so downstream alignment tools can key on the label.

use crate::lock_or_recover;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File name of the event log inside a session directory.
pub const EVENT_LOG_FILE: &str = "session.jsonl";

/// Sentinel reported when a stimulus is missing from the numbering pool.
pub const UNKNOWN_WORD_NUMBER: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    #[serde(rename = "session start")]
    SessionStart {
        subject: String,
        session: u32,
        seed: u64,
    },

    #[serde(rename = "microphone test start")]
    MicrophoneTestStart { attempt: u32 },

    #[serde(rename = "microphone test stop")]
    MicrophoneTestStop { attempt: u32, path: String },

    #[serde(rename = "microphone test response")]
    MicrophoneTestResponse { attempt: u32, response: String },

    #[serde(rename = "initial recall start")]
    InitialRecallStart {},

    #[serde(rename = "initial recall stop")]
    InitialRecallStop {},

    #[serde(rename = "stimulus")]
    Stimulus {
        word: String,
        index: usize,
        #[serde(rename = "ltp word number")]
        ltp_word_number: i64,
        practice: bool,
    },

    #[serde(rename = "stimulus cleared")]
    StimulusCleared { word: String, index: usize },

    #[serde(rename = "recall start")]
    RecallStart { word: String, index: usize },

    /// The trial's response window hit its ceiling without a completed response.
    #[serde(rename = "recall timeout")]
    RecallTimeout {
        word: String,
        index: usize,
        elapsed_ms: u64,
    },

    #[serde(rename = "recall stop")]
    RecallStop {
        word: String,
        index: usize,
        too_fast: bool,
    },

    #[serde(rename = "beep start")]
    BeepStart {},

    #[serde(rename = "beep stop")]
    BeepStop {},

    #[serde(rename = "final recall start")]
    FinalRecallStart {},

    #[serde(rename = "final recall stop")]
    FinalRecallStop {},

    #[serde(rename = "session end")]
    SessionEnd {
        recall_timeouts: usize,
        recognition_failures: usize,
    },
}

impl SessionEvent {
    /// The `"type"` label this event is serialized under.
    pub fn label(&self) -> &'static str {
        match self {
            SessionEvent::SessionStart { .. } => "session start",
            SessionEvent::MicrophoneTestStart { .. } => "microphone test start",
            SessionEvent::MicrophoneTestStop { .. } => "microphone test stop",
            SessionEvent::MicrophoneTestResponse { .. } => "microphone test response",
            SessionEvent::InitialRecallStart {} => "initial recall start",
            SessionEvent::InitialRecallStop {} => "initial recall stop",
            SessionEvent::Stimulus { .. } => "stimulus",
            SessionEvent::StimulusCleared { .. } => "stimulus cleared",
            SessionEvent::RecallStart { .. } => "recall start",
            SessionEvent::RecallTimeout { .. } => "recall timeout",
            SessionEvent::RecallStop { .. } => "recall stop",
            SessionEvent::BeepStart {} => "beep start",
            SessionEvent::BeepStop {} => "beep stop",
            SessionEvent::FinalRecallStart {} => "final recall start",
            SessionEvent::FinalRecallStop {} => "final recall stop",
            SessionEvent::SessionEnd { .. } => "session end",
        }
    }
}

/// One log line: the event plus its wall-clock timestamp (ms since epoch).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptedEvent {
    pub time: u64,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Destination for session events. Records are never rewritten.
pub trait EventSink {
    fn record(&mut self, event: ScriptedEvent) -> io::Result<()>;
}

/// Newline-delimited JSON log, flushed after every record so a crash loses at
/// most the event being written.
pub struct JsonlEventLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlEventLog {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlEventLog {
    fn record(&mut self, event: ScriptedEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// In-memory sink; clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    events: Arc<Mutex<Vec<ScriptedEvent>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScriptedEvent> {
        lock_or_recover(&self.events, "memory_event_log").clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        lock_or_recover(&self.events, "memory_event_log")
            .iter()
            .map(|record| record.event.label())
            .collect()
    }
}

impl EventSink for MemoryEventLog {
    fn record(&mut self, event: ScriptedEvent) -> io::Result<()> {
        lock_or_recover(&self.events, "memory_event_log").push(event);
        Ok(())
    }
}
