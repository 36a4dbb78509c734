//! On-disk layout for subject sessions.
//!
//! `<root>/<experiment>/<subject>/session_<n>/` holds everything one session
//! produces: the event log, per-block `.lst` files, response recordings and
//! the annotation outputs written by the recognition scripts.

use chrono::{DateTime, Local};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

const SESSION_DIR_PREFIX: &str = "session_";

/// Upper bound on ordinal probing; reaching it means the data root is unusable.
const MAX_SESSION_ORDINAL: u32 = 100_000;

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
    experiment: String,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            experiment: experiment.into(),
        }
    }

    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.root.join(&self.experiment).join(subject)
    }

    pub fn session_dir(&self, subject: &str, session: u32) -> PathBuf {
        self.subject_dir(subject)
            .join(format!("{SESSION_DIR_PREFIX}{session}"))
    }

    /// Create and claim the first unused session directory for `subject`.
    ///
    /// Probing is a plain existence check; the claim itself is `create_dir`,
    /// so a directory created by a concurrent launch between the probe and the
    /// claim moves this one on to the next ordinal.
    pub fn claim_session(&self, subject: &str) -> io::Result<SessionPaths> {
        fs::create_dir_all(self.subject_dir(subject))?;
        let mut session = next_session_number(|n| self.session_dir(subject, n).exists());
        while session < MAX_SESSION_ORDINAL {
            let dir = self.session_dir(subject, session);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(SessionPaths { session, dir }),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => session += 1,
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::other(format!(
            "no free session ordinal below {MAX_SESSION_ORDINAL} for subject {subject}"
        )))
    }
}

/// First ordinal, counting up from zero, for which `exists` reports false.
pub fn next_session_number(exists: impl Fn(u32) -> bool) -> u32 {
    let mut session = 0;
    while exists(session) {
        session += 1;
    }
    session
}

/// File names inside one claimed session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    session: u32,
    dir: PathBuf,
}

impl SessionPaths {
    pub fn new(session: u32, dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            dir: dir.into(),
        }
    }

    pub fn session(&self) -> u32 {
        self.session
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn event_log(&self) -> PathBuf {
        self.dir.join(crate::events::EVENT_LOG_FILE)
    }

    /// Response recording for trial `index`: `<index>.wav` or `<index>_practice.wav`.
    pub fn response_wav(&self, index: usize, practice: bool) -> PathBuf {
        self.dir.join(format!("{}.wav", response_stem(index, practice)))
    }

    /// Recognition output next to the response recording.
    pub fn annotation(&self, index: usize, practice: bool) -> PathBuf {
        self.dir.join(format!("{}.ann", response_stem(index, practice)))
    }

    pub fn initial_recall_wav(&self) -> PathBuf {
        self.dir.join("ifr.wav")
    }

    pub fn final_recall_wav(&self) -> PathBuf {
        self.dir.join("ffr.wav")
    }

    pub fn block_list(&self, block: usize) -> PathBuf {
        self.dir.join(format!("{block}.lst"))
    }

    /// Extension-less prefix the n-gram script writes its intermediates under.
    pub fn block_prefix(&self, block: usize) -> PathBuf {
        self.dir.join(block.to_string())
    }

    pub fn block_arpa(&self, block: usize) -> PathBuf {
        self.dir.join(format!("{block}.arpa"))
    }

    /// `microphone_test_<yyyy-MM-dd_HH_mm_ss>.wav`, stamped in local time.
    pub fn microphone_test_wav(&self, wall_ms: u64) -> PathBuf {
        self.dir
            .join(format!("microphone_test_{}.wav", local_stamp(wall_ms)))
    }
}

fn response_stem(index: usize, practice: bool) -> String {
    if practice {
        format!("{index}_practice")
    } else {
        index.to_string()
    }
}

fn local_stamp(wall_ms: u64) -> String {
    let millis = i64::try_from(wall_ms).unwrap_or(i64::MAX);
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&Local)
        .format("%Y-%m-%d_%H_%M_%S")
        .to_string()
}

/// Write `lines` joined by `\n` with no newline after the last one.
pub fn write_lst(path: &Path, lines: &[String]) -> io::Result<()> {
    fs::write(path, lines.join("\n"))
}
