use crate::config::ProtocolConfig;
use std::fmt;

/// Where a session is in the protocol. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    NotStarted,
    Instructions,
    MicrophoneCheck,
    InitialRecall,
    Trials,
    FinalRecall,
    Complete,
}

impl SessionPhase {
    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::NotStarted => "not started",
            SessionPhase::Instructions => "instructions",
            SessionPhase::MicrophoneCheck => "microphone check",
            SessionPhase::InitialRecall => "initial recall",
            SessionPhase::Trials => "trials",
            SessionPhase::FinalRecall => "final recall",
            SessionPhase::Complete => "complete",
        }
    }

    /// Phase that follows this one for session ordinal `session`. Free recall
    /// phases are skipped until the subject has enough prior sessions.
    pub fn next(self, session: u32, protocol: &ProtocolConfig) -> SessionPhase {
        match self {
            SessionPhase::NotStarted => SessionPhase::Instructions,
            SessionPhase::Instructions => SessionPhase::MicrophoneCheck,
            SessionPhase::MicrophoneCheck if session >= protocol.initial_recall_from_session => {
                SessionPhase::InitialRecall
            }
            SessionPhase::MicrophoneCheck | SessionPhase::InitialRecall => SessionPhase::Trials,
            SessionPhase::Trials if session >= protocol.final_recall_from_session => {
                SessionPhase::FinalRecall
            }
            SessionPhase::Trials | SessionPhase::FinalRecall | SessionPhase::Complete => {
                SessionPhase::Complete
            }
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
