//! Voice-driven recall windows.
//!
//! Two policies share the same shape: a pure `observe(now, speaking)` step
//! that decides whether the window has closed, and a `run_*` driver that polls
//! voice activity on the [`Timeline`](crate::timeline::Timeline) until it does.
//!
//! - [`RecallWindow`] ends a free-recall period once the minimum has passed and
//!   the subject has been silent long enough, or at the hard maximum.
//! - [`TrialRecall`] ends a single-word response: it flags speech during the
//!   opening settle period as too soon, then waits for a completed utterance,
//!   bounded by a ceiling so a silent trial cannot stall the session.

mod trial;
mod window;

pub use trial::{run_trial_recall, TrialClose, TrialPhase, TrialRecall, TrialRecallOutcome, TrialRecallParams};
pub use window::{run_recall_window, RecallOutcome, RecallWindow, RecallWindowParams, WindowClose};
