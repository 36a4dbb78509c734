//! The session protocol.
//!
//! [`SessionOrchestrator`] walks the [`SessionPhase`] sequence: subject prompt,
//! instructions, microphone check, optional initial free recall, the trial
//! block, optional final free recall. Each trial is run by a
//! [`TrialSequencer`]. All waiting happens on one
//! [`Timeline`](crate::timeline::Timeline), and every outside collaborator is
//! reached through [`SessionDevices`].

mod context;
mod devices;
mod error;
mod messages;
mod mic_check;
mod orchestrator;
mod phase;
mod recorder;
#[cfg(test)]
mod tests;
mod trial;

pub use context::SessionContext;
pub use devices::SessionDevices;
pub use error::{SessionError, SessionResult};
pub use orchestrator::{SessionOrchestrator, SessionReport};
pub use phase::SessionPhase;
pub use recorder::ExclusiveRecorder;
pub use trial::{Trial, TrialReport, TrialSequencer};
