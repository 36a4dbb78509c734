use super::context::SessionContext;
use super::devices::SessionDevices;
use super::error::{AdapterResultExt, SessionError, SessionResult};
use super::phase::SessionPhase;
use crate::annotation::RecognitionRequest;
use crate::audio::Clip;
use crate::clock::Clock;
use crate::config::ProtocolConfig;
use crate::events::SessionEvent;
use crate::log_debug_content;
use crate::presentation::Highlight;
use crate::recall::{run_trial_recall, TrialClose, TrialRecallOutcome};
use crate::timeline::{Timeline, Wait};
use crate::wordpool::NumberingIndex;
use std::path::PathBuf;

const PHASE: SessionPhase = SessionPhase::Trials;

/// One stimulus presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub word: String,
    pub index: usize,
    pub practice: bool,
}

#[derive(Debug, Clone)]
pub struct TrialReport {
    pub recall: TrialRecallOutcome,
    pub recording: PathBuf,
}

impl TrialReport {
    pub fn timed_out(&self) -> bool {
        self.recall.close == TrialClose::Ceiling
    }
}

/// Runs one study-and-recall trial from ISI to recognition hand-off.
pub struct TrialSequencer<'p> {
    protocol: &'p ProtocolConfig,
    numbering: &'p NumberingIndex,
    beep: &'p Clip,
}

impl<'p> TrialSequencer<'p> {
    pub fn new(protocol: &'p ProtocolConfig, numbering: &'p NumberingIndex, beep: &'p Clip) -> Self {
        Self {
            protocol,
            numbering,
            beep,
        }
    }

    pub fn run<C: Clock>(
        &self,
        timeline: &mut Timeline<C>,
        ctx: &mut SessionContext,
        devices: &mut SessionDevices<'_>,
        trial: &Trial,
    ) -> SessionResult<TrialReport> {
        let span = tracing::info_span!("trial", index = trial.index, practice = trial.practice);
        let _entered = span.enter();
        let index = trial.index;

        timeline.wait(Wait::Jitter(self.protocol.isi));

        log_debug_content(&format!("trial {index}: stimulus '{}'", trial.word));
        ctx.emit(
            timeline.wall_ms(),
            SessionEvent::Stimulus {
                word: trial.word.clone(),
                index,
                ltp_word_number: self.numbering.number(&trial.word),
                practice: trial.practice,
            },
        )?;
        devices
            .ui
            .display("stimulus display", &trial.word)
            .interface(PHASE)?;
        timeline.wait(Wait::Jitter(self.protocol.stimulus_display));
        ctx.emit(
            timeline.wall_ms(),
            SessionEvent::StimulusCleared {
                word: trial.word.clone(),
                index,
            },
        )?;
        devices.ui.clear().interface(PHASE)?;

        let recording = ctx.paths().response_wav(index, trial.practice);
        devices.recorder.start(PHASE, Some(index))?;
        let window = self.recall_window(timeline, ctx, devices, trial);
        let recall = devices
            .recorder
            .close_on_error(window, &recording, PHASE, Some(index))?;
        devices.recorder.stop(&recording, PHASE, Some(index))?;

        if recall.close == TrialClose::Ceiling && self.protocol.strict_liveness {
            return Err(SessionError::ProtocolLiveness {
                trial: index,
                elapsed: recall.closed_at - recall.started_at,
            });
        }

        ctx.emit(timeline.wall_ms(), SessionEvent::BeepStart {})?;
        devices
            .playback
            .play(self.beep)
            .resource(PHASE, Some(index))?;
        timeline.wait(Wait::Fixed(self.beep.length()));
        ctx.emit(timeline.wall_ms(), SessionEvent::BeepStop {})?;

        let ui = &mut *devices.ui;
        ui.too_soon_warning(false).interface(PHASE)?;
        ui.set_highlight(Highlight::Original).interface(PHASE)?;

        devices.pipeline.recognize(RecognitionRequest {
            block: index / self.protocol.block_size.max(1),
            index,
            recording: recording.clone(),
            annotation: ctx.paths().annotation(index, trial.practice),
        });

        Ok(TrialReport { recall, recording })
    }

    /// Recall start through recall stop, with the recorder already running.
    fn recall_window<C: Clock>(
        &self,
        timeline: &mut Timeline<C>,
        ctx: &mut SessionContext,
        devices: &mut SessionDevices<'_>,
        trial: &Trial,
    ) -> SessionResult<TrialRecallOutcome> {
        let index = trial.index;
        ctx.emit(
            timeline.wall_ms(),
            SessionEvent::RecallStart {
                word: trial.word.clone(),
                index,
            },
        )?;

        let mut warning = Ok(());
        let recall = {
            let ui = &mut *devices.ui;
            run_trial_recall(timeline, devices.voice, self.protocol.trial_recall, || {
                if warning.is_ok() {
                    warning = ui.too_soon_warning(true);
                }
            })
        };
        warning.interface(PHASE)?;

        let elapsed = recall.closed_at - recall.started_at;
        if recall.close == TrialClose::Ceiling {
            tracing::warn!(index, elapsed_ms = elapsed.as_millis() as u64, "recall timeout");
            ctx.count_recall_timeout();
            ctx.emit(
                timeline.wall_ms(),
                SessionEvent::RecallTimeout {
                    word: trial.word.clone(),
                    index,
                    elapsed_ms: elapsed.as_millis() as u64,
                },
            )?;
        }
        ctx.emit(
            timeline.wall_ms(),
            SessionEvent::RecallStop {
                word: trial.word.clone(),
                index,
                too_fast: recall.too_soon,
            },
        )?;
        Ok(recall)
    }
}
