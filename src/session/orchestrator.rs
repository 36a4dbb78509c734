use super::context::SessionContext;
use super::devices::SessionDevices;
use super::error::{AdapterResultExt, IoResultExt, SessionError, SessionResult};
use super::messages::{
    press_keys, END_MESSAGE, FIRST_INSTRUCTIONS, FIRST_RECALL_INSTRUCTIONS, FREE_RECALL_PROMPT,
    SECOND_INSTRUCTIONS, SECOND_RECALL_INSTRUCTIONS, SUBJECT_PROMPT,
};
use super::mic_check::run_microphone_check;
use super::phase::SessionPhase;
use super::trial::{Trial, TrialSequencer};
use crate::annotation::LanguageModelRequest;
use crate::audio::{Clip, TARGET_RATE};
use crate::clock::Clock;
use crate::config::{is_valid_subject, ProtocolConfig};
use crate::events::{EventSink, JsonlEventLog, SessionEvent};
use crate::presentation::Key;
use crate::recall::{run_recall_window, RecallOutcome, RecallWindowParams};
use crate::storage::{write_lst, DataLayout};
use crate::timeline::{Timeline, Wait};
use crate::wordpool::{NumberingIndex, WordList};
use crate::{log_debug, log_timing};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const SUBJECT_PROMPT_HOLD: Duration = Duration::from_secs(3);
const BEEP_FREQUENCY_HZ: f32 = 400.0;

/// What a completed session leaves behind besides its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub subject: String,
    pub session: u32,
    pub seed: u64,
    pub trials: usize,
    /// Trials whose response window closed at the ceiling.
    pub recall_timeouts: usize,
    /// Recognition jobs that did not exit cleanly.
    pub recognition_failures: usize,
}

#[derive(Debug, Clone, Copy)]
enum FreeRecall {
    Initial,
    Final,
}

impl FreeRecall {
    fn phase(self) -> SessionPhase {
        match self {
            FreeRecall::Initial => SessionPhase::InitialRecall,
            FreeRecall::Final => SessionPhase::FinalRecall,
        }
    }

    fn prompt_label(self) -> &'static str {
        match self {
            FreeRecall::Initial => "initial recall prompt",
            FreeRecall::Final => "final recall prompt",
        }
    }

    fn start_event(self) -> SessionEvent {
        match self {
            FreeRecall::Initial => SessionEvent::InitialRecallStart {},
            FreeRecall::Final => SessionEvent::FinalRecallStart {},
        }
    }

    fn stop_event(self) -> SessionEvent {
        match self {
            FreeRecall::Initial => SessionEvent::InitialRecallStop {},
            FreeRecall::Final => SessionEvent::FinalRecallStop {},
        }
    }
}

/// Drives one subject session from the subject prompt to the end message.
pub struct SessionOrchestrator<C> {
    protocol: ProtocolConfig,
    layout: DataLayout,
    timeline: Timeline<C>,
    words: WordList,
    numbering: NumberingIndex,
    subject: Option<String>,
    event_sink: Option<Box<dyn EventSink>>,
    beep: Clip,
}

impl<C: Clock> SessionOrchestrator<C> {
    /// `words` is shuffled here with the timeline's seeded RNG, so the seed in
    /// the session log reproduces both word order and jitter.
    pub fn new(
        protocol: ProtocolConfig,
        layout: DataLayout,
        mut timeline: Timeline<C>,
        mut words: WordList,
        numbering: NumberingIndex,
    ) -> Self {
        words.shuffle(timeline.rng());
        let beep = Clip::tone(BEEP_FREQUENCY_HZ, protocol.beep_length, TARGET_RATE);
        Self {
            protocol,
            layout,
            timeline,
            words,
            numbering,
            subject: None,
            event_sink: None,
            beep,
        }
    }

    /// Skip the interactive prompt and use `subject`.
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    /// Send events to `sink` instead of `session.jsonl` in the session directory.
    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn timeline(&self) -> &Timeline<C> {
        &self.timeline
    }

    /// Stimulus words in presentation order.
    pub fn words(&self) -> &WordList {
        &self.words
    }

    pub fn run(&mut self, devices: &mut SessionDevices<'_>) -> SessionResult<SessionReport> {
        let started = Instant::now();
        if self.words.len() < self.protocol.trials {
            return Err(SessionError::Configuration(format!(
                "word pool has {} words but the session needs {}",
                self.words.len(),
                self.protocol.trials
            )));
        }

        let subject = self.prompt_subject(devices)?;
        let paths = self
            .layout
            .claim_session(&subject)
            .storage(SessionPhase::NotStarted, "claiming a session directory")?;
        let span = tracing::info_span!("session", session = paths.session());
        let _entered = span.enter();
        tracing::info!(dir = %paths.dir().display(), seed = self.timeline.seed(), "session claimed");
        log_debug(&format!("session {} claimed", paths.session()));

        let events = match self.event_sink.take() {
            Some(sink) => sink,
            None => Box::new(
                JsonlEventLog::create(&paths.event_log())
                    .storage(SessionPhase::NotStarted, "opening the event log")?,
            ),
        };
        let mut ctx = SessionContext::new(subject, paths, events);
        ctx.emit(
            self.timeline.wall_ms(),
            SessionEvent::SessionStart {
                subject: ctx.subject().to_string(),
                session: ctx.session(),
                seed: self.timeline.seed(),
            },
        )?;

        loop {
            match ctx.advance(&self.protocol) {
                SessionPhase::Instructions => self.show_instructions(devices)?,
                SessionPhase::MicrophoneCheck => {
                    run_microphone_check(
                        &mut self.timeline,
                        &mut ctx,
                        devices,
                        &self.protocol,
                        &self.beep,
                    )?;
                }
                SessionPhase::InitialRecall => {
                    let phase = SessionPhase::InitialRecall;
                    press_keys(devices.ui, phase, FIRST_RECALL_INSTRUCTIONS, &[Key::Return])?;
                    press_keys(devices.ui, phase, SECOND_RECALL_INSTRUCTIONS, &[Key::Return])?;
                    self.free_recall(&mut ctx, devices, FreeRecall::Initial)?;
                }
                SessionPhase::Trials => {
                    self.build_language_models(&ctx, devices)?;
                    self.run_trials(&mut ctx, devices)?;
                }
                SessionPhase::FinalRecall => {
                    self.free_recall(&mut ctx, devices, FreeRecall::Final)?;
                }
                SessionPhase::Complete | SessionPhase::NotStarted => break,
            }
        }

        let recognition_failures = devices
            .pipeline
            .finish()
            .into_iter()
            .filter(|(request, outcome)| {
                if !outcome.success() {
                    tracing::warn!(
                        index = request.index,
                        status = ?outcome.status,
                        "recognition failed"
                    );
                }
                !outcome.success()
            })
            .count();

        ctx.emit(
            self.timeline.wall_ms(),
            SessionEvent::SessionEnd {
                recall_timeouts: ctx.recall_timeouts(),
                recognition_failures,
            },
        )?;
        devices
            .ui
            .display("end message", END_MESSAGE)
            .interface(SessionPhase::Complete)?;
        log_timing("session", started.elapsed().as_millis());

        Ok(SessionReport {
            subject: ctx.subject().to_string(),
            session: ctx.session(),
            seed: self.timeline.seed(),
            trials: self.protocol.trials,
            recall_timeouts: ctx.recall_timeouts(),
            recognition_failures,
        })
    }

    fn prompt_subject(&mut self, devices: &mut SessionDevices<'_>) -> SessionResult<String> {
        let phase = SessionPhase::NotStarted;
        if let Some(subject) = &self.subject {
            if !is_valid_subject(subject) {
                return Err(SessionError::Configuration(format!(
                    "invalid subject id '{subject}'"
                )));
            }
            return Ok(subject.clone());
        }

        devices
            .ui
            .display("subject name prompt", SUBJECT_PROMPT)
            .interface(phase)?;
        self.timeline.wait(Wait::Fixed(SUBJECT_PROMPT_HOLD));
        devices.ui.clear().interface(phase)?;
        loop {
            let candidate = devices.ui.read_line().interface(phase)?;
            if is_valid_subject(&candidate) {
                return Ok(candidate);
            }
            log_debug("subject prompt: rejected malformed id");
        }
    }

    fn show_instructions(&mut self, devices: &mut SessionDevices<'_>) -> SessionResult<()> {
        let phase = SessionPhase::Instructions;
        press_keys(devices.ui, phase, FIRST_INSTRUCTIONS, &[Key::Return])?;
        press_keys(devices.ui, phase, SECOND_INSTRUCTIONS, &[Key::Return])
    }

    fn free_recall(
        &mut self,
        ctx: &mut SessionContext,
        devices: &mut SessionDevices<'_>,
        kind: FreeRecall,
    ) -> SessionResult<RecallOutcome> {
        let phase = kind.phase();
        let (params, path): (RecallWindowParams, PathBuf) = match kind {
            FreeRecall::Initial => (self.protocol.initial_recall, ctx.paths().initial_recall_wav()),
            FreeRecall::Final => (self.protocol.final_recall, ctx.paths().final_recall_wav()),
        };

        devices.recorder.start(phase, None)?;
        let window = self.free_recall_window(ctx, devices, kind, params);
        let outcome = devices.recorder.close_on_error(window, &path, phase, None)?;
        devices.recorder.stop(&path, phase, None)?;
        Ok(outcome)
    }

    fn free_recall_window(
        &mut self,
        ctx: &mut SessionContext,
        devices: &mut SessionDevices<'_>,
        kind: FreeRecall,
        params: RecallWindowParams,
    ) -> SessionResult<RecallOutcome> {
        let phase = kind.phase();
        ctx.emit(self.timeline.wall_ms(), kind.start_event())?;
        devices
            .ui
            .display(kind.prompt_label(), FREE_RECALL_PROMPT)
            .interface(phase)?;

        let outcome = run_recall_window(&mut self.timeline, devices.voice, params);
        tracing::info!(
            phase = phase.label(),
            length_ms = outcome.length().as_millis() as u64,
            reason = outcome.reason.label(),
            "free recall closed"
        );

        devices.ui.clear().interface(phase)?;
        ctx.emit(self.timeline.wall_ms(), kind.stop_event())?;
        Ok(outcome)
    }

    /// Write each block's `.lst` and build its language model, waiting for
    /// every script before the first trial.
    fn build_language_models(
        &mut self,
        ctx: &SessionContext,
        devices: &mut SessionDevices<'_>,
    ) -> SessionResult<()> {
        let phase = SessionPhase::Trials;
        let blocks = self
            .words
            .blocks(self.protocol.trials, self.protocol.block_size);
        for (block, words) in blocks.into_iter().enumerate() {
            let paths = ctx.paths();
            let list = paths.block_list(block);
            write_lst(&list, words).storage(phase, format!("writing {}", list.display()))?;
            let request = LanguageModelRequest {
                block,
                list,
                prefix: paths.block_prefix(block),
                arpa: paths.block_arpa(block),
            };
            let started = Instant::now();
            for outcome in devices.pipeline.build_language_model(&request) {
                if !outcome.success() {
                    return Err(SessionError::ExternalTool {
                        phase,
                        block,
                        tool: outcome.tool,
                        status: outcome.status,
                        stderr: outcome.stderr,
                    });
                }
            }
            log_timing("language_model", started.elapsed().as_millis());
        }
        Ok(())
    }

    fn run_trials(
        &mut self,
        ctx: &mut SessionContext,
        devices: &mut SessionDevices<'_>,
    ) -> SessionResult<()> {
        let sequencer = TrialSequencer::new(&self.protocol, &self.numbering, &self.beep);
        for (index, word) in self.words.words()[..self.protocol.trials].iter().enumerate() {
            let trial = Trial {
                word: word.clone(),
                index,
                practice: false,
            };
            sequencer.run(&mut self.timeline, ctx, devices, &trial)?;
        }
        Ok(())
    }
}
