use super::messages::{MISSING_RECORDING_WARNING, SUBJECT_PROMPT};
use super::{
    ExclusiveRecorder, SessionDevices, SessionError, SessionOrchestrator, SessionPhase,
    SessionReport, SessionResult,
};
use crate::annotation::{AnnotationPipeline, LanguageModelRequest, RecognitionRequest, ToolOutcome};
use crate::audio::{AudioPlayback, AudioRecorder, Clip, TARGET_RATE};
use crate::clock::{Clock, VirtualClock};
use crate::config::ProtocolConfig;
use crate::events::{MemoryEventLog, ScriptedEvent, SessionEvent};
use crate::presentation::{Highlight, Key, MicCheckChoice, Operator, Presenter};
use crate::storage::DataLayout;
use crate::timeline::Timeline;
use crate::voice::VoiceActivity;
use crate::wordpool::{NumberingIndex, WordList};
use anyhow::{anyhow, bail, Result};
use std::collections::VecDeque;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SEED: u64 = 20_240_501;
const EXPERIMENT: &str = "VFFR";
const SUBJECT: &str = "LTP001";

const TRIAL_LABELS: [&str; 6] = [
    "stimulus",
    "stimulus cleared",
    "recall start",
    "recall stop",
    "beep start",
    "beep stop",
];

fn temp_root(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    env::temp_dir().join(format!("vffr_session_{label}_{nanos}"))
}

fn pool() -> Vec<String> {
    [
        "APPLE", "BREAD", "CHAIR", "DRUM", "EAGLE", "FENCE", "GRAPE", "HORSE", "IGLOO", "JACKET",
        "KETTLE", "LEMON", "MOUSE", "NAPKIN", "OCEAN", "PIANO", "QUILT", "RIVER", "SADDLE",
        "TABLE",
    ]
    .iter()
    .map(|word| word.to_string())
    .collect()
}

#[derive(Default)]
struct FakeUi {
    displays: Vec<(String, String)>,
    lines: VecDeque<String>,
    choices: VecDeque<MicCheckChoice>,
    warnings: Vec<bool>,
    highlights: Vec<Highlight>,
    banners: Vec<Option<String>>,
    waited_for: Vec<Vec<Key>>,
    fail_display: Option<&'static str>,
    fail_warning: bool,
}

impl FakeUi {
    fn shown(&self, text: &str) -> bool {
        self.displays.iter().any(|(_, shown)| shown == text)
    }
}

impl Presenter for FakeUi {
    fn display(&mut self, label: &str, text: &str) -> Result<()> {
        if self.fail_display == Some(label) {
            bail!("console gone");
        }
        self.displays.push((label.to_string(), text.to_string()));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_highlight(&mut self, highlight: Highlight) -> Result<()> {
        self.highlights.push(highlight);
        Ok(())
    }

    fn too_soon_warning(&mut self, visible: bool) -> Result<()> {
        if visible && self.fail_warning {
            bail!("console gone");
        }
        self.warnings.push(visible);
        Ok(())
    }

    fn set_banner(&mut self, banner: Option<&str>) -> Result<()> {
        self.banners.push(banner.map(str::to_string));
        Ok(())
    }
}

impl Operator for FakeUi {
    fn wait_for_keys(&mut self, keys: &[Key]) -> Result<()> {
        self.waited_for.push(keys.to_vec());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        self.lines
            .pop_front()
            .ok_or_else(|| anyhow!("operator input exhausted"))
    }

    fn mic_check_choice(&mut self) -> Result<MicCheckChoice> {
        Ok(self
            .choices
            .pop_front()
            .unwrap_or(MicCheckChoice::Continue))
    }
}

/// Writes a stub file on stop and shares its start instant with the voice.
struct FakeRecorder {
    clock: VirtualClock,
    started: Arc<Mutex<Option<Duration>>>,
    starts: usize,
    fail_start: Option<usize>,
    write_files: bool,
    stopped: Vec<PathBuf>,
}

impl AudioRecorder for FakeRecorder {
    fn start_recording(&mut self) -> Result<()> {
        self.starts += 1;
        if self.fail_start == Some(self.starts) {
            bail!("input device unplugged");
        }
        let mut started = self.started.lock().expect("started");
        assert!(started.is_none(), "recorder started twice");
        *started = Some(self.clock.now());
        Ok(())
    }

    fn stop_recording(&mut self, path: &Path) -> Result<()> {
        let open = self.started.lock().expect("started").take();
        assert!(open.is_some(), "recorder stopped while idle");
        if self.write_files {
            fs::write(path, b"RIFF")?;
        }
        self.stopped.push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Default)]
struct FakePlayback {
    plays: usize,
    loaded: Vec<PathBuf>,
}

impl AudioPlayback for FakePlayback {
    fn load_clip(&mut self, path: &Path) -> Result<Clip> {
        self.loaded.push(path.to_path_buf());
        Ok(Clip::new(vec![0.0; 160], TARGET_RATE))
    }

    fn play(&mut self, _clip: &Clip) -> Result<()> {
        self.plays += 1;
        Ok(())
    }
}

#[derive(Default)]
struct FakePipeline {
    models: Vec<LanguageModelRequest>,
    fail_model_block: Option<usize>,
    recognitions: Vec<RecognitionRequest>,
    fail_recognition_index: Option<usize>,
}

fn outcome(tool: &str, status: i32) -> ToolOutcome {
    ToolOutcome {
        tool: tool.to_string(),
        status: Some(status),
        stderr: String::new(),
    }
}

impl AnnotationPipeline for FakePipeline {
    fn build_language_model(&mut self, request: &LanguageModelRequest) -> Vec<ToolOutcome> {
        self.models.push(request.clone());
        if self.fail_model_block == Some(request.block) {
            return vec![outcome("kenlm", 1)];
        }
        vec![outcome("kenlm", 0), outcome("create_lm", 0)]
    }

    fn recognize(&mut self, request: RecognitionRequest) {
        self.recognitions.push(request);
    }

    fn finish(&mut self) -> Vec<(RecognitionRequest, ToolOutcome)> {
        self.recognitions
            .iter()
            .map(|request| {
                let status = if self.fail_recognition_index == Some(request.index) {
                    1
                } else {
                    0
                };
                (request.clone(), outcome("recognition", status))
            })
            .collect()
    }
}

/// Speaks during `[from, to)` measured from the start of each recording.
/// Sampling while nothing is recording fails the test.
struct ResponderVoice {
    clock: VirtualClock,
    started: Arc<Mutex<Option<Duration>>>,
    speech: Option<(Duration, Duration)>,
}

impl VoiceActivity for ResponderVoice {
    fn is_speaking(&self) -> bool {
        let started = *self.started.lock().expect("started");
        let start = started.expect("voice sampled outside a recording");
        let Some((from, to)) = self.speech else {
            return false;
        };
        (start + from..start + to).contains(&self.clock.now())
    }
}

struct Harness {
    clock: VirtualClock,
    root: PathBuf,
    protocol: ProtocolConfig,
    subject: Option<String>,
    seed: u64,
    events: MemoryEventLog,
    ui: FakeUi,
    recorder: FakeRecorder,
    playback: FakePlayback,
    pipeline: FakePipeline,
    voice: ResponderVoice,
    words: Vec<String>,
}

impl Harness {
    /// Subject answers 1.2 s to 1.8 s into every recording.
    fn new(label: &str) -> Self {
        let clock = VirtualClock::new();
        let started = Arc::new(Mutex::new(None));
        Self {
            root: temp_root(label),
            protocol: ProtocolConfig::reference(),
            subject: Some(SUBJECT.to_string()),
            seed: SEED,
            events: MemoryEventLog::new(),
            ui: FakeUi::default(),
            recorder: FakeRecorder {
                clock: clock.clone(),
                started: started.clone(),
                starts: 0,
                fail_start: None,
                write_files: true,
                stopped: Vec::new(),
            },
            playback: FakePlayback::default(),
            pipeline: FakePipeline::default(),
            voice: ResponderVoice {
                clock: clock.clone(),
                started,
                speech: Some((Duration::from_millis(1_200), Duration::from_millis(1_800))),
            },
            clock,
            words: Vec::new(),
        }
    }

    fn speaking(mut self, speech: Option<(u64, u64)>) -> Self {
        self.voice.speech =
            speech.map(|(from, to)| (Duration::from_millis(from), Duration::from_millis(to)));
        self
    }

    fn with_prior_sessions(self, count: u32) -> Self {
        for session in 0..count {
            fs::create_dir_all(self.session_dir(session)).expect("prior session dir");
        }
        self
    }

    fn session_dir(&self, session: u32) -> PathBuf {
        DataLayout::new(&self.root, EXPERIMENT).session_dir(SUBJECT, session)
    }

    fn run(&mut self) -> SessionResult<SessionReport> {
        let numbering = NumberingIndex::from_words(&pool()[..15]);
        let mut orchestrator = SessionOrchestrator::new(
            self.protocol.clone(),
            DataLayout::new(&self.root, EXPERIMENT),
            Timeline::new(self.clock.clone(), self.seed),
            WordList::new(pool()),
            numbering,
        )
        .with_subject(self.subject.clone())
        .with_event_sink(Box::new(self.events.clone()));
        let mut devices = SessionDevices::new(
            &mut self.ui,
            &mut self.recorder,
            &mut self.playback,
            &self.voice,
            &mut self.pipeline,
        );
        let result = orchestrator.run(&mut devices);
        self.words = orchestrator.words().words().to_vec();
        result
    }

    fn labels(&self) -> Vec<&'static str> {
        self.events.labels()
    }

    fn events(&self) -> Vec<ScriptedEvent> {
        self.events.events()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn expected_labels(trials: usize, before_trials: &[&'static str], after: &[&'static str]) -> Vec<&'static str> {
    let mut labels = vec![
        "session start",
        "microphone test start",
        "microphone test stop",
        "microphone test response",
    ];
    labels.extend_from_slice(before_trials);
    for _ in 0..trials {
        labels.extend_from_slice(&TRIAL_LABELS);
    }
    labels.extend_from_slice(after);
    labels.push("session end");
    labels
}

#[test]
fn first_session_runs_trials_without_free_recall() {
    let mut harness = Harness::new("first");
    let report = harness.run().expect("session completes");

    assert_eq!(report.session, 0);
    assert_eq!(report.subject, SUBJECT);
    assert_eq!(report.seed, SEED);
    assert_eq!(report.recall_timeouts, 0);
    assert_eq!(report.recognition_failures, 0);
    assert_eq!(harness.labels(), expected_labels(10, &[], &[]));
    assert!(harness.ui.shown("Yay, the session is over!"));
}

#[test]
fn stimulus_events_carry_word_numbers_in_presentation_order() {
    let mut harness = Harness::new("numbers");
    harness.run().expect("session completes");

    let numbering = NumberingIndex::from_words(&pool()[..15]);
    let stimuli: Vec<(String, usize, i64, bool)> = harness
        .events()
        .into_iter()
        .filter_map(|record| match record.event {
            SessionEvent::Stimulus {
                word,
                index,
                ltp_word_number,
                practice,
            } => Some((word, index, ltp_word_number, practice)),
            _ => None,
        })
        .collect();
    assert_eq!(stimuli.len(), 10);
    for (position, (word, index, number, practice)) in stimuli.iter().enumerate() {
        assert_eq!(*index, position);
        assert_eq!(word, &harness.words[position]);
        assert_eq!(*number, numbering.number(word));
        assert!(!practice);
    }
}

#[test]
fn trial_events_are_ordered_and_timestamps_never_decrease() {
    let mut harness = Harness::new("ordering");
    harness.run().expect("session completes");
    let events = harness.events();

    assert!(events.windows(2).all(|pair| pair[0].time <= pair[1].time));

    let stimulus_at = events
        .iter()
        .position(|record| matches!(record.event, SessionEvent::Stimulus { index: 4, .. }))
        .expect("stimulus 4");
    let labels: Vec<&str> = events[stimulus_at..stimulus_at + 6]
        .iter()
        .map(|record| record.event.label())
        .collect();
    assert_eq!(labels, TRIAL_LABELS);
    for record in &events[stimulus_at..stimulus_at + 4] {
        match &record.event {
            SessionEvent::Stimulus { index, .. }
            | SessionEvent::StimulusCleared { index, .. }
            | SessionEvent::RecallStart { index, .. }
            | SessionEvent::RecallStop { index, .. } => assert_eq!(*index, 4),
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn prompt_responder_closes_recall_after_three_seconds() {
    let mut harness = Harness::new("responder");
    harness.run().expect("session completes");
    let events = harness.events();

    let start = events
        .iter()
        .find(|record| matches!(record.event, SessionEvent::RecallStart { index: 0, .. }))
        .expect("recall start")
        .time;
    let stop = events
        .iter()
        .find(|record| matches!(record.event, SessionEvent::RecallStop { index: 0, .. }))
        .expect("recall stop");
    assert_eq!(stop.time - start, 3_000);
    assert!(matches!(
        stop.event,
        SessionEvent::RecallStop {
            too_fast: false,
            ..
        }
    ));
    assert!(harness.ui.warnings.iter().all(|visible| !visible));
}

#[test]
fn early_speech_marks_trial_too_fast_and_raises_warning() {
    let mut harness = Harness::new("too_soon").speaking(Some((300, 600)));
    harness.run().expect("session completes");

    let too_fast: Vec<bool> = harness
        .events()
        .into_iter()
        .filter_map(|record| match record.event {
            SessionEvent::RecallStop { too_fast, .. } => Some(too_fast),
            _ => None,
        })
        .collect();
    assert_eq!(too_fast, vec![true; 10]);
    assert_eq!(harness.ui.warnings.iter().filter(|visible| **visible).count(), 10);
    assert_eq!(harness.ui.warnings.last(), Some(&false));
}

#[test]
fn recordings_are_named_by_trial_index() {
    let mut harness = Harness::new("recordings");
    harness.run().expect("session completes");
    let dir = harness.session_dir(0);

    let responses: Vec<PathBuf> = harness.recorder.stopped[1..].to_vec();
    let expected: Vec<PathBuf> = (0..10).map(|index| dir.join(format!("{index}.wav"))).collect();
    assert_eq!(responses, expected);
    assert!(harness.recorder.stopped[0]
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("microphone_test_") && name.ends_with(".wav")));
    assert!(!harness.ui.shown(MISSING_RECORDING_WARNING));
}

#[test]
fn silent_subject_reaches_the_ceiling_every_trial() {
    let mut harness = Harness::new("silent").speaking(None);
    let report = harness.run().expect("lenient liveness completes");

    assert_eq!(report.recall_timeouts, 10);
    let timeouts: Vec<u64> = harness
        .events()
        .into_iter()
        .filter_map(|record| match record.event {
            SessionEvent::RecallTimeout { elapsed_ms, .. } => Some(elapsed_ms),
            _ => None,
        })
        .collect();
    assert_eq!(timeouts, vec![10_000; 10]);
    assert!(matches!(
        harness.events().last().map(|record| &record.event),
        Some(SessionEvent::SessionEnd {
            recall_timeouts: 10,
            recognition_failures: 0
        })
    ));
}

#[test]
fn strict_liveness_aborts_at_the_first_ceiling() {
    let mut harness = Harness::new("strict").speaking(None);
    harness.protocol.strict_liveness = true;
    let err = harness.run().expect_err("strict liveness aborts");

    match err {
        SessionError::ProtocolLiveness { trial, elapsed } => {
            assert_eq!(trial, 0);
            assert_eq!(elapsed, Duration::from_secs(10));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(
        harness.recorder.stopped.last(),
        Some(&harness.session_dir(0).join("0.wav"))
    );
    assert!(!harness.labels().contains(&"beep start"));
}

#[test]
fn fifth_session_adds_initial_free_recall() {
    let mut harness = Harness::new("ifr").with_prior_sessions(5);
    let report = harness.run().expect("session completes");

    assert_eq!(report.session, 5);
    assert_eq!(
        harness.labels(),
        expected_labels(10, &["initial recall start", "initial recall stop"], &[])
    );
    let events = harness.events();
    let start = events
        .iter()
        .find(|record| record.event.label() == "initial recall start")
        .expect("start");
    let stop = events
        .iter()
        .find(|record| record.event.label() == "initial recall stop")
        .expect("stop");
    assert_eq!(stop.time - start.time, 10_000);
    assert!(harness.session_dir(5).join("ifr.wav").exists());
    assert!(harness
        .ui
        .displays
        .contains(&("initial recall prompt".to_string(), "******".to_string())));
}

#[test]
fn tenth_session_adds_both_free_recalls() {
    let mut harness = Harness::new("ffr").with_prior_sessions(10);
    let report = harness.run().expect("session completes");

    assert_eq!(report.session, 10);
    assert_eq!(
        harness.labels(),
        expected_labels(
            10,
            &["initial recall start", "initial recall stop"],
            &["final recall start", "final recall stop"],
        )
    );
    let events = harness.events();
    let start = events
        .iter()
        .find(|record| record.event.label() == "final recall start")
        .expect("start");
    let stop = events
        .iter()
        .find(|record| record.event.label() == "final recall stop")
        .expect("stop");
    assert_eq!(stop.time - start.time, 20_000);
    assert!(harness.session_dir(10).join("ffr.wav").exists());
}

#[test]
fn existing_ordinals_are_skipped() {
    let mut harness = Harness::new("ordinal").with_prior_sessions(3);
    let report = harness.run().expect("session completes");
    assert_eq!(report.session, 3);
    assert!(harness.session_dir(3).join("0.wav").exists());
}

#[test]
fn operator_abort_stops_during_microphone_check() {
    let mut harness = Harness::new("abort");
    harness.ui.choices = VecDeque::from([MicCheckChoice::Retry, MicCheckChoice::Abort]);
    let err = harness.run().expect_err("operator aborted");

    assert!(err.is_abort());
    assert!(matches!(
        err,
        SessionError::Aborted {
            phase: SessionPhase::MicrophoneCheck
        }
    ));
    assert_eq!(
        harness.labels(),
        vec![
            "session start",
            "microphone test start",
            "microphone test stop",
            "microphone test response",
            "microphone test start",
            "microphone test stop",
            "microphone test response",
        ]
    );
    assert_eq!(harness.playback.loaded.len(), 2);
    assert_eq!(harness.ui.banners.last(), Some(&None));
}

#[test]
fn microphone_check_shows_red_then_green_then_original() {
    let mut harness = Harness::new("mic_colours");
    harness.run().expect("session completes");
    assert_eq!(
        &harness.ui.highlights[..3],
        &[Highlight::Red, Highlight::Green, Highlight::Original]
    );
    assert_eq!(harness.ui.waited_for[2], vec![Key::Space]);
}

#[test]
fn missing_test_recording_warns_operator() {
    let mut harness = Harness::new("missing_wav");
    harness.recorder.write_files = false;
    harness.run().expect("session completes");
    assert!(harness.ui.displays.contains(&(
        "press any key prompt".to_string(),
        MISSING_RECORDING_WARNING.to_string()
    )));
}

#[test]
fn recorder_failure_reports_phase_and_trial() {
    let mut harness = Harness::new("recorder_fail");
    harness.recorder.fail_start = Some(3);
    let err = harness.run().expect_err("recorder failure aborts");
    match err {
        SessionError::Resource { phase, trial, .. } => {
            assert_eq!(phase, SessionPhase::Trials);
            assert_eq!(trial, Some(1));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn language_model_failure_stops_before_first_trial() {
    let mut harness = Harness::new("lm_fail");
    harness.pipeline.fail_model_block = Some(2);
    let err = harness.run().expect_err("model build failure aborts");

    match err {
        SessionError::ExternalTool {
            phase,
            block,
            tool,
            status,
            ..
        } => {
            assert_eq!(phase, SessionPhase::Trials);
            assert_eq!(block, 2);
            assert_eq!(tool, "kenlm");
            assert_eq!(status, Some(1));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(harness.pipeline.models.len(), 3);
    assert!(!harness.labels().contains(&"stimulus"));
}

#[test]
fn block_lists_follow_block_size() {
    let mut harness = Harness::new("blocks");
    harness.protocol.block_size = 3;
    harness.run().expect("session completes");
    let dir = harness.session_dir(0);

    assert_eq!(harness.pipeline.models.len(), 4);
    let first = fs::read_to_string(dir.join("0.lst")).expect("0.lst");
    assert_eq!(first, harness.words[..3].join("\n"));
    let last = fs::read_to_string(dir.join("3.lst")).expect("3.lst");
    assert_eq!(last, harness.words[9]);
    assert_eq!(harness.pipeline.models[1].arpa, dir.join("1.arpa"));
    assert_eq!(harness.pipeline.models[1].prefix, dir.join("1"));

    let blocks: Vec<usize> = harness
        .pipeline
        .recognitions
        .iter()
        .map(|request| request.block)
        .collect();
    assert_eq!(blocks, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3]);
    assert_eq!(harness.pipeline.recognitions[7].annotation, dir.join("7.ann"));
}

#[test]
fn recognition_failures_are_reported_at_the_end() {
    let mut harness = Harness::new("recognition_fail");
    harness.pipeline.fail_recognition_index = Some(3);
    let report = harness.run().expect("session completes");
    assert_eq!(report.recognition_failures, 1);
    assert_eq!(harness.pipeline.recognitions.len(), 10);
}

#[test]
fn subject_prompt_loops_until_valid_id() {
    let mut harness = Harness::new("prompt");
    harness.subject = None;
    harness.ui.lines = VecDeque::from(["bob".to_string(), "LTP12".to_string(), SUBJECT.to_string()]);
    let report = harness.run().expect("session completes");

    assert_eq!(report.subject, SUBJECT);
    assert!(harness.ui.lines.is_empty());
    assert_eq!(
        harness.ui.displays[0],
        ("subject name prompt".to_string(), SUBJECT_PROMPT.to_string())
    );
}

#[test]
fn preset_invalid_subject_is_a_configuration_error() {
    let mut harness = Harness::new("bad_subject");
    harness.subject = Some("bob".to_string());
    let err = harness.run().expect_err("rejected");
    assert!(matches!(err, SessionError::Configuration(_)));
    assert!(harness.labels().is_empty());
}

#[test]
fn short_word_pool_is_rejected() {
    let mut harness = Harness::new("short_pool");
    harness.protocol.trials = 25;
    let err = harness.run().expect_err("not enough words");
    assert!(matches!(err, SessionError::Configuration(_)));
}

#[test]
fn same_seed_replays_word_order_and_timing() {
    let run = |label: &str| {
        let mut harness = Harness::new(label);
        harness.run().expect("session completes");
        let timing: Vec<(u64, &'static str)> = harness
            .events()
            .iter()
            .map(|record| (record.time, record.event.label()))
            .collect();
        (harness.words.clone(), timing)
    };
    assert_eq!(run("replay_a"), run("replay_b"));
}

#[test]
fn phases_skip_free_recall_for_early_sessions() {
    let protocol = ProtocolConfig::reference();
    let walk = |session| {
        let mut phase = SessionPhase::NotStarted;
        let mut seen = Vec::new();
        while phase != SessionPhase::Complete {
            phase = phase.next(session, &protocol);
            seen.push(phase);
        }
        seen
    };
    use SessionPhase::*;
    assert_eq!(walk(0), vec![Instructions, MicrophoneCheck, Trials, Complete]);
    assert_eq!(
        walk(5),
        vec![Instructions, MicrophoneCheck, InitialRecall, Trials, Complete]
    );
    assert_eq!(
        walk(10),
        vec![Instructions, MicrophoneCheck, InitialRecall, Trials, FinalRecall, Complete]
    );
    assert_eq!(Complete.next(10, &protocol), Complete);
}

#[test]
fn exclusive_recorder_rejects_out_of_order_calls() {
    let clock = VirtualClock::new();
    let mut inner = FakeRecorder {
        clock,
        started: Arc::new(Mutex::new(None)),
        starts: 0,
        fail_start: None,
        write_files: false,
        stopped: Vec::new(),
    };
    let mut recorder = ExclusiveRecorder::new(&mut inner);
    let path = Path::new("unused.wav");

    assert!(recorder
        .stop(path, SessionPhase::Trials, Some(0))
        .is_err());
    recorder.start(SessionPhase::Trials, Some(0)).expect("start");
    assert!(recorder.is_recording());
    let err = recorder
        .start(SessionPhase::Trials, Some(0))
        .expect_err("second start");
    assert!(matches!(err, SessionError::Resource { trial: Some(0), .. }));
    recorder
        .stop(path, SessionPhase::Trials, Some(0))
        .expect("stop");
    assert!(!recorder.is_recording());
    assert_eq!(inner.starts, 1);
}

#[test]
fn console_failure_mid_trial_still_saves_the_response() {
    let mut harness = Harness::new("warning_fail").speaking(Some((200, 1_800)));
    harness.ui.fail_warning = true;
    let err = harness.run().expect_err("console failure aborts");

    match err {
        SessionError::Interface { phase, .. } => assert_eq!(phase, SessionPhase::Trials),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(
        harness.recorder.stopped.last(),
        Some(&harness.session_dir(0).join("0.wav"))
    );
    assert!(harness.session_dir(0).join("0.wav").exists());
    assert!(harness.recorder.started.lock().expect("started").is_none());
    assert!(!harness.labels().contains(&"recall stop"));
}

#[test]
fn console_failure_during_free_recall_still_saves_ifr() {
    let mut harness = Harness::new("ifr_display_fail").with_prior_sessions(5);
    harness.ui.fail_display = Some("initial recall prompt");
    let err = harness.run().expect_err("console failure aborts");

    match err {
        SessionError::Interface { phase, .. } => {
            assert_eq!(phase, SessionPhase::InitialRecall)
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(harness.session_dir(5).join("ifr.wav").exists());
    assert!(harness.recorder.started.lock().expect("started").is_none());
}

#[test]
fn close_on_error_passes_success_through_untouched() {
    let mut inner = FakeRecorder {
        clock: VirtualClock::new(),
        started: Arc::new(Mutex::new(None)),
        starts: 0,
        fail_start: None,
        write_files: false,
        stopped: Vec::new(),
    };
    let mut recorder = ExclusiveRecorder::new(&mut inner);
    let path = Path::new("kept.wav");
    recorder.start(SessionPhase::Trials, Some(2)).expect("start");

    let value = recorder
        .close_on_error(Ok(7), path, SessionPhase::Trials, Some(2))
        .expect("ok");
    assert_eq!(value, 7);
    assert!(recorder.is_recording());

    let failed: SessionResult<()> = Err(SessionError::Aborted {
        phase: SessionPhase::Trials,
    });
    let err = recorder
        .close_on_error(failed, path, SessionPhase::Trials, Some(2))
        .expect_err("error kept");
    assert!(err.is_abort());
    assert!(!recorder.is_recording());
    assert_eq!(inner.stopped, vec![path.to_path_buf()]);
}

#[test]
fn errors_name_phase_and_trial() {
    let err = SessionError::Resource {
        phase: SessionPhase::Trials,
        trial: Some(7),
        source: "device gone".into(),
    };
    assert_eq!(
        err.to_string(),
        "audio failure during trials (trial 7): device gone"
    );
    let err = SessionError::ExternalTool {
        phase: SessionPhase::Trials,
        block: 2,
        tool: "kenlm".to_string(),
        status: Some(1),
        stderr: "missing arpa".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "kenlm for block 2 exited with status 1 during trials: missing arpa"
    );
}
