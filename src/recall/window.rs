use crate::clock::Clock;
use crate::timeline::{Timeline, Wait};
use crate::voice::VoiceActivity;
use std::time::Duration;

/// Bounds for a free-recall window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecallWindowParams {
    /// The window never closes before this much time has passed.
    pub min: Duration,
    /// Hard ceiling; speech in progress is cut off here.
    pub max: Duration,
    /// Silence since the last detected speech required to close after `min`.
    pub silence: Duration,
    /// Voice sampling cadence.
    pub poll: Duration,
}

impl RecallWindowParams {
    pub fn new(min: Duration, max: Duration, silence: Duration, poll: Duration) -> Self {
        Self {
            min: min.min(max),
            max,
            silence,
            poll,
        }
    }

    pub fn initial_free_recall(poll: Duration) -> Self {
        Self::new(
            Duration::from_secs(10),
            Duration::from_secs(40),
            Duration::from_secs(5),
            poll,
        )
    }

    pub fn final_free_recall(poll: Duration) -> Self {
        Self::new(
            Duration::from_secs(20),
            Duration::from_secs(40),
            Duration::from_secs(5),
            poll,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClose {
    /// Minimum elapsed and the silence timeout ran out.
    Silence,
    /// The maximum was reached.
    Ceiling,
}

impl WindowClose {
    pub fn label(self) -> &'static str {
        match self {
            WindowClose::Silence => "silence",
            WindowClose::Ceiling => "ceiling",
        }
    }
}

/// Adaptive-timeout state for one free-recall period.
#[derive(Debug, Clone)]
pub struct RecallWindow {
    start: Duration,
    last_speech: Duration,
    speech_seen: bool,
    params: RecallWindowParams,
}

impl RecallWindow {
    pub fn open(start: Duration, params: RecallWindowParams) -> Self {
        Self {
            start,
            last_speech: start,
            speech_seen: false,
            params,
        }
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn last_speech(&self) -> Duration {
        self.last_speech
    }

    pub fn speech_seen(&self) -> bool {
        self.speech_seen
    }

    pub fn deadline(&self) -> Duration {
        self.start + self.params.max
    }

    /// Feed one voice sample taken at `now`; returns why the window closed, if it did.
    pub fn observe(&mut self, now: Duration, speaking: bool) -> Option<WindowClose> {
        let now = now.max(self.start);
        if speaking {
            self.last_speech = now;
            self.speech_seen = true;
        }
        let elapsed = now - self.start;
        if elapsed >= self.params.max {
            return Some(WindowClose::Ceiling);
        }
        if elapsed >= self.params.min && now - self.last_speech >= self.params.silence {
            return Some(WindowClose::Silence);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecallOutcome {
    pub started_at: Duration,
    pub closed_at: Duration,
    pub reason: WindowClose,
    pub speech_detected: bool,
}

impl RecallOutcome {
    pub fn length(&self) -> Duration {
        self.closed_at - self.started_at
    }
}

/// Poll `voice` until the window closes. Starts at the timeline's current instant.
pub fn run_recall_window<C, V>(
    timeline: &mut Timeline<C>,
    voice: &V,
    params: RecallWindowParams,
) -> RecallOutcome
where
    C: Clock,
    V: VoiceActivity + ?Sized,
{
    let mut window = RecallWindow::open(timeline.now(), params);
    let deadline = window.deadline();
    let mut reason = WindowClose::Ceiling;
    let mut closed_at = deadline;
    let mut done = |now: Duration| match window.observe(now, voice.is_speaking()) {
        Some(close) => {
            reason = close;
            closed_at = now;
            true
        }
        None => false,
    };
    timeline.wait(Wait::Until {
        poll: params.poll,
        deadline: Some(deadline),
        done: &mut done,
    });
    RecallOutcome {
        started_at: window.start(),
        closed_at,
        reason,
        speech_detected: window.speech_seen(),
    }
}
