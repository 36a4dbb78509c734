use crate::clock::Clock;
use crate::timeline::{Timeline, Wait};
use crate::voice::VoiceActivity;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(1_000);
const MAIN: Duration = Duration::from_millis(2_000);
const TAIL: Duration = Duration::from_millis(500);

/// Timing for a single-word response window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialRecallParams {
    /// Opening period during which any speech counts as too soon.
    pub settle: Duration,
    /// Additional time after `settle` before the window may close.
    pub main: Duration,
    /// Silence required after the last speech onset.
    pub tail: Duration,
    /// Hard ceiling from recall start, reached only when no response completes.
    pub ceiling: Duration,
    pub poll: Duration,
}

impl TrialRecallParams {
    pub fn reference(poll: Duration, ceiling: Duration) -> Self {
        Self {
            settle: SETTLE,
            main: MAIN,
            tail: TAIL,
            ceiling: ceiling.max(Self::minimum_ceiling()),
            poll,
        }
    }

    /// Shortest ceiling that still lets a prompt responder finish normally.
    pub fn minimum_ceiling() -> Duration {
        SETTLE + MAIN + TAIL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    /// Phase A: speech here marks the trial too soon.
    Settling,
    /// Phase B: waiting for a completed response.
    Responding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialClose {
    Response,
    /// The ceiling ended the window without a completed response.
    Ceiling,
}

/// Two-phase response window for one trial.
#[derive(Debug, Clone)]
pub struct TrialRecall {
    start: Duration,
    params: TrialRecallParams,
    phase: TrialPhase,
    spoken: bool,
    too_soon: bool,
    last_speech: Duration,
}

impl TrialRecall {
    pub fn open(start: Duration, params: TrialRecallParams) -> Self {
        Self {
            start,
            params,
            phase: TrialPhase::Settling,
            spoken: false,
            too_soon: false,
            last_speech: start,
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn too_soon(&self) -> bool {
        self.too_soon
    }

    pub fn spoken(&self) -> bool {
        self.spoken
    }

    pub fn deadline(&self) -> Duration {
        self.start + self.params.ceiling
    }

    /// Feed one voice sample taken at `now`.
    pub fn observe(&mut self, now: Duration, speaking: bool) -> Option<TrialClose> {
        let now = now.max(self.start);
        let elapsed = now - self.start;
        if speaking {
            self.spoken = true;
            self.last_speech = now;
        }

        if elapsed < self.params.settle {
            if speaking {
                self.too_soon = true;
            }
            return None;
        }
        self.phase = TrialPhase::Responding;

        let responded = self.spoken
            && !speaking
            && elapsed >= self.params.settle + self.params.main
            && now - self.last_speech >= self.params.tail;
        if responded {
            return Some(TrialClose::Response);
        }
        if elapsed >= self.params.ceiling {
            return Some(TrialClose::Ceiling);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialRecallOutcome {
    pub started_at: Duration,
    pub closed_at: Duration,
    pub close: TrialClose,
    pub too_soon: bool,
    pub spoken: bool,
}

/// Poll `voice` every `params.poll` until the trial window closes.
///
/// `on_too_soon` fires once, at the first sample that marks the trial too soon,
/// so the caller can raise the warning while the window is still open.
pub fn run_trial_recall<C, V, F>(
    timeline: &mut Timeline<C>,
    voice: &V,
    params: TrialRecallParams,
    mut on_too_soon: F,
) -> TrialRecallOutcome
where
    C: Clock,
    V: VoiceActivity + ?Sized,
    F: FnMut(),
{
    let mut recall = TrialRecall::open(timeline.now(), params);
    let deadline = recall.deadline();
    let mut close = TrialClose::Ceiling;
    let mut closed_at = deadline;
    let mut done = |now: Duration| {
        let was_too_soon = recall.too_soon();
        let step = recall.observe(now, voice.is_speaking());
        if !was_too_soon && recall.too_soon() {
            on_too_soon();
        }
        match step {
            Some(reason) => {
                close = reason;
                closed_at = now;
                true
            }
            None => false,
        }
    };
    timeline.wait(Wait::Until {
        poll: params.poll,
        deadline: Some(deadline),
        done: &mut done,
    });
    TrialRecallOutcome {
        started_at: deadline - params.ceiling,
        closed_at,
        close,
        too_soon: recall.too_soon(),
        spoken: recall.spoken(),
    }
}
