//! The single logical timeline every protocol step runs on.
//!
//! Suspension points are explicit [`Wait`] values: a fixed delay, a jittered
//! delay drawn from the session RNG, or a polling loop that runs until a
//! predicate over the current instant reports done. Nothing else sleeps.

use crate::clock::Clock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Closed interval a jittered wait is drawn from, uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    pub lo: Duration,
    pub hi: Duration,
}

impl JitterRange {
    pub fn new(lo: Duration, hi: Duration) -> Self {
        if lo <= hi {
            Self { lo, hi }
        } else {
            Self { lo: hi, hi: lo }
        }
    }

    pub fn from_secs(lo: f64, hi: f64) -> Self {
        Self::new(Duration::from_secs_f64(lo), Duration::from_secs_f64(hi))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.lo == self.hi {
            return self.lo;
        }
        let secs = rng.random_range(self.lo.as_secs_f64()..=self.hi.as_secs_f64());
        Duration::from_secs_f64(secs).clamp(self.lo, self.hi)
    }

    pub fn contains(&self, duration: Duration) -> bool {
        (self.lo..=self.hi).contains(&duration)
    }
}

/// One suspension point on the timeline.
pub enum Wait<'a> {
    Fixed(Duration),
    Jitter(JitterRange),
    /// Evaluate `done(now)` every `poll`; the first `true` ends the wait at that
    /// instant. Polls are shortened to land exactly on `deadline`, and the wait
    /// never runs past it.
    Until {
        poll: Duration,
        deadline: Option<Duration>,
        done: &'a mut dyn FnMut(Duration) -> bool,
    },
}

/// Clock plus the seeded RNG the protocol draws jitter from.
pub struct Timeline<C> {
    clock: C,
    rng: StdRng,
    seed: u64,
}

impl<C: Clock> Timeline<C> {
    pub fn new(clock: C, seed: u64) -> Self {
        Self {
            clock,
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn wall_ms(&self) -> u64 {
        self.clock.wall_ms()
    }

    /// Seed recorded in the session log so jitter draws can be replayed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run one suspension point to completion and return how long it took.
    pub fn wait(&mut self, wait: Wait<'_>) -> Duration {
        let start = self.clock.now();
        match wait {
            Wait::Fixed(duration) => self.clock.sleep(duration),
            Wait::Jitter(range) => {
                let duration = range.sample(&mut self.rng);
                self.clock.sleep(duration);
            }
            Wait::Until {
                poll,
                deadline,
                done,
            } => {
                // A zero cadence would spin without advancing a virtual clock.
                let poll = poll.max(Duration::from_millis(1));
                loop {
                    let now = self.clock.now();
                    if done(now) {
                        break;
                    }
                    let step = match deadline {
                        Some(deadline) if now >= deadline => break,
                        Some(deadline) => poll.min(deadline - now),
                        None => poll,
                    };
                    self.clock.sleep(step);
                }
            }
        }
        self.clock.now().saturating_sub(start)
    }
}

/// Fresh seed for sessions launched without `--seed`.
pub fn random_seed() -> u64 {
    rand::rng().random()
}
