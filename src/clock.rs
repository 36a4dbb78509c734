//! Time sources for the session timeline.
//!
//! Every wait in the protocol goes through a [`Clock`], so the same sequencing
//! code runs against the wall clock in a session and against a [`VirtualClock`]
//! in tests, where sleeping simply advances time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;

    /// Block the timeline for `duration`.
    fn sleep(&mut self, duration: Duration);

    /// Wall-clock time in milliseconds since the Unix epoch, for event records.
    fn wall_ms(&self) -> u64;
}

/// Real time: `Instant` for ordering, `SystemTime` for the audit log.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    fn wall_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Deterministic clock whose `sleep` advances time instantly.
///
/// Clones share the same time cell, so scripted collaborators (voice activity,
/// fake recorders) can read the timeline's current instant.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now_ns: Arc<AtomicU64>,
    epoch_ms: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::starting_at(1_700_000_000_000)
    }

    /// Start at an explicit wall-clock epoch (milliseconds).
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(0)),
            epoch_ms,
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }

    fn wall_ms(&self) -> u64 {
        self.epoch_ms + self.now().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances_on_sleep() {
        let mut clock = VirtualClock::starting_at(1_000);
        assert_eq!(clock.now(), Duration::ZERO);
        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(250));
        assert_eq!(clock.wall_ms(), 1_250);
    }

    #[test]
    fn virtual_clock_clones_share_time() {
        let mut clock = VirtualClock::new();
        let observer = clock.clone();
        clock.sleep(Duration::from_secs(3));
        assert_eq!(observer.now(), Duration::from_secs(3));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() >= before + Duration::from_millis(2));
        assert!(clock.wall_ms() > 0);
    }
}
