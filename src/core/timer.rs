//! Session timing.
//!
//! Duration is derived from wall-clock deltas read through a [`Clock`], never
//! from the number of tick callbacks delivered. A delayed scheduler therefore
//! cannot make a session look shorter than it really was.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonic millisecond timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-anchored monotonic clock.
///
/// Reads the UTC epoch once at construction and advances with `Instant`,
/// so timestamps are comparable with sensor timestamps but never go back.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    epoch_ms: u64,
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch_ms: Utc::now().timestamp_millis().max(0) as u64,
            anchor: Instant::now(),
        }
    }

    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.epoch_ms + self.anchor.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for tests and offline replay. Clones share time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move the clock to `ms`. Earlier values are ignored.
    pub fn set(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Lifecycle state of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    Paused,
    Sealed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Running => write!(f, "running"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Sealed => write!(f, "sealed"),
        }
    }
}

/// Tracks running time of one session.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    tick_interval_ms: u64,
    started_at_ms: u64,
    /// Running time from spans that have already ended
    banked_ms: u64,
    /// Start of the current running span
    resumed_at_ms: Option<u64>,
    ticks: u64,
    state: SessionState,
}

impl SessionTimer {
    /// Start a running timer at `now_ms`.
    pub fn start(now_ms: u64, tick_interval_ms: u64) -> Self {
        Self {
            tick_interval_ms: tick_interval_ms.max(1),
            started_at_ms: now_ms,
            banked_ms: 0,
            resumed_at_ms: Some(now_ms),
            ticks: 0,
            state: SessionState::Running,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Running time up to `now_ms` (frozen unless running).
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.resumed_at_ms {
            Some(resumed) => self.banked_ms + now_ms.saturating_sub(resumed),
            None => self.banked_ms,
        }
    }

    /// Whole seconds of running time up to `now_ms`.
    pub fn duration_seconds(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1000
    }

    /// Record one heartbeat. Returns `false` if the timer isn't running.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.ticks += 1;

        let lag = self.lagging_ticks(now_ms);
        if lag > 1 {
            tracing::warn!(
                delivered = self.ticks,
                behind = lag,
                "tick source is lagging wall clock; duration stays wall-clock based"
            );
        }
        true
    }

    /// How many ticks the tick source is behind wall-clock running time.
    pub fn lagging_ticks(&self, now_ms: u64) -> u64 {
        let expected = self.elapsed_ms(now_ms) / self.tick_interval_ms;
        expected.saturating_sub(self.ticks)
    }

    /// Freeze the timer. Returns `false` if it wasn't running.
    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.bank(now_ms);
        self.state = SessionState::Paused;
        true
    }

    /// Unfreeze a paused timer. Returns `false` if it wasn't paused.
    pub fn resume(&mut self, now_ms: u64) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        self.resumed_at_ms = Some(now_ms);
        self.state = SessionState::Running;
        true
    }

    /// Freeze permanently. Returns `false` if already sealed.
    pub fn seal(&mut self, now_ms: u64) -> bool {
        if self.state == SessionState::Sealed {
            return false;
        }
        self.bank(now_ms);
        self.state = SessionState::Sealed;
        true
    }

    fn bank(&mut self, now_ms: u64) {
        if let Some(resumed) = self.resumed_at_ms.take() {
            self.banked_ms += now_ms.saturating_sub(resumed);
        }
    }
}
