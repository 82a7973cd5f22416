//! Tracking sessions.
//!
//! A [`TrackingSession`] is the caller-owned handle for one maintenance
//! attempt. It ties together the movement filter, the trajectory integrator
//! and the session timer, and is sealed exactly once.

use crate::collector::types::{Axis, Sample};
use crate::core::classifier::{ConfidenceEstimator, ConfidenceLabel, ZoneClassifier, ZoneLabel};
use crate::core::filter::{SampleFilter, TrackingMode};
use crate::core::timer::{SessionState, SessionTimer, SharedClock};
use crate::core::trajectory::{
    PositionAccumulator, TrajectoryIntegrator, TrajectoryPoint, TrajectoryStats,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Engine parameters for one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// L1 movement threshold (strictly exceeded to accept a sample)
    pub filter_threshold: f64,
    /// Nominal heartbeat interval
    pub tick_interval_ms: u32,
}

impl SessionConfig {
    pub fn for_mode(mode: TrackingMode) -> Self {
        Self {
            filter_threshold: mode.threshold(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.filter_threshold.is_finite() || self.filter_threshold < 0.0 {
            return Err(SessionError::InvalidConfig(format!(
                "filter threshold must be a finite, non-negative number (got {})",
                self.filter_threshold
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "tick interval must be at least 1 ms".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter_threshold: TrackingMode::default().threshold(),
            tick_interval_ms: 1_000,
        }
    }
}

/// Errors reported by session operations. None of them end the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Invalid sample: {axis} component is {value}")]
    InvalidSample { axis: Axis, value: f64 },
    #[error("Session is not running (state: {state})")]
    SessionNotRunning { state: SessionState },
    #[error("Out-of-order sample at {timestamp_ms} ms (last processed at {last_ms} ms)")]
    OutOfOrderSample { timestamp_ms: u64, last_ms: u64 },
    #[error("Invalid session config: {0}")]
    InvalidConfig(String),
}

/// Movement status as shown to the technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementState {
    Idle,
    Moving,
    Stationary,
}

/// Result of feeding one valid sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// The sample was significant movement and produced this point
    Accepted(TrajectoryPoint),
    /// The delta was at or under the threshold
    Stationary,
}

impl SampleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SampleOutcome::Accepted(_))
    }

    pub fn point(&self) -> Option<&TrajectoryPoint> {
        match self {
            SampleOutcome::Accepted(p) => Some(p),
            SampleOutcome::Stationary => None,
        }
    }

    pub fn movement_state(&self) -> MovementState {
        match self {
            SampleOutcome::Accepted(_) => MovementState::Moving,
            SampleOutcome::Stationary => MovementState::Stationary,
        }
    }
}

/// Per-session sample bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub received: u64,
    pub accepted: u64,
    pub stationary: u64,
    pub invalid: u64,
    pub out_of_order: u64,
}

/// Immutable outcome of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedSession {
    pub session_id: Uuid,
    pub filter_threshold: f64,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub duration_seconds: u64,
    /// Sum of timestamp gaps that ended in a stationary sample
    pub stationary_ms: u64,
    pub trajectory: Vec<TrajectoryPoint>,
    pub final_position: PositionAccumulator,
    pub counts: SampleCounts,
    /// Heartbeats delivered while running
    #[serde(default)]
    pub ticks: u64,
}

impl SealedSession {
    /// Number of accepted samples (trajectory points).
    pub fn sample_count(&self) -> usize {
        self.trajectory.len()
    }

    pub fn stationary_seconds(&self) -> u64 {
        self.stationary_ms / 1000
    }

    pub fn classify(&self, classifier: &ZoneClassifier) -> ZoneLabel {
        classifier.classify(&self.trajectory, self.duration_seconds)
    }

    pub fn confidence(&self, estimator: &ConfidenceEstimator) -> ConfidenceLabel {
        estimator.estimate(self.sample_count())
    }

    pub fn stats(&self) -> TrajectoryStats {
        TrajectoryStats::compute(&self.trajectory)
    }
}

/// Caller-owned state of one running maintenance session.
pub struct TrackingSession {
    id: Uuid,
    config: SessionConfig,
    filter: SampleFilter,
    integrator: TrajectoryIntegrator,
    previous: Sample,
    last_sample_ms: Option<u64>,
    timer: SessionTimer,
    clock: SharedClock,
    counts: SampleCounts,
    stationary_ms: u64,
    movement: MovementState,
    sealed: Option<SealedSession>,
}

/// Begin a new session. The accumulator and previous sample start at zero.
pub fn start_session(
    config: SessionConfig,
    clock: SharedClock,
) -> Result<TrackingSession, SessionError> {
    config.validate()?;

    let now = clock.now_ms();
    let session = TrackingSession {
        id: Uuid::new_v4(),
        config,
        filter: SampleFilter::new(config.filter_threshold),
        integrator: TrajectoryIntegrator::new(),
        previous: Sample::ZERO,
        last_sample_ms: None,
        timer: SessionTimer::start(now, u64::from(config.tick_interval_ms)),
        clock,
        counts: SampleCounts::default(),
        stationary_ms: 0,
        movement: MovementState::Idle,
        sealed: None,
    };

    tracing::info!(
        session_id = %session.id,
        threshold = config.filter_threshold,
        tick_interval_ms = config.tick_interval_ms,
        "tracking session started"
    );
    Ok(session)
}

impl TrackingSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.timer.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn started_at_ms(&self) -> u64 {
        self.timer.started_at_ms()
    }

    pub fn trajectory(&self) -> &[TrajectoryPoint] {
        self.integrator.points()
    }

    pub fn accumulator(&self) -> PositionAccumulator {
        self.integrator.accumulator()
    }

    pub fn counts(&self) -> SampleCounts {
        self.counts
    }

    pub fn movement_state(&self) -> MovementState {
        self.movement
    }

    pub fn ticks(&self) -> u64 {
        self.timer.ticks()
    }

    /// Current running duration, read from the clock.
    pub fn duration_seconds(&self) -> u64 {
        match &self.sealed {
            Some(sealed) => sealed.duration_seconds,
            None => self.timer.duration_seconds(self.clock.now_ms()),
        }
    }

    /// Feed one raw reading.
    ///
    /// Validation happens before any mutation, so a rejected sample leaves
    /// the accumulator, trajectory and previous reading untouched.
    pub fn push_sample(
        &mut self,
        sample: Sample,
        timestamp_ms: u64,
    ) -> Result<SampleOutcome, SessionError> {
        let state = self.state();
        if state != SessionState::Running {
            return Err(SessionError::SessionNotRunning { state });
        }
        self.counts.received += 1;

        if let Some((axis, value)) = sample.non_finite_axis() {
            self.counts.invalid += 1;
            tracing::debug!(session_id = %self.id, %axis, value, "rejected non-finite sample");
            return Err(SessionError::InvalidSample { axis, value });
        }

        if let Some(last_ms) = self.last_sample_ms {
            if timestamp_ms < last_ms {
                self.counts.out_of_order += 1;
                tracing::debug!(session_id = %self.id, timestamp_ms, last_ms, "rejected out-of-order sample");
                return Err(SessionError::OutOfOrderSample {
                    timestamp_ms,
                    last_ms,
                });
            }
        }

        let outcome = match self.filter.filter(self.previous, sample) {
            Some(delta) => {
                self.counts.accepted += 1;
                SampleOutcome::Accepted(self.integrator.accept(delta, timestamp_ms))
            }
            None => {
                self.counts.stationary += 1;
                if let Some(last_ms) = self.last_sample_ms {
                    self.stationary_ms += timestamp_ms - last_ms;
                }
                SampleOutcome::Stationary
            }
        };

        self.previous = sample;
        self.last_sample_ms = Some(timestamp_ms);
        self.movement = outcome.movement_state();
        Ok(outcome)
    }

    /// Record one heartbeat and return the current duration in seconds.
    pub fn tick(&mut self) -> Result<u64, SessionError> {
        let now = self.clock.now_ms();
        if !self.timer.tick(now) {
            return Err(SessionError::SessionNotRunning {
                state: self.state(),
            });
        }
        Ok(self.timer.duration_seconds(now))
    }

    /// Freeze the timer and refuse samples. Returns whether the state changed.
    pub fn pause(&mut self) -> bool {
        let paused = self.timer.pause(self.clock.now_ms());
        if paused {
            self.movement = MovementState::Idle;
            tracing::info!(session_id = %self.id, "tracking session paused");
        }
        paused
    }

    /// Resume a paused session. Returns whether the state changed.
    pub fn resume(&mut self) -> bool {
        let resumed = self.timer.resume(self.clock.now_ms());
        if resumed {
            tracing::info!(session_id = %self.id, "tracking session resumed");
        }
        resumed
    }

    /// Seal the session. Later calls return the same sealed value.
    pub fn stop(&mut self) -> SealedSession {
        if let Some(sealed) = &self.sealed {
            return sealed.clone();
        }

        let now = self.clock.now_ms();
        self.timer.seal(now);
        self.movement = MovementState::Idle;

        let sealed = SealedSession {
            session_id: self.id,
            filter_threshold: self.config.filter_threshold,
            started_at_ms: self.timer.started_at_ms(),
            ended_at_ms: now.max(self.timer.started_at_ms()),
            duration_seconds: self.timer.duration_seconds(now),
            stationary_ms: self.stationary_ms,
            trajectory: self.integrator.points().to_vec(),
            final_position: self.integrator.accumulator(),
            counts: self.counts,
            ticks: self.timer.ticks(),
        };

        tracing::info!(
            session_id = %self.id,
            duration_seconds = sealed.duration_seconds,
            points = sealed.trajectory.len(),
            received = self.counts.received,
            "tracking session sealed"
        );

        self.sealed = Some(sealed.clone());
        sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timer::ManualClock;

    fn session(clock: &ManualClock) -> TrackingSession {
        start_session(SessionConfig::default(), clock.shared()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let clock = ManualClock::new(0);
        let bad = SessionConfig {
            filter_threshold: f64::NAN,
            tick_interval_ms: 1_000,
        };
        assert!(matches!(
            start_session(bad, clock.shared()),
            Err(SessionError::InvalidConfig(_))
        ));

        let bad = SessionConfig {
            filter_threshold: 0.05,
            tick_interval_ms: 0,
        };
        assert!(start_session(bad, clock.shared()).is_err());
    }

    #[test]
    fn test_rejected_sample_leaves_state_untouched() {
        let clock = ManualClock::new(0);
        let mut s = session(&clock);
        s.push_sample(Sample::new(0.0, 0.0, 1.0), 200).unwrap();

        let err = s.push_sample(Sample::new(0.0, f64::NAN, 0.0), 400).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSample { axis: Axis::Y, .. }));

        // Previous reading is still (0,0,1): z=1.0 again is stationary.
        let outcome = s.push_sample(Sample::new(0.0, 0.0, 1.0), 600).unwrap();
        assert_eq!(outcome, SampleOutcome::Stationary);
        assert_eq!(s.trajectory().len(), 1);
        assert_eq!(s.counts().invalid, 1);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let clock = ManualClock::new(0);
        let mut s = session(&clock);
        s.push_sample(Sample::new(0.0, 0.0, 1.0), 1_000).unwrap();
        let err = s.push_sample(Sample::new(0.0, 0.0, 3.0), 900).unwrap_err();
        assert_eq!(
            err,
            SessionError::OutOfOrderSample {
                timestamp_ms: 900,
                last_ms: 1_000
            }
        );
        assert_eq!(s.trajectory().len(), 1);
        assert_eq!(s.accumulator().z, 1.0);
    }

    #[test]
    fn test_stationary_time_accumulates_gaps() {
        let clock = ManualClock::new(0);
        let mut s = session(&clock);
        s.push_sample(Sample::new(0.0, 0.0, 1.0), 0).unwrap();
        s.push_sample(Sample::new(0.0, 0.0, 1.01), 200).unwrap();
        s.push_sample(Sample::new(0.0, 0.0, 1.02), 400).unwrap();
        s.push_sample(Sample::new(0.0, 0.0, 2.0), 600).unwrap();
        assert_eq!(s.movement_state(), MovementState::Moving);

        clock.set(600);
        let sealed = s.stop();
        assert_eq!(sealed.stationary_ms, 400);
        assert_eq!(sealed.counts.stationary, 2);
        assert_eq!(sealed.counts.accepted, 2);
    }

    #[test]
    fn test_sealed_session_refuses_input() {
        let clock = ManualClock::new(0);
        let mut s = session(&clock);
        clock.advance(3_000);
        let first = s.stop();
        clock.advance(60_000);
        let second = s.stop();

        assert_eq!(first, second);
        assert_eq!(first.duration_seconds, 3);
        assert_eq!(s.duration_seconds(), 3);
        assert!(matches!(
            s.push_sample(Sample::new(1.0, 1.0, 1.0), 70_000),
            Err(SessionError::SessionNotRunning {
                state: SessionState::Sealed
            })
        ));
        assert!(s.tick().is_err());
        assert!(!s.resume());
    }

    #[test]
    fn test_paused_session_refuses_samples() {
        let clock = ManualClock::new(0);
        let mut s = session(&clock);
        clock.advance(2_000);
        assert!(s.pause());
        assert!(!s.pause());
        assert!(s.push_sample(Sample::new(1.0, 0.0, 0.0), 2_500).is_err());
        assert!(s.tick().is_err());
        assert_eq!(s.counts().received, 0);

        clock.advance(10_000);
        assert!(s.resume());
        clock.advance(1_000);
        assert_eq!(s.tick().unwrap(), 3);
    }
}
