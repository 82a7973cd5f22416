//! Offline replay of recorded samples.
//!
//! Session time follows the recorded timestamps: a [`ManualClock`] is moved
//! to each sample, and one heartbeat is delivered for every tick-interval
//! boundary the feed crosses.

use crate::collector::types::TimedSample;
use crate::core::session::{start_session, SealedSession, SessionConfig, SessionError};
use crate::core::timer::ManualClock;

/// Run `samples` through a fresh session and seal it at the last timestamp.
///
/// Rejected samples (non-finite or out of order) are logged and counted in
/// the sealed counts; they don't stop the replay. An invalid config is the
/// only error.
pub fn replay(
    samples: &[TimedSample],
    config: SessionConfig,
) -> Result<SealedSession, SessionError> {
    let start_ms = samples.first().map(|s| s.timestamp_ms).unwrap_or(0);
    let clock = ManualClock::new(start_ms);
    let mut session = start_session(config, clock.shared())?;

    let interval = u64::from(config.tick_interval_ms.max(1));
    let mut next_tick = start_ms + interval;
    for timed in samples {
        while timed.timestamp_ms >= next_tick {
            clock.set(next_tick);
            session.tick()?;
            next_tick += interval;
        }
        clock.set(timed.timestamp_ms);
        if let Err(e) = session.push_sample(timed.sample, timed.timestamp_ms) {
            tracing::warn!(error = %e, "sample rejected during replay");
        }
    }

    Ok(session.stop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::Sample;

    fn at(timestamp_ms: u64, z: f64) -> TimedSample {
        TimedSample::new(timestamp_ms, Sample::new(0.0, 0.0, z))
    }

    #[test]
    fn test_ticks_follow_irregular_timestamps() {
        let feed = [
            at(0, 0.0),
            at(350, 0.5),
            at(1_730, 1.0),
            at(1_900, 1.5),
            at(1_200, 9.0),
            at(4_050, 2.0),
        ];
        let sealed = replay(&feed, SessionConfig::default()).unwrap();

        // Boundaries at 1000, then 2000, 3000 and 4000.
        assert_eq!(sealed.ticks, 4);
        assert_eq!(sealed.duration_seconds, 4);
        assert_eq!(sealed.ended_at_ms, 4_050);
        assert_eq!(sealed.counts.out_of_order, 1);
        assert_eq!(sealed.counts.accepted, 4);
        assert!(sealed.trajectory.windows(2).all(|w| w[0].t <= w[1].t));
        assert!((sealed.final_position.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_start_counts_from_first_sample() {
        let feed = [at(1_700_000_000_250, 0.0), at(1_700_000_002_249, 1.0)];
        let sealed = replay(&feed, SessionConfig::default()).unwrap();

        assert_eq!(sealed.started_at_ms, 1_700_000_000_250);
        assert_eq!(sealed.ticks, 1);
        assert_eq!(sealed.duration_seconds, 1);
    }

    #[test]
    fn test_empty_feed_seals_empty_session() {
        let sealed = replay(&[], SessionConfig::default()).unwrap();
        assert!(sealed.trajectory.is_empty());
        assert_eq!(sealed.ticks, 0);
        assert_eq!(sealed.duration_seconds, 0);
    }

    #[test]
    fn test_invalid_config_is_returned() {
        let config = SessionConfig {
            filter_threshold: -1.0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            replay(&[at(0, 1.0)], config),
            Err(SessionError::InvalidConfig(_))
        ));
    }
}
