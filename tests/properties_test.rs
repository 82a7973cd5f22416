//! Property tests for the filter and integrator.

use proptest::prelude::*;
use shaftsense_agent::collector::Sample;
use shaftsense_agent::core::{
    start_session, ManualClock, SampleFilter, SampleOutcome, SessionConfig, TrajectoryPoint,
};

fn sample() -> impl Strategy<Value = Sample> {
    (-3.0f64..3.0, -3.0f64..3.0, -3.0f64..3.0).prop_map(|(x, y, z)| Sample::new(x, y, z))
}

/// Samples with non-decreasing timestamps.
fn feed() -> impl Strategy<Value = Vec<(Sample, u64)>> {
    prop::collection::vec((sample(), 0u64..500), 0..200).prop_map(|steps| {
        let mut t = 0;
        steps
            .into_iter()
            .map(|(s, gap)| {
                t += gap;
                (s, t)
            })
            .collect()
    })
}

fn run(feed: &[(Sample, u64)], threshold: f64) -> (Vec<TrajectoryPoint>, Vec<SampleOutcome>) {
    let clock = ManualClock::new(0);
    let config = SessionConfig {
        filter_threshold: threshold,
        ..SessionConfig::default()
    };
    let mut session = start_session(config, clock.shared()).unwrap();
    let outcomes = feed
        .iter()
        .map(|(s, t)| session.push_sample(*s, *t).unwrap())
        .collect();
    (session.stop().trajectory, outcomes)
}

proptest! {
    #[test]
    fn same_feed_same_trajectory(feed in feed(), threshold in 0.0f64..1.0) {
        let (a, _) = run(&feed, threshold);
        let (b, _) = run(&feed, threshold);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn accumulator_is_sum_of_accepted_deltas(feed in feed(), threshold in 0.0f64..1.0) {
        let filter = SampleFilter::new(threshold);
        let mut previous = Sample::ZERO;
        let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
        for (s, _) in &feed {
            if let Some(d) = filter.filter(previous, *s) {
                x += d.dx;
                y += d.dy;
                z += d.dz;
            }
            previous = *s;
        }

        let (trajectory, outcomes) = run(&feed, threshold);
        let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
        prop_assert_eq!(trajectory.len(), accepted);

        match trajectory.last() {
            Some(last) => {
                prop_assert!((last.x - x).abs() < 1e-9);
                prop_assert!((last.y - y).abs() < 1e-9);
                prop_assert!((last.z - z).abs() < 1e-9);
            }
            None => prop_assert_eq!((x, y, z), (0.0, 0.0, 0.0)),
        }
    }

    #[test]
    fn trajectory_timestamps_never_decrease(feed in feed(), threshold in 0.0f64..1.0) {
        let (trajectory, _) = run(&feed, threshold);
        for pair in trajectory.windows(2) {
            prop_assert!(pair[0].t <= pair[1].t);
        }
    }

    #[test]
    fn filter_accepts_only_strictly_above_threshold(
        previous in sample(),
        current in sample(),
        threshold in 0.0f64..2.0,
    ) {
        let delta = current - previous;
        let norm = delta.l1_norm();
        let accepted = SampleFilter::new(threshold).filter(previous, current).is_some();
        prop_assert_eq!(accepted, norm > threshold);
    }
}
