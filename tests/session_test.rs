//! End-to-end tests for tracking sessions and report assembly.

use shaftsense_agent::collector::{read_readings, Sample};
use shaftsense_agent::core::report::{read_report, read_reports, write_combined, write_report};
use shaftsense_agent::core::{
    classify, estimate_confidence, start_session, ConfidenceLabel, ExportFormat, MaintenanceJob,
    ManualClock, SampleOutcome, SessionConfig, SessionError, SessionState, TrackingMode,
    ZoneClassifier, ZoneLabel, ZoneRules,
};
use shaftsense_agent::ReportBuilder;
use std::io::Cursor;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("shaftsense-{name}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn active_session(clock: &ManualClock) -> shaftsense_agent::TrackingSession {
    start_session(SessionConfig::for_mode(TrackingMode::Active), clock.shared()).unwrap()
}

#[test]
fn test_three_sample_scenario() {
    let clock = ManualClock::new(0);
    let mut session = active_session(&clock);

    let first = session.push_sample(Sample::new(0.0, 0.0, 0.0), 0).unwrap();
    assert_eq!(first, SampleOutcome::Stationary);
    let second = session.push_sample(Sample::new(0.0, 0.0, 1.2), 200).unwrap();
    assert_eq!(second.point().map(|p| (p.z, p.t)), Some((1.2, 200)));
    assert_eq!(first.point(), None);
    session.push_sample(Sample::new(0.0, 0.0, 2.5), 400).unwrap();

    clock.set(200_000);
    let sealed = session.stop();

    let zs: Vec<f64> = sealed.trajectory.iter().map(|p| p.z).collect();
    assert_eq!(zs, vec![1.2, 2.5]);
    assert!((sealed.final_position.z - 2.5).abs() < 1e-12);
    assert_eq!(sealed.duration_seconds, 200);

    // Two points is below the ten-point floor of the canonical rules.
    assert_eq!(classify(&sealed.trajectory, sealed.duration_seconds), ZoneLabel::Unknown);

    let stats_only = ZoneClassifier::new(ZoneRules::trajectory_only());
    assert_eq!(sealed.classify(&stats_only), ZoneLabel::MachineRoom);
    assert_eq!(ZoneClassifier::default().decide(1.85, 200), ZoneLabel::MachineRoom);
    assert_eq!(estimate_confidence(sealed.sample_count()), ConfidenceLabel::Medium);
}

#[test]
fn test_no_movement_session() {
    let clock = ManualClock::new(1_000);
    let mut session = active_session(&clock);

    for i in 0..1_000u64 {
        let outcome = session
            .push_sample(Sample::new(0.0, 0.0, 0.01), 1_000 + i * 200)
            .unwrap();
        assert!(!outcome.is_accepted());
    }
    clock.set(201_000);

    let sealed = session.stop();
    assert!(sealed.trajectory.is_empty());
    assert_eq!(sealed.duration_seconds, 200);
    assert_eq!(classify(&[], 200), ZoneLabel::Unknown);
    assert_eq!(sealed.classify(&ZoneClassifier::default()), ZoneLabel::Unknown);
    assert_eq!(estimate_confidence(sealed.sample_count()), ConfidenceLabel::Medium);
    // Every gap after the first sample ended in a stationary sample.
    assert_eq!(sealed.stationary_ms, 999 * 200);
}

#[test]
fn test_threshold_boundary() {
    let clock = ManualClock::new(0);
    let mut session = active_session(&clock);

    let at = session.push_sample(Sample::new(0.05, 0.0, 0.0), 0).unwrap();
    assert_eq!(at, SampleOutcome::Stationary);

    // Previous is now (0.05, 0, 0); the next delta sums to 0.06.
    let above = session.push_sample(Sample::new(0.08, 0.03, 0.0), 200).unwrap();
    assert!(above.is_accepted());
    assert_eq!(session.trajectory().len(), 1);
}

#[test]
fn test_passive_mode_accepts_smaller_moves() {
    let clock = ManualClock::new(0);
    let mut passive =
        start_session(SessionConfig::for_mode(TrackingMode::Passive), clock.shared()).unwrap();
    let mut active = active_session(&clock);

    let sample = Sample::new(0.0, 0.04, 0.0);
    assert!(passive.push_sample(sample, 0).unwrap().is_accepted());
    assert!(!active.push_sample(sample, 0).unwrap().is_accepted());
}

#[test]
fn test_invalid_and_out_of_order_samples_leave_state_untouched() {
    let clock = ManualClock::new(0);
    let mut session = active_session(&clock);

    session.push_sample(Sample::new(1.0, 0.0, 0.0), 1_000).unwrap();
    let before = session.accumulator();

    let err = session
        .push_sample(Sample::new(f64::NAN, 0.0, 0.0), 1_200)
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidSample { .. }));

    let err = session
        .push_sample(Sample::new(5.0, 0.0, 0.0), 800)
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::OutOfOrderSample {
            timestamp_ms: 800,
            last_ms: 1_000
        }
    );

    assert_eq!(session.accumulator(), before);
    assert_eq!(session.trajectory().len(), 1);

    // Previous is still (1, 0, 0): a repeat of it is stationary.
    let repeat = session.push_sample(Sample::new(1.0, 0.0, 0.0), 1_400).unwrap();
    assert_eq!(repeat, SampleOutcome::Stationary);

    let counts = session.counts();
    assert_eq!(counts.invalid, 1);
    assert_eq!(counts.out_of_order, 1);
    assert_eq!(counts.accepted, 1);
}

#[test]
fn test_stop_is_idempotent() {
    let clock = ManualClock::new(0);
    let mut session = active_session(&clock);
    session.push_sample(Sample::new(0.0, 0.0, 1.0), 100).unwrap();

    clock.set(5_000);
    let first = session.stop();
    clock.set(60_000);
    let second = session.stop();

    assert_eq!(first, second);
    assert_eq!(session.state(), SessionState::Sealed);
    assert_eq!(session.duration_seconds(), 5);

    let err = session.push_sample(Sample::new(0.0, 0.0, 2.0), 6_000).unwrap_err();
    assert_eq!(
        err,
        SessionError::SessionNotRunning {
            state: SessionState::Sealed
        }
    );
    assert!(session.tick().is_err());
}

#[test]
fn test_pause_freezes_duration_and_refuses_samples() {
    let clock = ManualClock::new(0);
    let mut session = active_session(&clock);

    clock.set(10_000);
    assert!(session.pause());
    assert!(!session.pause());

    clock.set(70_000);
    assert_eq!(session.duration_seconds(), 10);
    assert!(session
        .push_sample(Sample::new(0.0, 0.0, 1.0), 70_000)
        .is_err());
    assert!(session.tick().is_err());

    assert!(session.resume());
    clock.set(75_000);
    assert_eq!(session.tick().unwrap(), 15);

    let sealed = session.stop();
    assert_eq!(sealed.duration_seconds, 15);
    assert!(sealed.trajectory.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let clock = ManualClock::new(0);
    let config = SessionConfig {
        filter_threshold: f64::INFINITY,
        tick_interval_ms: 1_000,
    };
    assert!(matches!(
        start_session(config, clock.shared()),
        Err(SessionError::InvalidConfig(_))
    ));

    let config = SessionConfig {
        filter_threshold: 0.05,
        tick_interval_ms: 0,
    };
    assert!(start_session(config, clock.shared()).is_err());
}

#[test]
fn test_replayed_feed_builds_report() {
    let feed: String = (0..60u64)
        .map(|i| {
            // Climbing in 0.1 steps keeps every delta above the threshold.
            format!(
                "{{\"t\": {}, \"x\": 0.0, \"y\": 0.0, \"z\": {:.1}}}\n",
                i * 1_000,
                (i + 1) as f64 * 0.1
            )
        })
        .collect();
    let batch = read_readings(Cursor::new(feed)).unwrap();
    assert_eq!(batch.samples.len(), 60);

    let clock = ManualClock::new(0);
    let mut session = active_session(&clock);
    for timed in &batch.samples {
        clock.set(timed.timestamp_ms);
        session.push_sample(timed.sample, timed.timestamp_ms).unwrap();
    }
    clock.set(200_000);
    let sealed = session.stop();

    let job = MaintenanceJob::new("EL-7", "3").with_technician("Sam");
    let report = ReportBuilder::new().build(&job, &sealed);

    assert_eq!(report.sample_count, 60);
    assert_eq!(report.confidence, ConfidenceLabel::High);
    assert_eq!(report.total_time_secs, 200);
    assert_eq!(report.fault_code, "0021");
    // Mean z is 3.05 and 200 s clears the machine room gate.
    assert_eq!(report.inferred_zone, ZoneLabel::MachineRoom);

    let summary = report.summary(chrono_tz::Tz::UTC);
    assert!(summary.contains("Elevator: EL-7"));
    assert!(summary.contains("Total Time: 3m 20s"));
    assert!(summary.contains("Inferred Zone: Machine Room"));
    assert!(summary.contains("Confidence: High"));

    let dir = temp_dir("reports");
    let path = write_report(&dir, &report).unwrap();
    let loaded = read_report(&path).unwrap();
    assert_eq!(loaded.inferred_zone, ZoneLabel::MachineRoom);
    assert_eq!(loaded.trajectory.len(), 60);

    let all = read_reports(&dir).unwrap();
    assert_eq!(all.len(), 1);

    let combined = dir.join("export.jsonl");
    write_combined(&combined, &all, ExportFormat::Jsonl).unwrap();
    let content = std::fs::read_to_string(&combined).unwrap();
    assert_eq!(content.lines().count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}
