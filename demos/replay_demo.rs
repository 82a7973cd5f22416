//! Demonstration of the ShaftSense Agent engine.
//!
//! This example shows how to:
//! 1. Feed JSON Lines readings through a collector
//! 2. Drive a tracking session from recorded timestamps
//! 3. Seal the session and build a maintenance report
//!
//! Run with: cargo run --example replay_demo

use std::io::Cursor;

use shaftsense_agent::{
    collector::{Collector, CollectorConfig},
    core::{replay, MaintenanceJob, ReportBuilder, SessionConfig},
    transparency::create_shared_log,
    DATA_DECLARATION,
};

/// A technician on the car top, shifting weight back and forth for 150 s.
fn car_top_feed() -> String {
    (0..750u64)
        .map(|i| {
            let sway = if i % 2 == 0 { 0.2 } else { -0.2 };
            format!(
                "{{\"t\": {}, \"x\": {sway}, \"y\": 0.0, \"z\": 0.0}}\n",
                i * 200
            )
        })
        .collect()
}

fn main() {
    println!("ShaftSense Agent - Replay Demo");
    println!("==============================");
    println!("{DATA_DECLARATION}");

    let mut collector = Collector::new(CollectorConfig::default());
    if let Err(e) = collector.start(Cursor::new(car_top_feed())) {
        eprintln!("Failed to start collector: {e}");
        return;
    }

    // The receiver disconnects once the feed is exhausted.
    let samples: Vec<_> = collector.receiver().iter().collect();
    collector.stop();

    let sealed = match replay(&samples, SessionConfig::default()) {
        Ok(sealed) => sealed,
        Err(e) => {
            eprintln!("Failed to replay feed: {e}");
            return;
        }
    };
    let transparency_log = create_shared_log();
    transparency_log.record_session_sealed(&sealed.counts, sealed.ticks);

    let job = MaintenanceJob::new("EL-12", "7").with_technician("Demo");
    let report = ReportBuilder::new().build(&job, &sealed);

    println!("{}", report.summary(chrono_tz::Tz::UTC));
    println!();
    println!("{}", transparency_log.summary());
}
