//! ShaftSense Agent - motion capture and work-zone inference for elevator
//! field service.
//!
//! Accelerometer readings taken while a technician works on an elevator are
//! filtered for significant movement, integrated into a relative trajectory,
//! timed, and classified into the shaft zone the work most likely happened in.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ShaftSense Agent                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────┐        │
//! │  │  Collector  │──▶│   Filter    │──▶│  Trajectory  │        │
//! │  │ (JSONL feed)│   │ (L1 delta)  │   │ (accumulate) │        │
//! │  └─────────────┘   └─────────────┘   └──────────────┘        │
//! │         │                 ▲                  │               │
//! │         ▼                 │                  ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────┐        │
//! │  │Transparency │   │    Timer    │   │ Zone + Conf. │──▶ Report
//! │  │    Log      │   │  (Clock)    │   │  (sealed)    │        │
//! │  └─────────────┘   └─────────────┘   └──────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use shaftsense_agent::collector::Sample;
//! use shaftsense_agent::core::{start_session, ManualClock, SessionConfig};
//!
//! let clock = ManualClock::new(0);
//! let mut session = start_session(SessionConfig::default(), clock.shared()).unwrap();
//!
//! session.push_sample(Sample::new(0.0, 0.0, 1.2), 200).unwrap();
//! clock.set(1_000);
//! let sealed = session.stop();
//! assert_eq!(sealed.sample_count(), 1);
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{Collector, CollectorConfig, CollectorError, Sample, TimedSample};
pub use config::{Config, ConfigError};
pub use core::{
    classify, estimate_confidence, start_session, ConfidenceLabel, MaintenanceJob,
    MaintenanceReport, ReportBuilder, SealedSession, SessionConfig, SessionError,
    TrackingSession, ZoneLabel,
};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data declaration shown by `shaftsense status`.
pub const DATA_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║               SHAFTSENSE AGENT - DATA DECLARATION                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent records device motion during elevator maintenance.   ║
║                                                                  ║
║  ✓ WHAT IS RECORDED:                                             ║
║    • Relative displacement from the start of a job               ║
║    • How long the job took and how long you stood still          ║
║    • The elevator, floor and fault code you entered              ║
║                                                                  ║
║  ✗ WHAT IS NEVER RECORDED:                                       ║
║    • GPS or any absolute location                                ║
║    • Raw accelerometer samples beyond the current reading        ║
║                                                                  ║
║  Reports stay on this device until you export or share them.    ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
