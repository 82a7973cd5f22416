//! Core functionality for the ShaftSense Agent.
//!
//! This module contains:
//! - The movement filter and trajectory integration
//! - Session timing, the tracking session handle and offline replay
//! - Zone classification and confidence estimation
//! - Report assembly for export

pub mod classifier;
pub mod filter;
pub mod replay;
pub mod report;
pub mod session;
pub mod timer;
pub mod trajectory;

// Re-export commonly used types
pub use classifier::{
    classify, estimate_confidence, ConfidenceEstimator, ConfidenceLabel, ZoneClassifier,
    ZoneLabel, ZoneRules,
};
pub use filter::{SampleFilter, TrackingMode, ACTIVE_THRESHOLD, PASSIVE_THRESHOLD};
pub use replay::replay;
pub use report::{
    format_duration, ExportFormat, MaintenanceJob, MaintenanceReport, ReportBuilder, ReportError,
    PRODUCER_NAME, REPORT_VERSION,
};
pub use session::{
    start_session, MovementState, SampleCounts, SampleOutcome, SealedSession, SessionConfig,
    SessionError, TrackingSession,
};
pub use timer::{Clock, ManualClock, MonotonicClock, SessionState, SessionTimer, SharedClock};
pub use trajectory::{
    integrate, PositionAccumulator, TrajectoryIntegrator, TrajectoryPoint, TrajectoryStats,
};
