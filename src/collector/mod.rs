//! Sample collection module for the ShaftSense Agent.
//!
//! The engine never talks to a sensor API directly. Readings arrive as
//! timestamped JSON Lines from a recorded file or a live bridge and are
//! handed to the core one at a time.

pub mod feed;
pub mod types;

// Re-export commonly used types
pub use feed::{read_readings, CollectorConfig, CollectorError, FeedBatch, FeedCollector};
pub use types::{Axis, Delta, Sample, SensorReading, TimedSample};

/// Platform-agnostic collector type alias
pub type Collector = FeedCollector;
