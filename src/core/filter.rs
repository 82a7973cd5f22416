//! Movement threshold filter.
//!
//! Decides, per sample, whether the change from the previous raw reading is
//! large enough to count as technician movement.

use crate::collector::types::{Delta, Sample};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Threshold used by passive trajectory tracking.
pub const PASSIVE_THRESHOLD: f64 = 0.03;

/// Threshold used while a maintenance task is actively tracked.
pub const ACTIVE_THRESHOLD: f64 = 0.05;

/// Which tracking context the filter runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Background trajectory capture
    Passive,
    /// Timed maintenance on a floor
    #[default]
    Active,
}

impl TrackingMode {
    /// The movement threshold for this mode.
    pub fn threshold(&self) -> f64 {
        match self {
            TrackingMode::Passive => PASSIVE_THRESHOLD,
            TrackingMode::Active => ACTIVE_THRESHOLD,
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::Passive => write!(f, "passive"),
            TrackingMode::Active => write!(f, "active"),
        }
    }
}

impl FromStr for TrackingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passive" => Ok(TrackingMode::Passive),
            "active" => Ok(TrackingMode::Active),
            other => Err(format!("unknown tracking mode '{other}' (expected active or passive)")),
        }
    }
}

/// Stateless movement filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFilter {
    threshold: f64,
}

impl SampleFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn for_mode(mode: TrackingMode) -> Self {
        Self::new(mode.threshold())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Return the delta if `|dx| + |dy| + |dz|` strictly exceeds the threshold.
    ///
    /// Both samples must be finite.
    pub fn filter(&self, previous: Sample, current: Sample) -> Option<Delta> {
        let delta = current - previous;
        if delta.l1_norm() > self.threshold {
            Some(delta)
        } else {
            None
        }
    }
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self::for_mode(TrackingMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        let filter = SampleFilter::new(ACTIVE_THRESHOLD);
        let prev = Sample::ZERO;

        assert_eq!(filter.filter(prev, Sample::new(0.05, 0.0, 0.0)), None);
        assert!(filter.filter(prev, Sample::new(0.06, 0.0, 0.0)).is_some());
    }

    #[test]
    fn test_l1_sum_across_axes() {
        let filter = SampleFilter::new(PASSIVE_THRESHOLD);
        // Each axis alone is under the threshold, the sum is over it.
        let delta = filter
            .filter(Sample::ZERO, Sample::new(0.02, -0.02, 0.0))
            .unwrap();
        assert_eq!(delta.dx, 0.02);
        assert_eq!(delta.dy, -0.02);
    }

    #[test]
    fn test_first_sample_uses_raw_values() {
        let filter = SampleFilter::default();
        let delta = filter.filter(Sample::ZERO, Sample::new(0.0, 0.0, 0.98)).unwrap();
        assert_eq!(delta.dz, 0.98);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Passive".parse::<TrackingMode>(), Ok(TrackingMode::Passive));
        assert_eq!("active".parse::<TrackingMode>(), Ok(TrackingMode::Active));
        assert!("walking".parse::<TrackingMode>().is_err());
        assert_eq!(TrackingMode::default().threshold(), 0.05);
    }
}
