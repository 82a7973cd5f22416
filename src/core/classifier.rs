//! Work-zone classification and confidence estimation.
//!
//! Accumulated z displacement is used as a cheap proxy for vertical work
//! position inside the shaft; duration gates separate a long dwell (pit,
//! machine room) from a brief stop at a landing.

use crate::core::trajectory::{mean_z, TrajectoryPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred physical work zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneLabel {
    Unknown,
    #[serde(rename = "Pit Area")]
    PitArea,
    #[serde(rename = "Machine Room")]
    MachineRoom,
    #[serde(rename = "Car Top")]
    CarTop,
    #[serde(rename = "Landing Area")]
    LandingArea,
}

impl ZoneLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneLabel::Unknown => "Unknown",
            ZoneLabel::PitArea => "Pit Area",
            ZoneLabel::MachineRoom => "Machine Room",
            ZoneLabel::CarTop => "Car Top",
            ZoneLabel::LandingArea => "Landing Area",
        }
    }
}

impl fmt::Display for ZoneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the zone decision procedure.
///
/// A duration gate of `None` means the rule ignores duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRules {
    /// Trajectories shorter than this are `Unknown`
    pub min_points: usize,
    pub pit_max_avg_z: f64,
    pub pit_min_duration_secs: Option<u64>,
    pub machine_room_min_avg_z: f64,
    pub machine_room_min_duration_secs: Option<u64>,
    pub car_top_max_abs_avg_z: f64,
    pub car_top_min_duration_secs: Option<u64>,
}

impl ZoneRules {
    /// Canonical rule set: ten-point floor and duration-gated zones.
    pub fn duration_gated() -> Self {
        Self {
            min_points: 10,
            pit_max_avg_z: -1.0,
            pit_min_duration_secs: Some(180),
            machine_room_min_avg_z: 1.0,
            machine_room_min_duration_secs: Some(180),
            car_top_max_abs_avg_z: 0.5,
            car_top_min_duration_secs: Some(120),
        }
    }

    /// Statistics-only rule set used by the heatmap view: no duration gates,
    /// any non-empty trajectory is classified.
    pub fn trajectory_only() -> Self {
        Self {
            min_points: 1,
            pit_min_duration_secs: None,
            machine_room_min_duration_secs: None,
            car_top_min_duration_secs: None,
            ..Self::duration_gated()
        }
    }
}

impl Default for ZoneRules {
    fn default() -> Self {
        Self::duration_gated()
    }
}

fn passes_gate(gate: Option<u64>, duration_seconds: u64) -> bool {
    match gate {
        Some(min) => duration_seconds > min,
        None => true,
    }
}

/// Single parameterized zone classifier.
#[derive(Debug, Clone, Default)]
pub struct ZoneClassifier {
    rules: ZoneRules,
}

impl ZoneClassifier {
    pub fn new(rules: ZoneRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ZoneRules {
        &self.rules
    }

    /// Classify a trajectory observed over `duration_seconds`.
    ///
    /// Empty or too-short trajectories are `Unknown`, never an error.
    pub fn classify(&self, trajectory: &[TrajectoryPoint], duration_seconds: u64) -> ZoneLabel {
        if trajectory.len() < self.rules.min_points {
            return ZoneLabel::Unknown;
        }
        match mean_z(trajectory) {
            Some(avg_z) => self.decide(avg_z, duration_seconds),
            None => ZoneLabel::Unknown,
        }
    }

    /// The decision rules alone, applied to a precomputed mean z. First match wins.
    pub fn decide(&self, avg_z: f64, duration_seconds: u64) -> ZoneLabel {
        let r = &self.rules;
        if passes_gate(r.pit_min_duration_secs, duration_seconds) && avg_z < r.pit_max_avg_z {
            ZoneLabel::PitArea
        } else if passes_gate(r.machine_room_min_duration_secs, duration_seconds)
            && avg_z > r.machine_room_min_avg_z
        {
            ZoneLabel::MachineRoom
        } else if passes_gate(r.car_top_min_duration_secs, duration_seconds)
            && avg_z.abs() < r.car_top_max_abs_avg_z
        {
            ZoneLabel::CarTop
        } else {
            ZoneLabel::LandingArea
        }
    }
}

/// Classify with the canonical rule set.
pub fn classify(trajectory: &[TrajectoryPoint], duration_seconds: u64) -> ZoneLabel {
    ZoneClassifier::default().classify(trajectory, duration_seconds)
}

/// Coarse reliability label for a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Medium,
    High,
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLabel::Medium => write!(f, "Medium"),
            ConfidenceLabel::High => write!(f, "High"),
        }
    }
}

/// Derives confidence from the number of accepted samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceEstimator {
    /// Sample counts strictly above this are `High`
    pub high_min_exclusive: usize,
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self {
            high_min_exclusive: 50,
        }
    }
}

impl ConfidenceEstimator {
    pub fn estimate(&self, sample_count: usize) -> ConfidenceLabel {
        if sample_count > self.high_min_exclusive {
            ConfidenceLabel::High
        } else {
            ConfidenceLabel::Medium
        }
    }
}

/// Estimate confidence with the default cut-off.
pub fn estimate_confidence(sample_count: usize) -> ConfidenceLabel {
    ConfidenceEstimator::default().estimate(sample_count)
}
