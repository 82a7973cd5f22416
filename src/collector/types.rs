//! Accelerometer sample types for the ShaftSense Agent.
//!
//! These types carry raw triaxial readings only. No device orientation,
//! location or user content is ever attached to a sample.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// Accelerometer axis, used to report which component of a sample was bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// A raw triaxial accelerometer reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    /// The zero vector. Used as the "previous" reading at session start.
    pub const ZERO: Sample = Sample {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Return the first non-finite component, if any.
    pub fn non_finite_axis(&self) -> Option<(Axis, f64)> {
        [(Axis::X, self.x), (Axis::Y, self.y), (Axis::Z, self.z)]
            .into_iter()
            .find(|(_, v)| !v.is_finite())
    }
}

impl Sub for Sample {
    type Output = Delta;

    fn sub(self, previous: Sample) -> Delta {
        Delta {
            dx: self.x - previous.x,
            dy: self.y - previous.y,
            dz: self.z - previous.z,
        }
    }
}

/// Component-wise difference between two consecutive samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Delta {
    /// L1 magnitude, the quantity compared against the movement threshold.
    pub fn l1_norm(&self) -> f64 {
        self.dx.abs() + self.dy.abs() + self.dz.abs()
    }
}

/// A sample together with the timestamp it was read at (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedSample {
    pub timestamp_ms: u64,
    pub sample: Sample,
}

impl TimedSample {
    pub fn new(timestamp_ms: u64, sample: Sample) -> Self {
        Self {
            timestamp_ms,
            sample,
        }
    }
}

/// Wire form of one feed line: `{"t": 1700000000000, "x": 0.1, "y": 0.0, "z": 0.98}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub t: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<SensorReading> for TimedSample {
    fn from(r: SensorReading) -> Self {
        TimedSample::new(r.t, Sample::new(r.x, r.y, r.z))
    }
}
