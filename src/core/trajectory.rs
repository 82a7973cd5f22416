//! Trajectory integration.
//!
//! Accepted deltas are summed into a running position accumulator and each
//! accepted sample leaves one timestamped snapshot behind. The trajectory is
//! a record of significant motion events, not a uniform time series.

use crate::collector::types::Delta;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Running sum of all accepted deltas since session start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionAccumulator {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PositionAccumulator {
    pub fn added(self, delta: Delta) -> Self {
        Self {
            x: self.x + delta.dx,
            y: self.y + delta.dy,
            z: self.z + delta.dz,
        }
    }
}

/// Snapshot of the accumulator at an accepted sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Sample timestamp in milliseconds
    pub t: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Add `delta` to `accumulator` and snapshot the result at time `t`.
pub fn integrate(
    accumulator: PositionAccumulator,
    delta: Delta,
    t: u64,
) -> (PositionAccumulator, TrajectoryPoint) {
    let next = accumulator.added(delta);
    let point = TrajectoryPoint {
        t,
        x: next.x,
        y: next.y,
        z: next.z,
    };
    (next, point)
}

/// Owns the accumulator and the trajectory of one session.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryIntegrator {
    accumulator: PositionAccumulator,
    points: Vec<TrajectoryPoint>,
}

impl TrajectoryIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate an accepted delta and append the resulting point.
    pub fn accept(&mut self, delta: Delta, t: u64) -> TrajectoryPoint {
        let (next, point) = integrate(self.accumulator, delta, t);
        self.accumulator = next;
        self.points.push(point);
        point
    }

    pub fn accumulator(&self) -> PositionAccumulator {
        self.accumulator
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamp of the most recent point, if any.
    pub fn last_t(&self) -> Option<u64> {
        self.points.last().map(|p| p.t)
    }
}

/// Minimum and maximum of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisExtent {
    pub min: f64,
    pub max: f64,
}

impl AxisExtent {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |acc: Option<AxisExtent>, v| {
            Some(match acc {
                None => AxisExtent { min: v, max: v },
                Some(e) => AxisExtent {
                    min: e.min.min(v),
                    max: e.max.max(v),
                },
            })
        })
    }

    /// Width of the extent; a zero-width (degenerate) extent reports 1.0.
    pub fn range(&self) -> f64 {
        let width = self.max - self.min;
        if width > 0.0 {
            width
        } else {
            1.0
        }
    }

    /// Position of `v` within the extent, in `[0, 1]` for values inside it.
    pub fn normalize(&self, v: f64) -> f64 {
        (v - self.min) / self.range()
    }
}

/// Per-axis extents of a non-empty trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub x: AxisExtent,
    pub y: AxisExtent,
    pub z: AxisExtent,
}

/// Summary statistics of a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStats {
    pub point_count: usize,
    /// Mean accumulated z displacement (None when empty)
    pub mean_z: Option<f64>,
    /// Population standard deviation of z (None when empty)
    pub z_std_dev: Option<f64>,
    pub extents: Option<Extents>,
    /// Time between the first and last point in milliseconds
    pub span_ms: u64,
}

impl TrajectoryStats {
    pub fn compute(points: &[TrajectoryPoint]) -> Self {
        if points.is_empty() {
            return Self {
                point_count: 0,
                mean_z: None,
                z_std_dev: None,
                extents: None,
                span_ms: 0,
            };
        }

        let zs: Vec<f64> = points.iter().map(|p| p.z).collect();
        let extents = match (
            AxisExtent::of(points.iter().map(|p| p.x)),
            AxisExtent::of(points.iter().map(|p| p.y)),
            AxisExtent::of(zs.iter().copied()),
        ) {
            (Some(x), Some(y), Some(z)) => Some(Extents { x, y, z }),
            _ => None,
        };

        let span_ms = match (points.first(), points.last()) {
            (Some(first), Some(last)) => last.t.saturating_sub(first.t),
            _ => 0,
        };

        Self {
            point_count: points.len(),
            mean_z: Some(zs.iter().mean()),
            z_std_dev: Some(zs.iter().population_std_dev()),
            extents,
            span_ms,
        }
    }

    /// Map a point into the unit cube spanned by the trajectory extents.
    ///
    /// Degenerate axes (all points equal) map to 0.
    pub fn normalize(&self, point: &TrajectoryPoint) -> [f64; 3] {
        match self.extents {
            Some(e) => [
                e.x.normalize(point.x),
                e.y.normalize(point.y),
                e.z.normalize(point.z),
            ],
            None => [0.0; 3],
        }
    }
}

/// Mean z of a trajectory, `None` when it is empty.
pub fn mean_z(points: &[TrajectoryPoint]) -> Option<f64> {
    if points.is_empty() {
        None
    } else {
        Some(points.iter().map(|p| p.z).mean())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(dx: f64, dy: f64, dz: f64) -> Delta {
        Delta { dx, dy, dz }
    }

    #[test]
    fn test_integrate_is_componentwise_sum() {
        let (acc, point) = integrate(PositionAccumulator::default(), delta(0.1, -0.2, 1.2), 7);
        assert_eq!(acc, PositionAccumulator { x: 0.1, y: -0.2, z: 1.2 });
        assert_eq!(point.t, 7);
        assert_eq!(point.z, 1.2);
    }

    #[test]
    fn test_integrator_appends_in_order() {
        let mut integrator = TrajectoryIntegrator::new();
        integrator.accept(delta(0.0, 0.0, 1.2), 200);
        let last = integrator.accept(delta(0.0, 0.0, 1.3), 400);

        assert_eq!(integrator.len(), 2);
        assert!((last.z - 2.5).abs() < 1e-12);
        assert!((integrator.accumulator().z - 2.5).abs() < 1e-12);
        assert_eq!(integrator.last_t(), Some(400));
    }

    #[test]
    fn test_stats_empty() {
        let stats = TrajectoryStats::compute(&[]);
        assert_eq!(stats.point_count, 0);
        assert_eq!(stats.mean_z, None);
        assert!(stats.extents.is_none());
        assert_eq!(mean_z(&[]), None);
    }

    #[test]
    fn test_stats_mean_and_span() {
        let points = [
            TrajectoryPoint { t: 100, x: 0.0, y: 0.0, z: 1.2 },
            TrajectoryPoint { t: 300, x: 0.0, y: 0.0, z: 2.5 },
        ];
        let stats = TrajectoryStats::compute(&points);
        assert!((stats.mean_z.unwrap() - 1.85).abs() < 1e-12);
        assert!((stats.z_std_dev.unwrap() - 0.65).abs() < 1e-12);
        assert_eq!(stats.span_ms, 200);
    }

    #[test]
    fn test_degenerate_extent_normalizes_without_nan() {
        let points = [
            TrajectoryPoint { t: 0, x: 2.0, y: 0.0, z: -1.0 },
            TrajectoryPoint { t: 1, x: 2.0, y: 0.5, z: 1.0 },
        ];
        let stats = TrajectoryStats::compute(&points);
        let extents = stats.extents.unwrap();
        assert_eq!(extents.x.range(), 1.0);

        let n = stats.normalize(&points[1]);
        assert_eq!(n, [0.0, 1.0, 1.0]);
        assert!(n.iter().all(|v| v.is_finite()));
    }
}
