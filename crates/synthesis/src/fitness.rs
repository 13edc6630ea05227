//! Trajectory fitness against a precomputed reference landscape.
//!
//! A path is reduced to scalar behavioural features; three 2-D feature pairs
//! are each located against nested reference hulls derived offline from real
//! human trajectories. Inside the inner hull a pair contributes nothing;
//! inside the outer hull it earns the distance to the inner boundary; outside
//! the outer hull it pays the distance to the outer boundary. Contributions
//! are rescaled and clamped to ±[`MAX_PAIR_FITNESS`].

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::point::{direction_one_hot, Point, DIRECTION_COUNT};

/// Bound of a single pair contribution.
pub const MAX_PAIR_FITNESS: f64 = 300.0;

/// Raw hull distance that saturates a pair contribution.
const RAW_DISTANCE_LIMIT: f64 = 150.0;

/// Curliness is scored on a percent-like axis against the reference hulls.
pub const CURLINESS_SCALE: f64 = 100.0;

/// Linear remap of `value` from `[old_min, old_max]` to `[new_min, new_max]`.
pub fn convert(old_min: f64, old_max: f64, new_min: f64, new_max: f64, value: f64) -> f64 {
    (value - old_min) * (new_max - new_min) / (old_max - old_min) + new_min
}

/// Scalar behavioural features of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFeatures {
    /// Path element count.
    pub length: usize,
    /// Mean distance between consecutive one-hot direction vectors; 0 for
    /// straight paths.
    pub curliness: f64,
    /// Maximum Manhattan distance from the first point to any other point.
    pub further_distance: f64,
    /// Manhattan distance from the first point to the midpoint.
    pub distance_to_mid: f64,
    /// Manhattan distance from the first point to the final point.
    pub distance_to_end: f64,
}

/// Compute the behavioural features of a path.
pub fn features(path: &[Point]) -> TrajectoryFeatures {
    let length = path.len();
    if length == 0 {
        return TrajectoryFeatures {
            length: 0,
            curliness: 0.0,
            further_distance: 0.0,
            distance_to_mid: 0.0,
            distance_to_end: 0.0,
        };
    }

    let directions: Vec<[f64; DIRECTION_COUNT]> = path
        .windows(2)
        .filter_map(|w| direction_one_hot(w[0], w[1]))
        .collect();
    let turn_count = directions.len().saturating_sub(1);
    let curliness = if turn_count == 0 {
        0.0
    } else {
        let total: f64 = directions
            .windows(2)
            .map(|w| direction_distance(&w[0], &w[1]))
            .sum();
        total / turn_count as f64
    };

    let start = path[0];
    let further_distance = path[1..]
        .iter()
        .map(|p| start.manhattan(*p))
        .fold(0.0, f64::max);

    TrajectoryFeatures {
        length,
        curliness,
        further_distance,
        distance_to_mid: start.manhattan(path[length / 2]),
        distance_to_end: start.manhattan(path[length - 1]),
    }
}

fn direction_distance(a: &[f64; DIRECTION_COUNT], b: &[f64; DIRECTION_COUNT]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// A simple polygon in feature space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hull {
    pub vertices: Vec<[f64; 2]>,
}

impl Hull {
    /// Axis-aligned rectangle hull (fixtures and tests).
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            vertices: vec![
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
            ],
        }
    }

    /// Ray-casting point-in-polygon test.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        let polygon = &self.vertices;
        if polygon.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = polygon.len() - 1;
        for i in 0..polygon.len() {
            let [xi, yi] = polygon[i];
            let [xj, yj] = polygon[j];
            let intersect = ((yi > p[1]) != (yj > p[1]))
                && (p[0] < (xj - xi) * (p[1] - yi) / (yj - yi + f64::EPSILON) + xi);
            if intersect {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Distance from `p` to the hull: 0 inside, otherwise the minimum
    /// distance to any boundary edge.
    pub fn distance(&self, p: [f64; 2]) -> f64 {
        if self.contains(p) {
            return 0.0;
        }
        let n = self.vertices.len();
        let mut best = f64::MAX;
        for i in 0..n {
            let start = self.vertices[i];
            let end = self.vertices[(i + 1) % n];
            best = best.min(point_segment_distance(p, start, end));
        }
        best
    }
}

fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let abx = b[0] - a[0];
    let aby = b[1] - a[1];
    let ab_len_sq = abx * abx + aby * aby;
    let closest = if ab_len_sq == 0.0 {
        a
    } else {
        let t = ((p[0] - a[0]) * abx + (p[1] - a[1]) * aby) / ab_len_sq;
        let t = t.clamp(0.0, 1.0);
        [a[0] + abx * t, a[1] + aby * t]
    };
    let dx = p[0] - closest[0];
    let dy = p[1] - closest[1];
    (dx * dx + dy * dy).sqrt()
}

/// Nested reference regions for one feature pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRegions {
    /// The "acceptable" region.
    pub outer: Hull,
    /// The "core" region where real trajectories concentrate.
    pub inner: Hull,
}

impl PairRegions {
    /// Contribution of a feature pair located at `p`: 0 inside the inner
    /// hull, positive (distance to the inner boundary) inside the outer
    /// hull, negative (distance to the outer boundary) outside. Rescaled
    /// and clamped to ±[`MAX_PAIR_FITNESS`].
    pub fn contribution(&self, p: [f64; 2]) -> f64 {
        let raw = if self.inner.contains(p) {
            0.0
        } else if self.outer.contains(p) {
            self.inner.distance(p)
        } else {
            -self.outer.distance(p)
        };
        (raw * (MAX_PAIR_FITNESS / RAW_DISTANCE_LIMIT)).clamp(-MAX_PAIR_FITNESS, MAX_PAIR_FITNESS)
    }
}

/// The precomputed reference landscape: one nested-region pair per feature
/// pair. Immutable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessLandscape {
    /// Regions over `(curliness·100, length)`.
    pub curliness_length: PairRegions,
    /// Regions over `(curliness·100, further_distance)`.
    pub curliness_distance: PairRegions,
    /// Regions over `(further_distance, length)`.
    pub distance_length: PairRegions,
}

impl FitnessLandscape {
    pub fn from_json_file(path: &Path) -> Result<Self, LandscapeError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Score a path: the sum of the three pair contributions, plus the
    /// features they were computed from.
    pub fn evaluate(&self, path: &[Point]) -> (f64, TrajectoryFeatures) {
        let feats = features(path);
        let scaled_curliness = feats.curliness * CURLINESS_SCALE;
        let length = feats.length as f64;

        let a = self
            .curliness_length
            .contribution([scaled_curliness, length]);
        let b = self
            .curliness_distance
            .contribution([scaled_curliness, feats.further_distance]);
        let c = self
            .distance_length
            .contribution([feats.further_distance, length]);
        (a + b + c, feats)
    }
}

/// Errors raised while loading a fitness landscape artifact.
#[derive(Debug)]
pub enum LandscapeError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for LandscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandscapeError::Io(e) => write!(f, "I/O error reading fitness landscape: {e}"),
            LandscapeError::Json(e) => write!(f, "invalid fitness landscape: {e}"),
        }
    }
}

impl std::error::Error for LandscapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LandscapeError::Io(e) => Some(e),
            LandscapeError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for LandscapeError {
    fn from(e: io::Error) -> Self {
        LandscapeError::Io(e)
    }
}

impl From<serde_json::Error> for LandscapeError {
    fn from(e: serde_json::Error) -> Self {
        LandscapeError::Json(e)
    }
}
