//! Lattice points, movement directions, and the lattice ↔ real-world mapping.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::BoundingBox;
use crate::geo::GeoCoord;

/// Number of movement directions on the 8-connected lattice.
pub const DIRECTION_COUNT: usize = 8;

/// An integer lattice coordinate.
///
/// Exact equality and hashing are what the walker's visited-set uses;
/// `approx_eq` is for comparisons that went through the real-world mapping
/// and back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode, Default,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tolerance-based equality for coordinates recovered from the
    /// real-world mapping.
    pub fn approx_eq(self, other: Point, tolerance: f64) -> bool {
        (f64::from(self.x) - f64::from(other.x)).abs() <= tolerance
            && (f64::from(self.y) - f64::from(other.y)).abs() <= tolerance
    }

    /// Manhattan (cityblock) distance to another lattice point.
    pub fn manhattan(self, other: Point) -> f64 {
        f64::from((self.x - other.x).abs() + (self.y - other.y).abs())
    }

    /// The 8 lattice neighbours, in the fixed enumeration order every
    /// policy observes. Callers clip to lattice bounds.
    pub fn neighbours8(self) -> [Point; DIRECTION_COUNT] {
        let Point { x, y } = self;
        [
            Point::new(x - 1, y + 1),
            Point::new(x, y + 1),
            Point::new(x + 1, y + 1),
            Point::new(x + 1, y),
            Point::new(x + 1, y - 1),
            Point::new(x, y - 1),
            Point::new(x - 1, y - 1),
            Point::new(x - 1, y),
        ]
    }
}

/// One-hot encoding of the move `current -> next`.
///
/// Returns `None` when the two points are not distinct 8-neighbours.
pub fn direction_one_hot(current: Point, next: Point) -> Option<[f64; DIRECTION_COUNT]> {
    let dx = next.x - current.x;
    let dy = next.y - current.y;
    let slot = match (dx, dy) {
        (1, -1) => 0,
        (0, -1) => 1,
        (-1, -1) => 2,
        (-1, 0) => 3,
        (-1, 1) => 4,
        (0, 1) => 5,
        (1, 1) => 6,
        (1, 0) => 7,
        _ => return None,
    };
    let mut one_hot = [0.0; DIRECTION_COUNT];
    one_hot[slot] = 1.0;
    Some(one_hot)
}

/// Maps lattice indices to real-world coordinates and back.
///
/// `x` indices span `[west, east]` (longitude) and `y` indices span
/// `[south, north]` (latitude), linearly interpolated over the lattice
/// resolution.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct CoordinateMapper {
    bounds: BoundingBox,
    width: usize,
    height: usize,
}

impl CoordinateMapper {
    pub fn new(bounds: BoundingBox, width: usize, height: usize) -> Self {
        Self {
            bounds,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Longitude at a fractional `x` index.
    pub fn lon_at(&self, x: f64) -> f64 {
        let span = self.bounds.east - self.bounds.west;
        let steps = (self.width.max(2) - 1) as f64;
        self.bounds.west + x * span / steps
    }

    /// Latitude at a fractional `y` index.
    pub fn lat_at(&self, y: f64) -> f64 {
        let span = self.bounds.north - self.bounds.south;
        let steps = (self.height.max(2) - 1) as f64;
        self.bounds.south + y * span / steps
    }

    /// Real-world coordinate of an in-bounds lattice point.
    pub fn to_geo(&self, p: Point) -> GeoCoord {
        debug_assert!(p.x >= 0 && (p.x as usize) < self.width);
        debug_assert!(p.y >= 0 && (p.y as usize) < self.height);
        GeoCoord::new(self.lat_at(f64::from(p.y)), self.lon_at(f64::from(p.x)))
    }

    /// Nearest lattice point for a real-world coordinate, or `None` when
    /// the coordinate falls outside the bounding box.
    pub fn to_lattice(&self, g: GeoCoord) -> Option<Point> {
        let lon_span = self.bounds.east - self.bounds.west;
        let lat_span = self.bounds.north - self.bounds.south;
        if lon_span <= 0.0 || lat_span <= 0.0 {
            return None;
        }
        let x = (g.lon - self.bounds.west) / lon_span * ((self.width.max(2) - 1) as f64);
        let y = (g.lat - self.bounds.south) / lat_span * ((self.height.max(2) - 1) as f64);
        let x = x.round();
        let y = y.round();
        if x < 0.0 || y < 0.0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(Point::new(x as i32, y as i32))
    }
}
