//! Lattice-aligned routability bitmap.
//!
//! External read-only input marking which lattice points a pedestrian can
//! occupy (streets and paths). One byte per point, indexed `y * width + x`;
//! any non-zero value is routable.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct RoutabilityMap {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl RoutabilityMap {
    /// A map with every point set to `routable`.
    pub fn filled(width: usize, height: usize, routable: bool) -> Self {
        Self {
            width,
            height,
            cells: vec![u8::from(routable); width * height],
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the lattice point at `(x, y)` is routable; `false` for
    /// out-of-bounds coordinates.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return false;
        }
        // Total even for maps whose cell vector is shorter than declared
        // (hand-edited external input).
        self.cells.get(y * self.width + x).is_some_and(|c| *c != 0)
    }

    pub fn set(&mut self, x: usize, y: usize, routable: bool) {
        self.cells[y * self.width + x] = u8::from(routable);
    }

    /// Number of routable points.
    pub fn routable_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != 0).count()
    }
}
