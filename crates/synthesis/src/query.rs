//! Per-point queries over the grid index.
//!
//! The engine borrows the immutable index and answers the three queries the
//! walk policies consume: nearest distance per category, aggregated charge,
//! and routability filtering.
//!
//! Charge uses the near/far-field approximation: members inside the near
//! field (the point's cell plus its neighbour rings) contribute exact
//! inverse-square terms; every other cell collapses to a single pseudo-charge
//! at its centroid scaled by its member count. The per-query cost is a fixed
//! number of geometric evaluations, independent of total member count.

use crate::geo::{haversine_m, GeoCoord};
use crate::grid::{CellId, GridError, GridIndex};
use crate::point::Point;

/// Distance floor (metres) guarding the inverse-square terms against a
/// member coinciding with the query point.
const MIN_MEMBER_DISTANCE_M: f64 = 1e-3;

/// Placeholder distance for categories with no member anywhere in range.
pub const NO_MEMBER_DISTANCE: f64 = f64::MAX;

pub struct QueryEngine<'a> {
    index: &'a GridIndex,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a GridIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a GridIndex {
        self.index
    }

    /// Minimum geodesic distance (metres) from `point` to any member, per
    /// category: exact within the near field, centroid-approximated for
    /// far cells that hold members. Categories with no members at all
    /// report [`NO_MEMBER_DISTANCE`].
    pub fn nearest_distance_per_category(&self, point: Point) -> Result<Vec<f64>, GridError> {
        let current = self.index.locate(point)?;
        let position = self.index.mapper().to_geo(point);
        let radius = self.index.layout().near_field_radius;

        let mut nearest = vec![NO_MEMBER_DISTANCE; self.index.category_count()];
        for cell in self.index.cells() {
            if chebyshev(cell.id, current) <= radius {
                for (c, members) in cell.members.iter().enumerate() {
                    for &member in members {
                        nearest[c] = nearest[c].min(haversine_m(position, member));
                    }
                }
            } else {
                let centroid_distance = haversine_m(position, cell.centroid);
                for (c, members) in cell.members.iter().enumerate() {
                    if !members.is_empty() {
                        nearest[c] = nearest[c].min(centroid_distance);
                    }
                }
            }
        }
        Ok(nearest)
    }

    /// Aggregated attraction charge at `point`:
    /// `Σ_category weights[c] * k * charge_c(point)` with inverse-square
    /// member contributions. Non-negative for non-negative weights.
    pub fn aggregated_charge(
        &self,
        point: Point,
        weights: &[f64],
        k: f64,
    ) -> Result<f64, GridError> {
        debug_assert_eq!(weights.len(), self.index.category_count());
        let current = self.index.locate(point)?;
        let position = self.index.mapper().to_geo(point);
        let radius = self.index.layout().near_field_radius;

        let mut per_category = vec![0.0f64; self.index.category_count()];
        for cell in self.index.cells() {
            if chebyshev(cell.id, current) <= radius {
                for (c, members) in cell.members.iter().enumerate() {
                    for &member in members {
                        per_category[c] += inverse_square(position, member);
                    }
                }
            } else {
                let pseudo = inverse_square(position, cell.centroid);
                for (c, members) in cell.members.iter().enumerate() {
                    per_category[c] += members.len() as f64 * pseudo;
                }
            }
        }

        Ok(weights
            .iter()
            .zip(&per_category)
            .map(|(w, q)| w * k * q)
            .sum())
    }

    /// The subset of `points` that are routable.
    pub fn filter_routable(&self, points: &[Point]) -> Vec<Point> {
        points
            .iter()
            .copied()
            .filter(|p| self.index.is_routable(*p))
            .collect()
    }
}

#[inline]
fn inverse_square(position: GeoCoord, member: GeoCoord) -> f64 {
    let d = haversine_m(position, member).max(MIN_MEMBER_DISTANCE_M);
    1.0 / (d * d)
}

#[inline]
fn chebyshev(a: CellId, b: CellId) -> usize {
    let di = (i32::from(a.i) - i32::from(b.i)).unsigned_abs() as usize;
    let dj = (i32::from(a.j) - i32::from(b.j)).unsigned_abs() as usize;
    di.max(dj)
}
