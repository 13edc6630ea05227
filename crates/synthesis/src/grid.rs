//! The spatial partition index.
//!
//! Partitions the lattice into an `x_division × y_division` grid of cells.
//! Each cell owns, per category, the member coordinates falling inside it,
//! plus its real-world centroid and member counts for the far-field charge
//! approximation. Point→cell resolution goes through a precomputed lookup
//! table so queries stay O(1) regardless of how many members were loaded.
//!
//! Building the index is the expensive step; the result is immutable and is
//! what the cache artifact in the `save` crate round-trips.

use std::fmt;

use bitcode::{Decode, Encode};
use tracing::debug;

use crate::categories::CategoryTable;
use crate::geo::GeoCoord;
use crate::point::{CoordinateMapper, Point};
use crate::routability::RoutabilityMap;

/// Identifier of a grid cell: column `i`, row `j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct CellId {
    pub i: u16,
    pub j: u16,
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.i, self.j)
    }
}

/// One cell of the partition.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct Cell {
    pub id: CellId,
    /// Per-category member coordinates inside this cell, category order
    /// matching the index's category names.
    pub members: Vec<Vec<GeoCoord>>,
    /// Real-world centroid of the cell's extent, the single pseudo-charge
    /// location for far-field queries.
    pub centroid: GeoCoord,
}

impl Cell {
    pub fn member_count(&self, category: usize) -> usize {
        self.members[category].len()
    }
}

/// The fixed shape of an index: lattice resolution, cell divisions, and the
/// near-field radius the charge approximation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct GridLayout {
    pub width: usize,
    pub height: usize,
    pub x_division: usize,
    pub y_division: usize,
    /// Chebyshev radius, in cells, of the exact near field.
    pub near_field_radius: usize,
}

/// The exhaustive, non-overlapping partition of the lattice.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct GridIndex {
    layout: GridLayout,
    category_names: Vec<String>,
    /// Row-major `j * x_division + i`.
    cells: Vec<Cell>,
    /// Lattice point → flat cell index, `y * width + x`.
    cell_lookup: Vec<u32>,
    routability: RoutabilityMap,
    mapper: CoordinateMapper,
}

impl GridIndex {
    /// Build the index. Deterministic given identical inputs.
    ///
    /// Category members outside the bounding box are dropped. The mapper
    /// and routability map must agree on the lattice resolution.
    pub fn build(
        categories: &CategoryTable,
        routability: RoutabilityMap,
        mapper: CoordinateMapper,
        x_division: usize,
        y_division: usize,
        near_field_radius: usize,
    ) -> Result<GridIndex, GridError> {
        if mapper.width() != routability.width() || mapper.height() != routability.height() {
            return Err(GridError::LatticeMismatch {
                mapper: (mapper.width(), mapper.height()),
                routability: (routability.width(), routability.height()),
            });
        }
        let layout = GridLayout {
            width: mapper.width(),
            height: mapper.height(),
            x_division,
            y_division,
            near_field_radius,
        };

        let step_x = layout.width as f64 / layout.x_division as f64;
        let step_y = layout.height as f64 / layout.y_division as f64;
        let category_count = categories.len();

        let mut cells = Vec::with_capacity(x_division * y_division);
        for j in 0..y_division {
            for i in 0..x_division {
                let mid_x = ((i as f64 + 0.5) * step_x).min((layout.width - 1) as f64);
                let mid_y = ((j as f64 + 0.5) * step_y).min((layout.height - 1) as f64);
                cells.push(Cell {
                    id: CellId {
                        i: i as u16,
                        j: j as u16,
                    },
                    members: vec![Vec::new(); category_count],
                    centroid: GeoCoord::new(mapper.lat_at(mid_y), mapper.lon_at(mid_x)),
                });
            }
        }

        let mut cell_lookup = vec![0u32; layout.width * layout.height];
        for y in 0..layout.height {
            let j = cell_of(y, step_y, y_division);
            for x in 0..layout.width {
                let i = cell_of(x, step_x, x_division);
                cell_lookup[y * layout.width + x] = (j * x_division + i) as u32;
            }
        }

        let mut dropped = 0usize;
        for (c, category) in categories.categories().iter().enumerate() {
            for &member in &category.members {
                match mapper.to_lattice(member) {
                    Some(p) => {
                        let flat = cell_lookup[p.y as usize * layout.width + p.x as usize];
                        cells[flat as usize].members[c].push(member);
                    }
                    None => dropped += 1,
                }
            }
        }
        if dropped > 0 {
            debug!(dropped, "category members outside the bounding box");
        }
        debug!(
            cells = cells.len(),
            categories = category_count,
            "grid index built"
        );

        Ok(GridIndex {
            layout,
            category_names: categories.names(),
            cells,
            cell_lookup,
            routability,
            mapper,
        })
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn category_count(&self) -> usize {
        self.category_names.len()
    }

    pub fn category_names(&self) -> &[String] {
        &self.category_names
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[usize::from(id.j) * self.layout.x_division + usize::from(id.i)]
    }

    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0
            && p.y >= 0
            && (p.x as usize) < self.layout.width
            && (p.y as usize) < self.layout.height
    }

    /// O(1) point→cell resolution.
    pub fn locate(&self, p: Point) -> Result<CellId, GridError> {
        if !self.in_bounds(p) {
            return Err(GridError::OutOfBounds { x: p.x, y: p.y });
        }
        let flat = self.cell_lookup[p.y as usize * self.layout.width + p.x as usize] as usize;
        Ok(self.cells[flat].id)
    }

    /// The 8-connected cell neighbourhood, clipped to grid bounds. Never
    /// contains `id` itself and never contains duplicates.
    pub fn neighbors(&self, id: CellId) -> Vec<CellId> {
        self.ring(id, 1, false)
    }

    /// The near field of a cell: the cell itself plus every cell within the
    /// layout's Chebyshev near-field radius.
    pub fn near_field(&self, id: CellId) -> Vec<CellId> {
        self.ring(id, self.layout.near_field_radius, true)
    }

    fn ring(&self, id: CellId, radius: usize, include_self: bool) -> Vec<CellId> {
        let radius = radius as i32;
        let (ci, cj) = (i32::from(id.i), i32::from(id.j));
        let mut out = Vec::new();
        for dj in -radius..=radius {
            for di in -radius..=radius {
                if di == 0 && dj == 0 && !include_self {
                    continue;
                }
                let (i, j) = (ci + di, cj + dj);
                if i < 0
                    || j < 0
                    || i as usize >= self.layout.x_division
                    || j as usize >= self.layout.y_division
                {
                    continue;
                }
                out.push(CellId {
                    i: i as u16,
                    j: j as u16,
                });
            }
        }
        out
    }

    /// Routability of a lattice point; `false` out of bounds.
    #[inline]
    pub fn is_routable(&self, p: Point) -> bool {
        self.routability.get(p.x, p.y)
    }

    /// Every routable lattice point, row-major.
    pub fn routable_points(&self) -> Vec<Point> {
        let mut out = Vec::new();
        for y in 0..self.layout.height as i32 {
            for x in 0..self.layout.width as i32 {
                if self.routability.get(x, y) {
                    out.push(Point::new(x, y));
                }
            }
        }
        out
    }
}

#[inline]
fn cell_of(coord: usize, step: f64, division: usize) -> usize {
    ((coord as f64 / step) as usize).min(division - 1)
}

/// Errors raised by index construction and point queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A query point lies outside the lattice.
    OutOfBounds { x: i32, y: i32 },
    /// The mapper and routability map disagree on the lattice resolution.
    LatticeMismatch {
        mapper: (usize, usize),
        routability: (usize, usize),
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::OutOfBounds { x, y } => {
                write!(f, "point ({x}, {y}) is outside the grid")
            }
            GridError::LatticeMismatch {
                mapper,
                routability,
            } => write!(
                f,
                "mapper lattice {}x{} does not match routability lattice {}x{}",
                mapper.0, mapper.1, routability.0, routability.1
            ),
        }
    }
}

impl std::error::Error for GridError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::Category;
    use crate::config::BoundingBox;

    fn bounds() -> BoundingBox {
        BoundingBox {
            north: 46.3,
            south: 45.8,
            east: 14.8,
            west: 14.1,
        }
    }

    fn empty_index(width: usize, height: usize, x_div: usize, y_div: usize) -> GridIndex {
        let mapper = CoordinateMapper::new(bounds(), width, height);
        let routability = RoutabilityMap::filled(width, height, true);
        GridIndex::build(
            &CategoryTable::from_categories(Vec::new()),
            routability,
            mapper,
            x_div,
            y_div,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_partition_property() {
        let index = empty_index(20, 16, 4, 4);
        let mut per_cell = vec![0usize; 16];
        for y in 0..16 {
            for x in 0..20 {
                let id = index.locate(Point::new(x, y)).unwrap();
                per_cell[usize::from(id.j) * 4 + usize::from(id.i)] += 1;
            }
        }
        // Exhaustive and non-overlapping: counts sum to the lattice size and
        // every cell received its full extent.
        assert_eq!(per_cell.iter().sum::<usize>(), 20 * 16);
        assert!(per_cell.iter().all(|c| *c == 5 * 4));
    }

    #[test]
    fn test_locate_out_of_bounds() {
        let index = empty_index(20, 16, 4, 4);
        assert_eq!(
            index.locate(Point::new(-1, 3)),
            Err(GridError::OutOfBounds { x: -1, y: 3 })
        );
        assert_eq!(
            index.locate(Point::new(20, 0)),
            Err(GridError::OutOfBounds { x: 20, y: 0 })
        );
        assert!(index.locate(Point::new(19, 15)).is_ok());
    }

    #[test]
    fn test_neighbor_bounds() {
        let index = empty_index(20, 16, 4, 4);
        for cell in index.cells() {
            let ids = index.neighbors(cell.id);
            assert!(ids.len() <= 8);
            for id in &ids {
                assert!(usize::from(id.i) < 4 && usize::from(id.j) < 4);
                assert_ne!(*id, cell.id);
            }
            let mut dedup = ids.clone();
            dedup.sort_by_key(|id| (id.j, id.i));
            dedup.dedup();
            assert_eq!(dedup.len(), ids.len());
        }
        // Corner and centre counts.
        assert_eq!(index.neighbors(CellId { i: 0, j: 0 }).len(), 3);
        assert_eq!(index.neighbors(CellId { i: 1, j: 1 }).len(), 8);
    }

    #[test]
    fn test_near_field_radius() {
        let mapper = CoordinateMapper::new(bounds(), 25, 25);
        let routability = RoutabilityMap::filled(25, 25, true);
        let index = GridIndex::build(
            &CategoryTable::from_categories(Vec::new()),
            routability,
            mapper,
            5,
            5,
            2,
        )
        .unwrap();
        let centre = CellId { i: 2, j: 2 };
        assert_eq!(index.near_field(centre).len(), 25);
        assert!(index.near_field(centre).contains(&centre));
        assert_eq!(index.near_field(CellId { i: 0, j: 0 }).len(), 9);
    }

    #[test]
    fn test_members_assigned_to_containing_cell() {
        let mapper = CoordinateMapper::new(bounds(), 20, 16);
        let member = mapper.to_geo(Point::new(12, 9));
        let outside = GeoCoord::new(10.0, 10.0);
        let shops = Category::from_members("shop", vec![member, outside]);
        let index = GridIndex::build(
            &CategoryTable::from_categories(vec![shops]),
            RoutabilityMap::filled(20, 16, true),
            mapper,
            4,
            4,
            1,
        )
        .unwrap();

        let id = index.locate(Point::new(12, 9)).unwrap();
        assert_eq!(index.cell(id).member_count(0), 1);
        let total: usize = index.cells().iter().map(|c| c.member_count(0)).sum();
        assert_eq!(total, 1, "member outside the bounding box must be dropped");
    }

    #[test]
    fn test_build_rejects_lattice_mismatch() {
        let mapper = CoordinateMapper::new(bounds(), 20, 16);
        let routability = RoutabilityMap::filled(10, 16, true);
        assert!(matches!(
            GridIndex::build(
                &CategoryTable::from_categories(Vec::new()),
                routability,
                mapper,
                4,
                4,
                1
            ),
            Err(GridError::LatticeMismatch { .. })
        ));
    }

    #[test]
    fn test_is_routable_tracks_bitmap() {
        let mapper = CoordinateMapper::new(bounds(), 8, 8);
        let mut routability = RoutabilityMap::filled(8, 8, false);
        routability.set(3, 4, true);
        let index = GridIndex::build(
            &CategoryTable::from_categories(Vec::new()),
            routability,
            mapper,
            2,
            2,
            1,
        )
        .unwrap();
        assert!(index.is_routable(Point::new(3, 4)));
        assert!(!index.is_routable(Point::new(4, 3)));
        assert!(!index.is_routable(Point::new(-1, 0)));
        assert_eq!(index.routable_points(), vec![Point::new(3, 4)]);
    }
}
