//! Resampling a grid path into a time-indexed trajectory.
//!
//! A walker path advances one lattice step per entry regardless of how long
//! the step would take a pedestrian. The assembler replays the path against
//! a stochastic speed model: each tick draws a log-normal speed, converts it
//! to a travel distance, and consumes geodesic path segments until that
//! distance is covered, emitting the point reached. The result is the
//! trajectory a tracker sampling at a fixed rate would record.

use rand_distr::{Distribution, LogNormal};

use crate::config::{ConfigError, SpeedModel};
use crate::geo::{haversine_m, GeoCoord};
use crate::grid::GridError;
use crate::point::{CoordinateMapper, Point};
use crate::query::QueryEngine;
use crate::sim_rng::SimRng;

/// A time-indexed trajectory: one entry per tick, in lattice and real-world
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub points: Vec<Point>,
    pub real: Vec<GeoCoord>,
}

pub struct Assembler<'a> {
    mapper: &'a CoordinateMapper,
    timestep: f64,
    speed: LogNormal<f64>,
}

impl<'a> Assembler<'a> {
    pub fn new(mapper: &'a CoordinateMapper, model: SpeedModel) -> Result<Self, ConfigError> {
        let invalid = ConfigError::InvalidSpeedModel {
            log_std: model.log_std,
            timestep: model.timestep,
        };
        if model.timestep <= 0.0 {
            return Err(invalid);
        }
        let speed = LogNormal::new(model.log_mean, model.log_std).map_err(|_| invalid)?;
        Ok(Self {
            mapper,
            timestep: model.timestep,
            speed,
        })
    }

    /// Geodesic length (metres) of every consecutive path segment.
    pub fn segment_lengths(&self, path: &[Point]) -> Vec<f64> {
        path.windows(2)
            .map(|w| haversine_m(self.mapper.to_geo(w[0]), self.mapper.to_geo(w[1])))
            .collect()
    }

    /// Resample `path` into a trajectory, drawing speeds from `rng`.
    pub fn resample(&self, path: &[Point], rng: &mut SimRng) -> Trajectory {
        if path.is_empty() {
            return Trajectory {
                points: Vec::new(),
                real: Vec::new(),
            };
        }
        let distances = self.segment_lengths(path);
        let mut points = vec![path[0]];
        let mut i = 0;
        while i < distances.len() {
            // Metres covered this tick.
            let space = self.timestep * self.speed.sample(&mut rng.0);
            let mut travelled = 0.0;
            while travelled < space && i < distances.len() {
                travelled += distances[i];
                i += 1;
            }
            points.push(path[i]);
        }
        let real = points.iter().map(|p| self.mapper.to_geo(*p)).collect();
        Trajectory { points, real }
    }

    /// Nearest-distance-per-category at every trajectory tick, for offline
    /// analysis alongside the trajectory itself.
    pub fn distance_table(
        &self,
        query: &QueryEngine<'_>,
        trajectory: &Trajectory,
    ) -> Result<Vec<Vec<f64>>, GridError> {
        trajectory
            .points
            .iter()
            .map(|p| query.nearest_distance_per_category(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::{Category, CategoryTable};
    use crate::config::BoundingBox;
    use crate::grid::GridIndex;
    use crate::routability::RoutabilityMap;

    fn mapper() -> CoordinateMapper {
        let bounds = BoundingBox {
            north: 46.3,
            south: 45.8,
            east: 14.8,
            west: 14.1,
        };
        CoordinateMapper::new(bounds, 32, 32)
    }

    fn staircase(len: i32) -> Vec<Point> {
        (0..len).map(|k| Point::new(k, k / 2)).collect()
    }

    #[test]
    fn test_rejects_invalid_speed_model() {
        let m = mapper();
        let model = SpeedModel {
            log_mean: 0.0,
            log_std: -1.0,
            timestep: 1.0,
        };
        assert!(Assembler::new(&m, model).is_err());
        let model = SpeedModel {
            log_mean: 0.0,
            log_std: 1.0,
            timestep: 0.0,
        };
        assert!(Assembler::new(&m, model).is_err());
    }

    #[test]
    fn test_segment_lengths() {
        let m = mapper();
        let assembler = Assembler::new(&m, SpeedModel::default()).unwrap();
        let path = staircase(8);
        let lengths = assembler.segment_lengths(&path);
        assert_eq!(lengths.len(), 7);
        assert!(lengths.iter().all(|d| *d > 0.0));
    }

    #[test]
    fn test_resample_is_ordered_subsequence() {
        let m = mapper();
        let assembler = Assembler::new(&m, SpeedModel::default()).unwrap();
        let path = staircase(30);
        let mut rng = SimRng::from_seed_u64(21);
        let tra = assembler.resample(&path, &mut rng);

        assert_eq!(tra.points[0], path[0]);
        assert_eq!(*tra.points.last().unwrap(), *path.last().unwrap());
        assert!(tra.points.len() <= path.len());
        // Every emitted point appears in the path in order.
        let mut cursor = 0;
        for p in &tra.points {
            cursor += path[cursor..].iter().position(|q| q == p).unwrap();
        }
        assert_eq!(tra.real.len(), tra.points.len());
        assert_eq!(tra.real[0], m.to_geo(path[0]));
    }

    #[test]
    fn test_resample_deterministic_per_seed() {
        let m = mapper();
        let assembler = Assembler::new(&m, SpeedModel::default()).unwrap();
        let path = staircase(30);
        let mut rng_a = SimRng::from_seed_u64(4);
        let mut rng_b = SimRng::from_seed_u64(4);
        assert_eq!(
            assembler.resample(&path, &mut rng_a),
            assembler.resample(&path, &mut rng_b)
        );
    }

    #[test]
    fn test_resample_degenerate_paths() {
        let m = mapper();
        let assembler = Assembler::new(&m, SpeedModel::default()).unwrap();
        let mut rng = SimRng::from_seed_u64(1);
        assert!(assembler.resample(&[], &mut rng).points.is_empty());
        let single = assembler.resample(&[Point::new(2, 2)], &mut rng);
        assert_eq!(single.points, vec![Point::new(2, 2)]);
    }

    #[test]
    fn test_distance_table_shape() {
        let m = mapper();
        let shops = Category::from_members("shop", vec![m.to_geo(Point::new(10, 10))]);
        let parks = Category::from_members("park", vec![m.to_geo(Point::new(3, 20))]);
        let index = GridIndex::build(
            &CategoryTable::from_categories(vec![shops, parks]),
            RoutabilityMap::filled(32, 32, true),
            m.clone(),
            4,
            4,
            1,
        )
        .unwrap();
        let query = QueryEngine::new(&index);
        let assembler = Assembler::new(index.mapper(), SpeedModel::default()).unwrap();
        let mut rng = SimRng::from_seed_u64(6);
        let tra = assembler.resample(&staircase(20), &mut rng);
        let table = assembler.distance_table(&query, &tra).unwrap();
        assert_eq!(table.len(), tra.points.len());
        assert!(table.iter().all(|row| row.len() == 2));
    }
}
