//! Orchestration of independent trajectory generations.
//!
//! One `GenerationRun` owns references to the read-only shared state (grid
//! index, landscape, configuration) and fans the requested generations out
//! over a bounded worker pool. Workers share nothing mutable; every
//! generation derives all of its randomness from `(seed, trajectory index)`,
//! so results are reproducible regardless of scheduling and are returned in
//! request-index order.

use std::fmt;

use rand::Rng;
use rayon::prelude::*;
use tracing::info;

use crate::assembler::{Assembler, Trajectory};
use crate::config::{ConfigError, RunConfig};
use crate::fitness::{features, FitnessLandscape, TrajectoryFeatures};
use crate::grid::{GridError, GridIndex};
use crate::point::Point;
use crate::query::QueryEngine;
use crate::sim_rng::SimRng;
use crate::walk::Walker;

/// Where each generation's walk begins.
pub enum StartPoints {
    /// One start per trajectory index, loaded in advance.
    Preloaded(Vec<Point>),
    /// Uniform draw over the routable lattice points.
    RandomRoutable,
}

/// Everything produced for one requested trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTrajectory {
    /// Request index; output order matches it.
    pub index: usize,
    /// The raw walk path, one lattice step per entry.
    pub path: Vec<Point>,
    /// The time-resampled trajectory.
    pub trajectory: Trajectory,
    pub features: TrajectoryFeatures,
    /// Landscape score, when a landscape was supplied.
    pub fitness: Option<f64>,
    /// Nearest-distance-per-category at every trajectory tick.
    pub nearest_distances: Vec<Vec<f64>>,
}

pub struct GenerationRun<'a> {
    index: &'a GridIndex,
    landscape: Option<&'a FitnessLandscape>,
    config: &'a RunConfig,
    starts: StartPoints,
    /// Populated for `StartPoints::RandomRoutable`.
    routable_points: Vec<Point>,
}

impl<'a> GenerationRun<'a> {
    pub fn new(
        index: &'a GridIndex,
        config: &'a RunConfig,
        landscape: Option<&'a FitnessLandscape>,
        starts: StartPoints,
    ) -> Result<Self, RunError> {
        config.validate(index.category_count())?;
        if config.policy.uses_fitness() && landscape.is_none() {
            return Err(RunError::Config(ConfigError::MissingLandscape));
        }
        let routable_points = match &starts {
            StartPoints::RandomRoutable => {
                let points = index.routable_points();
                if points.is_empty() {
                    return Err(RunError::NoRoutableStart);
                }
                points
            }
            StartPoints::Preloaded(_) => Vec::new(),
        };
        Ok(Self {
            index,
            landscape,
            config,
            starts,
            routable_points,
        })
    }

    /// Generate `config.count` trajectories, in request-index order.
    pub fn generate(&self) -> Result<Vec<GeneratedTrajectory>, RunError> {
        let count = self.config.count;
        let workers = if self.config.debug_single_worker {
            1
        } else {
            let available = std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1);
            count.clamp(1, available)
        };
        info!(
            count,
            workers,
            policy = self.config.policy.as_str(),
            seed = self.config.seed,
            "generating trajectories"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| RunError::Pool(e.to_string()))?;
        pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|i| self.generate_one(i))
                .collect()
        })
    }

    fn generate_one(&self, index: usize) -> Result<GeneratedTrajectory, RunError> {
        let mut rng = SimRng::for_trajectory(self.config.seed, index as u64);
        let start = self.start_for(index, &mut rng)?;

        let walker = Walker::new(
            self.index,
            self.config.policy,
            &self.config.weights,
            self.config.charge_constant,
            self.landscape,
            start,
            &mut rng,
        )?;
        let path = walker.generate(self.config.step_budget)?;

        let (fitness, feats) = match self.landscape {
            Some(landscape) => {
                let (value, feats) = landscape.evaluate(&path);
                (Some(value), feats)
            }
            None => (None, features(&path)),
        };

        let assembler = Assembler::new(self.index.mapper(), self.config.speed)?;
        let trajectory = assembler.resample(&path, &mut rng);
        let query = QueryEngine::new(self.index);
        let nearest_distances = assembler.distance_table(&query, &trajectory)?;

        Ok(GeneratedTrajectory {
            index,
            path,
            trajectory,
            features: feats,
            fitness,
            nearest_distances,
        })
    }

    fn start_for(&self, index: usize, rng: &mut SimRng) -> Result<Point, RunError> {
        match &self.starts {
            StartPoints::Preloaded(points) => points
                .get(index)
                .copied()
                .ok_or(RunError::MissingStartPoint { index }),
            StartPoints::RandomRoutable => {
                let pick = rng.0.gen_range(0..self.routable_points.len());
                Ok(self.routable_points[pick])
            }
        }
    }
}

/// Errors surfaced by a generation run.
#[derive(Debug)]
pub enum RunError {
    Grid(GridError),
    Config(ConfigError),
    /// The preloaded start list has no entry for a requested index.
    MissingStartPoint { index: usize },
    /// Random starts were requested but no lattice point is routable.
    NoRoutableStart,
    /// The worker pool could not be constructed.
    Pool(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Grid(e) => write!(f, "{e}"),
            RunError::Config(e) => write!(f, "{e}"),
            RunError::MissingStartPoint { index } => {
                write!(f, "no preloaded start point for trajectory {index}")
            }
            RunError::NoRoutableStart => write!(f, "no routable lattice point to start from"),
            RunError::Pool(msg) => write!(f, "worker pool setup failed: {msg}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Grid(e) => Some(e),
            RunError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for RunError {
    fn from(e: GridError) -> Self {
        RunError::Grid(e)
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Config(e)
    }
}
