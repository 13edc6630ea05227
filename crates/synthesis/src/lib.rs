//! Synthetic pedestrian trajectory generation biased by point-of-interest
//! attraction.
//!
//! The pipeline: a [`grid::GridIndex`] partitions the lattice and answers
//! near-constant-time spatial queries through [`query::QueryEngine`]; a
//! [`walk::Walker`] extends a path one lattice step at a time under one of
//! six policies; [`fitness`] scores paths against a precomputed reference
//! landscape (feeding two of the policies); [`assembler::Assembler`]
//! resamples finished paths into time-indexed trajectories; and
//! [`runner::GenerationRun`] fans independent generations out over a bounded
//! worker pool with per-index deterministic randomness.

pub mod assembler;
pub mod categories;
pub mod config;
pub mod fitness;
pub mod geo;
pub mod grid;
pub mod point;
pub mod query;
pub mod routability;
pub mod runner;
pub mod sim_rng;
pub mod walk;

#[cfg(test)]
mod integration_tests;

pub use assembler::{Assembler, Trajectory};
pub use categories::{Category, CategoryError, CategoryTable};
pub use config::{BoundingBox, ConfigError, RunConfig, SpeedModel};
pub use fitness::{FitnessLandscape, TrajectoryFeatures};
pub use geo::GeoCoord;
pub use grid::{CellId, GridError, GridIndex, GridLayout};
pub use point::{CoordinateMapper, Point};
pub use query::QueryEngine;
pub use routability::RoutabilityMap;
pub use runner::{GeneratedTrajectory, GenerationRun, RunError, StartPoints};
pub use sim_rng::SimRng;
pub use walk::{WalkPolicy, Walker};
