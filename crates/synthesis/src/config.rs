//! Run-level configuration and the numeric constants of the model.
//!
//! Everything a generation run needs is carried in an explicit [`RunConfig`]
//! value constructed once by the caller; there is no global lookup.

use std::fmt;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::walk::WalkPolicy;

/// Default coarse-grid resolution along each axis.
pub const DEFAULT_DIVISION: usize = 40;

/// Default near-field radius, in cell rings, for the charge approximation.
pub const DEFAULT_NEAR_FIELD_RADIUS: usize = 1;

/// Coulomb-style constant scaling every charge contribution.
pub const DEFAULT_CHARGE_CONSTANT: f64 = 0.1;

/// Observed range of aggregated charges, used to rescale charge into the
/// selection weight band.
pub const CHARGE_OBSERVED_MIN: f64 = 0.0;
pub const CHARGE_OBSERVED_MAX: f64 = 10_000.0;

/// Observed range of trajectory fitness, used to rescale prospective fitness
/// into the selection weight band.
pub const FITNESS_OBSERVED_MIN: f64 = -750.0;
pub const FITNESS_OBSERVED_MAX: f64 = 700.0;

/// Selection weight band both rescales map into.
pub const WEIGHT_BAND_MIN: f64 = 1.0;
pub const WEIGHT_BAND_MAX: f64 = 10.0;

/// The geographic bounding box of the generation area, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Stochastic speed model for trajectory resampling: a log-normal
/// metres-per-second draw per fixed timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedModel {
    pub log_mean: f64,
    pub log_std: f64,
    /// Timestep length in seconds.
    pub timestep: f64,
}

impl Default for SpeedModel {
    fn default() -> Self {
        Self {
            log_mean: 0.0,
            log_std: 1.0,
            timestep: 1.0,
        }
    }
}

/// Everything one generation run needs, constructed once and passed by
/// reference into the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub bounds: BoundingBox,
    pub x_division: usize,
    pub y_division: usize,
    pub near_field_radius: usize,
    /// Per-category attraction multipliers ("genome"); length must equal the
    /// category count of the grid index.
    pub weights: Vec<f64>,
    pub policy: WalkPolicy,
    /// Maximum number of walk steps per trajectory.
    pub step_budget: usize,
    /// Number of independent trajectories to generate.
    pub count: usize,
    pub seed: u64,
    pub charge_constant: f64,
    pub speed: SpeedModel,
    /// Force a single worker for deterministic step-through debugging.
    pub debug_single_worker: bool,
}

impl RunConfig {
    /// Check the parts of the configuration that depend on loaded data.
    pub fn validate(&self, category_count: usize) -> Result<(), ConfigError> {
        if self.weights.len() != category_count {
            return Err(ConfigError::WeightCount {
                expected: category_count,
                got: self.weights.len(),
            });
        }
        if self.speed.log_std <= 0.0 || self.speed.timestep <= 0.0 {
            return Err(ConfigError::InvalidSpeedModel {
                log_std: self.speed.log_std,
                timestep: self.speed.timestep,
            });
        }
        Ok(())
    }
}

/// Fatal configuration errors, surfaced before any trajectory is generated.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The walk-policy selector does not name a known policy.
    UnknownPolicy(String),
    /// The weight vector length does not match the category count.
    WeightCount { expected: usize, got: usize },
    /// A fitness-weighted policy was selected without a fitness landscape.
    MissingLandscape,
    /// The speed model parameters do not define a valid distribution.
    InvalidSpeedModel { log_std: f64, timestep: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownPolicy(name) => {
                write!(f, "unknown walk policy: {name:?}")
            }
            ConfigError::WeightCount { expected, got } => write!(
                f,
                "weight vector has {got} entries but there are {expected} categories"
            ),
            ConfigError::MissingLandscape => {
                write!(f, "selected policy requires a fitness landscape")
            }
            ConfigError::InvalidSpeedModel { log_std, timestep } => write!(
                f,
                "invalid speed model: log_std {log_std}, timestep {timestep}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
