//! The random-walk path generator.
//!
//! Six step policies over the same skeleton: enumerate the 8-connected
//! lattice neighbours of the current point, drop out-of-bounds and
//! non-routable candidates (and visited ones for the no-revisit variants),
//! then select exactly one candidate. The walk ends when the step budget is
//! exhausted or the candidate set empties; the shorter path is a normal
//! result, not an error.

use std::collections::HashSet;
use std::str::FromStr;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{
    ConfigError, CHARGE_OBSERVED_MAX, CHARGE_OBSERVED_MIN, FITNESS_OBSERVED_MAX,
    FITNESS_OBSERVED_MIN, WEIGHT_BAND_MAX, WEIGHT_BAND_MIN,
};
use crate::fitness::{convert, FitnessLandscape};
use crate::grid::{GridError, GridIndex};
use crate::point::Point;
use crate::query::QueryEngine;
use crate::sim_rng::SimRng;

/// The walk policy, selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalkPolicy {
    Uniform,
    UniformNoRevisit,
    ChargeWeighted,
    ChargeWeightedNoRevisit,
    ChargeFitnessWeighted,
    ChargeFitnessWeightedNoRevisit,
}

impl WalkPolicy {
    pub const ALL: [WalkPolicy; 6] = [
        WalkPolicy::Uniform,
        WalkPolicy::UniformNoRevisit,
        WalkPolicy::ChargeWeighted,
        WalkPolicy::ChargeWeightedNoRevisit,
        WalkPolicy::ChargeFitnessWeighted,
        WalkPolicy::ChargeFitnessWeightedNoRevisit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WalkPolicy::Uniform => "uniform",
            WalkPolicy::UniformNoRevisit => "uniform-no-revisit",
            WalkPolicy::ChargeWeighted => "charge-weighted",
            WalkPolicy::ChargeWeightedNoRevisit => "charge-weighted-no-revisit",
            WalkPolicy::ChargeFitnessWeighted => "charge-fitness-weighted",
            WalkPolicy::ChargeFitnessWeightedNoRevisit => "charge-fitness-weighted-no-revisit",
        }
    }

    /// Whether visited points are excluded from the candidate set.
    pub fn no_revisit(self) -> bool {
        matches!(
            self,
            WalkPolicy::UniformNoRevisit
                | WalkPolicy::ChargeWeightedNoRevisit
                | WalkPolicy::ChargeFitnessWeightedNoRevisit
        )
    }

    /// Whether the policy scores candidates by aggregated charge.
    pub fn uses_charge(self) -> bool {
        !matches!(self, WalkPolicy::Uniform | WalkPolicy::UniformNoRevisit)
    }

    /// Whether the policy needs a fitness landscape.
    pub fn uses_fitness(self) -> bool {
        matches!(
            self,
            WalkPolicy::ChargeFitnessWeighted | WalkPolicy::ChargeFitnessWeightedNoRevisit
        )
    }
}

impl FromStr for WalkPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalkPolicy::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownPolicy(s.to_string()))
    }
}

/// A single walk in progress. Borrows the immutable index and the
/// generation's RNG; owns the growing path and visited set.
pub struct Walker<'a> {
    query: QueryEngine<'a>,
    policy: WalkPolicy,
    weights: &'a [f64],
    charge_constant: f64,
    landscape: Option<&'a FitnessLandscape>,
    rng: &'a mut SimRng,
    visited: HashSet<Point>,
    path: Vec<Point>,
}

impl<'a> Walker<'a> {
    pub fn new(
        index: &'a GridIndex,
        policy: WalkPolicy,
        weights: &'a [f64],
        charge_constant: f64,
        landscape: Option<&'a FitnessLandscape>,
        start: Point,
        rng: &'a mut SimRng,
    ) -> Result<Self, ConfigError> {
        if policy.uses_fitness() && landscape.is_none() {
            return Err(ConfigError::MissingLandscape);
        }
        let mut visited = HashSet::new();
        visited.insert(start);
        Ok(Self {
            query: QueryEngine::new(index),
            policy,
            weights,
            charge_constant,
            landscape,
            rng,
            visited,
            path: vec![start],
        })
    }

    /// Pre-mark points as visited (resuming or constraining a walk).
    pub fn mark_visited(&mut self, points: impl IntoIterator<Item = Point>) {
        self.visited.extend(points);
    }

    /// Run the walk for at most `step_budget` steps and return the path.
    /// The path always contains the start point, so its length is at most
    /// `step_budget + 1`; it is shorter when the candidate set empties.
    pub fn generate(mut self, step_budget: usize) -> Result<Vec<Point>, GridError> {
        for _ in 0..step_budget {
            if self.step()?.is_none() {
                break;
            }
        }
        Ok(self.path)
    }

    /// Advance by one step, or report an empty candidate set with `None`.
    fn step(&mut self) -> Result<Option<Point>, GridError> {
        let current = self.path[self.path.len() - 1];
        let candidates = self.candidates(current)?;
        if candidates.is_empty() {
            return Ok(None);
        }
        let next = candidates[self.select(&candidates)?];
        self.path.push(next);
        self.visited.insert(next);
        Ok(Some(next))
    }

    fn candidates(&self, current: Point) -> Result<Vec<Point>, GridError> {
        // Walking from an out-of-bounds point is fatal for this path.
        self.query.index().locate(current)?;

        let mut out: Vec<Point> = current
            .neighbours8()
            .into_iter()
            .filter(|p| self.query.index().in_bounds(*p))
            .filter(|p| self.query.index().is_routable(*p))
            .collect();
        if self.policy.no_revisit() {
            out.retain(|p| !self.visited.contains(p));
        }
        Ok(out)
    }

    fn select(&mut self, candidates: &[Point]) -> Result<usize, GridError> {
        match self.policy {
            WalkPolicy::Uniform | WalkPolicy::UniformNoRevisit => {
                Ok(self.rng.0.gen_range(0..candidates.len()))
            }
            WalkPolicy::ChargeWeighted | WalkPolicy::ChargeWeightedNoRevisit => {
                let mut charges = Vec::with_capacity(candidates.len());
                for &candidate in candidates {
                    charges.push(self.query.aggregated_charge(
                        candidate,
                        self.weights,
                        self.charge_constant,
                    )?);
                }
                Ok(self.weighted_or_uniform(&charges, candidates.len()))
            }
            WalkPolicy::ChargeFitnessWeighted | WalkPolicy::ChargeFitnessWeightedNoRevisit => {
                let Some(landscape) = self.landscape else {
                    // Checked at construction; unreachable in practice.
                    return Ok(self.rng.0.gen_range(0..candidates.len()));
                };
                let mut scores = Vec::with_capacity(candidates.len());
                for &candidate in candidates {
                    let charge = self.query.aggregated_charge(
                        candidate,
                        self.weights,
                        self.charge_constant,
                    )?;
                    self.path.push(candidate);
                    let (prospective, _) = landscape.evaluate(&self.path);
                    self.path.pop();

                    let charge_factor = convert(
                        CHARGE_OBSERVED_MIN,
                        CHARGE_OBSERVED_MAX,
                        WEIGHT_BAND_MIN,
                        WEIGHT_BAND_MAX,
                        charge,
                    )
                    .clamp(WEIGHT_BAND_MIN, WEIGHT_BAND_MAX);
                    let fitness_factor = convert(
                        FITNESS_OBSERVED_MIN,
                        FITNESS_OBSERVED_MAX,
                        WEIGHT_BAND_MIN,
                        WEIGHT_BAND_MAX,
                        prospective,
                    )
                    .clamp(WEIGHT_BAND_MIN, WEIGHT_BAND_MAX);
                    scores.push(charge_factor * fitness_factor);
                }
                Ok(self.weighted_or_uniform(&scores, candidates.len()))
            }
        }
    }

    /// Weighted selection, falling back to uniform when the weight vector
    /// degenerates (all zero, or otherwise unusable).
    fn weighted_or_uniform(&mut self, weights: &[f64], count: usize) -> usize {
        match WeightedIndex::new(weights.iter().copied()) {
            Ok(dist) => dist.sample(&mut self.rng.0),
            Err(_) => {
                debug!("degenerate candidate weighting, falling back to uniform");
                self.rng.0.gen_range(0..count)
            }
        }
    }
}
