//! Trajectory set serialization.
//!
//! One generation run produces three JSON files — the raw lattice paths, the
//! time-resampled lattice trajectories, and the real-coordinate
//! trajectories — plus a feature table for offline analysis. Real
//! coordinates are written as ordered `[lat, lon]` pairs, one list per
//! trajectory, in request-index order.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use synthesis::point::Point;
use synthesis::runner::GeneratedTrajectory;

use crate::atomic_write::atomic_write;

/// One row of the feature table.
#[derive(Debug, Serialize)]
struct FeatureRecord {
    index: usize,
    length: usize,
    curliness: f64,
    further_distance: f64,
    distance_to_mid: f64,
    distance_to_end: f64,
    fitness: Option<f64>,
}

/// Write the complete output of one generation run into `dir`, suffixing
/// every file with `version`. Returns the files written.
pub fn write_trajectory_set(
    dir: &Path,
    version: &str,
    results: &[GeneratedTrajectory],
) -> Result<Vec<PathBuf>, OutputError> {
    let real: Vec<Vec<[f64; 2]>> = results
        .iter()
        .map(|r| r.trajectory.real.iter().map(|g| [g.lat, g.lon]).collect())
        .collect();
    let trajectories: Vec<Vec<[i32; 2]>> = results
        .iter()
        .map(|r| lattice_pairs(&r.trajectory.points))
        .collect();
    let paths: Vec<Vec<[i32; 2]>> = results.iter().map(|r| lattice_pairs(&r.path)).collect();
    let features: Vec<FeatureRecord> = results
        .iter()
        .map(|r| FeatureRecord {
            index: r.index,
            length: r.features.length,
            curliness: r.features.curliness,
            further_distance: r.features.further_distance,
            distance_to_mid: r.features.distance_to_mid,
            distance_to_end: r.features.distance_to_end,
            fitness: r.fitness,
        })
        .collect();

    let mut written = Vec::with_capacity(4);
    written.push(write_json(
        dir,
        &format!("real_trajectories_{version}.json"),
        &real,
    )?);
    written.push(write_json(
        dir,
        &format!("trajectories_{version}.json"),
        &trajectories,
    )?);
    written.push(write_json(dir, &format!("paths_{version}.json"), &paths)?);
    written.push(write_json(
        dir,
        &format!("features_{version}.json"),
        &features,
    )?);
    Ok(written)
}

fn lattice_pairs(points: &[Point]) -> Vec<[i32; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, OutputError> {
    let path = dir.join(name);
    let bytes = serde_json::to_vec(value)?;
    atomic_write(&path, &bytes)?;
    Ok(path)
}

/// Errors raised while writing trajectory outputs.
#[derive(Debug)]
pub enum OutputError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "I/O error writing output: {e}"),
            OutputError::Json(e) => write!(f, "serialization error: {e}"),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(e: serde_json::Error) -> Self {
        OutputError::Json(e)
    }
}
