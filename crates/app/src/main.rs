//! Batch trajectory generation CLI.
//!
//! File-in/file-out: loads the category feeds, routability map, and optional
//! fitness landscape and start points from the data directory, builds or
//! reloads the cached grid index, runs the requested number of generations,
//! and writes the trajectory set into a fresh experiment directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use synthesis::categories::CategoryTable;
use synthesis::config::{BoundingBox, RunConfig, SpeedModel};
use synthesis::fitness::FitnessLandscape;
use synthesis::grid::GridIndex;
use synthesis::point::{CoordinateMapper, Point};
use synthesis::routability::RoutabilityMap;
use synthesis::runner::{GenerationRun, StartPoints};
use synthesis::walk::WalkPolicy;

#[derive(clap::Parser)]
#[command(
    name = "trajectory-walk",
    about = "Synthesize pedestrian trajectories biased by point-of-interest attraction"
)]
struct Args {
    /// Bounding box north latitude
    #[arg(long, default_value_t = 46.3)]
    north: f64,

    /// Bounding box south latitude
    #[arg(long, default_value_t = 45.8)]
    south: f64,

    /// Bounding box east longitude
    #[arg(long, default_value_t = 14.8)]
    east: f64,

    /// Bounding box west longitude
    #[arg(long, default_value_t = 14.1)]
    west: f64,

    /// Cell divisions along the x axis
    #[arg(long, default_value_t = 40)]
    x_division: usize,

    /// Cell divisions along the y axis
    #[arg(long, default_value_t = 40)]
    y_division: usize,

    /// Near-field radius, in cell rings, for the charge approximation
    #[arg(long, default_value_t = 1)]
    near_field_radius: usize,

    /// Comma-separated per-category attraction weights, in phenotype order
    #[arg(long, default_value = "1,1,1,1,1,1")]
    weights: String,

    /// Walk policy: uniform, uniform-no-revisit, charge-weighted,
    /// charge-weighted-no-revisit, charge-fitness-weighted, or
    /// charge-fitness-weighted-no-revisit
    #[arg(long, default_value = "charge-weighted-no-revisit")]
    policy: String,

    /// Maximum walk steps per trajectory
    #[arg(long, default_value_t = 5000)]
    steps: usize,

    /// Number of trajectories to generate
    #[arg(long, default_value_t = 50)]
    count: usize,

    /// Random seed; (seed, trajectory index) determines each output
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory holding phenotype.json, the category feeds,
    /// routability.json, and optionally fitness_landscape.json and
    /// start_points.json
    #[arg(long)]
    data_path: PathBuf,

    /// Directory experiment outputs are created under
    #[arg(long)]
    output_path: PathBuf,

    /// Experiment name; becomes the output subdirectory
    #[arg(long, default_value = "test_random_walk")]
    name_exp: String,

    /// Force a single worker for deterministic step-through debugging
    #[arg(long)]
    debug: bool,

    /// Verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbosity: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(match args.verbosity {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default tracing subscriber")?;

    let policy: WalkPolicy = args.policy.parse()?;
    let weights = parse_weights(&args.weights)?;
    let bounds = BoundingBox {
        north: args.north,
        south: args.south,
        east: args.east,
        west: args.west,
    };

    let experiment_dir = args.output_path.join(&args.name_exp);
    if experiment_dir.exists() {
        bail!(
            "experiment already present: {}",
            experiment_dir.display()
        );
    }
    fs::create_dir_all(&experiment_dir)
        .with_context(|| format!("creating {}", experiment_dir.display()))?;

    info!(data_path = %args.data_path.display(), "loading data");
    let categories =
        CategoryTable::load(&args.data_path).context("loading category feeds")?;
    info!(
        categories = categories.len(),
        names = ?categories.names(),
        "categories loaded"
    );

    let routability_path = args.data_path.join("routability.json");
    let routability: RoutabilityMap = serde_json::from_slice(
        &fs::read(&routability_path)
            .with_context(|| format!("reading {}", routability_path.display()))?,
    )
    .context("parsing routability map")?;
    let mapper = CoordinateMapper::new(bounds, routability.width(), routability.height());

    let index = load_or_build_index(&args, &categories, routability, mapper)?;

    let landscape = if policy.uses_fitness() {
        let path = args.data_path.join("fitness_landscape.json");
        Some(
            FitnessLandscape::from_json_file(&path)
                .with_context(|| format!("loading {}", path.display()))?,
        )
    } else {
        None
    };

    let starts = load_start_points(&args.data_path)?;

    let config = RunConfig {
        bounds,
        x_division: args.x_division,
        y_division: args.y_division,
        near_field_radius: args.near_field_radius,
        weights,
        policy,
        step_budget: args.steps,
        count: args.count,
        seed: args.seed,
        charge_constant: synthesis::config::DEFAULT_CHARGE_CONSTANT,
        speed: SpeedModel::default(),
        debug_single_worker: args.debug,
    };

    let run = GenerationRun::new(&index, &config, landscape.as_ref(), starts)?;
    let results = run.generate()?;

    let written = save::write_trajectory_set(&experiment_dir, "0", &results)
        .context("writing trajectory outputs")?;
    info!(
        trajectories = results.len(),
        files = written.len(),
        output = %experiment_dir.display(),
        "experiment complete"
    );
    Ok(())
}

fn parse_weights(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(|w| {
            w.trim()
                .parse::<f64>()
                .with_context(|| format!("bad weight value {w:?}"))
        })
        .collect()
}

/// Reuse the cached index when its shape matches the request; otherwise
/// build from the feeds and refresh the cache.
fn load_or_build_index(
    args: &Args,
    categories: &CategoryTable,
    routability: RoutabilityMap,
    mapper: CoordinateMapper,
) -> Result<GridIndex> {
    let cache_path = args.data_path.join(format!(
        "grid_index_{}x{}.cache",
        args.x_division, args.y_division
    ));

    if cache_path.is_file() {
        match save::load_index(&cache_path) {
            Ok(index) => {
                let layout = index.layout();
                let matches = layout.width == mapper.width()
                    && layout.height == mapper.height()
                    && layout.x_division == args.x_division
                    && layout.y_division == args.y_division
                    && layout.near_field_radius == args.near_field_radius
                    && index.category_count() == categories.len();
                if matches {
                    return Ok(index);
                }
                warn!("cached index shape differs from the request, rebuilding");
            }
            Err(e) => warn!(error = %e, "failed to load cached index, rebuilding"),
        }
    }

    info!("building grid index");
    let index = GridIndex::build(
        categories,
        routability,
        mapper,
        args.x_division,
        args.y_division,
        args.near_field_radius,
    )?;
    save::save_index(&cache_path, &index).context("caching grid index")?;
    Ok(index)
}

/// Preloaded start points when the data directory provides them, random
/// routable starts otherwise.
fn load_start_points(data_path: &Path) -> Result<StartPoints> {
    let path = data_path.join("start_points.json");
    if !path.is_file() {
        return Ok(StartPoints::RandomRoutable);
    }
    let pairs: Vec<(i32, i32)> = serde_json::from_slice(
        &fs::read(&path).with_context(|| format!("reading {}", path.display()))?,
    )
    .context("parsing start points")?;
    info!(count = pairs.len(), "using preloaded start points");
    Ok(StartPoints::Preloaded(
        pairs.into_iter().map(|(x, y)| Point::new(x, y)).collect(),
    ))
}
