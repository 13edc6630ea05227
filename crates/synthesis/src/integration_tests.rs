//! End-to-end tests over a small synthetic world: load categories from
//! feeds, build the index, and run the full generation pipeline under every
//! policy.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::categories::CategoryTable;
use crate::config::{BoundingBox, RunConfig, SpeedModel};
use crate::fitness::{FitnessLandscape, Hull, PairRegions};
use crate::grid::GridIndex;
use crate::point::{CoordinateMapper, Point};
use crate::routability::RoutabilityMap;
use crate::runner::{GenerationRun, StartPoints};
use crate::walk::WalkPolicy;

fn bounds() -> BoundingBox {
    BoundingBox {
        north: 46.3,
        south: 45.8,
        east: 14.8,
        west: 14.1,
    }
}

fn landscape() -> FitnessLandscape {
    let pair = PairRegions {
        outer: Hull::rect(-10.0, -10.0, 400.0, 400.0),
        inner: Hull::rect(0.0, 0.0, 120.0, 120.0),
    };
    FitnessLandscape {
        curliness_length: pair.clone(),
        curliness_distance: pair.clone(),
        distance_length: pair,
    }
}

fn config(policy: WalkPolicy) -> RunConfig {
    RunConfig {
        bounds: bounds(),
        x_division: 5,
        y_division: 5,
        near_field_radius: 1,
        weights: vec![2.0, 1.0],
        policy,
        step_budget: 60,
        count: 4,
        seed: 1234,
        charge_constant: 0.1,
        speed: SpeedModel::default(),
        debug_single_worker: false,
    }
}

/// Write a complete data directory (phenotype + feeds) and load it back.
fn load_table_from_disk(dir: &PathBuf, mapper: &CoordinateMapper) -> CategoryTable {
    let shop_a = mapper.to_geo(Point::new(6, 6));
    let shop_b = mapper.to_geo(Point::new(18, 4));
    let park = mapper.to_geo(Point::new(12, 20));
    fs::write(
        dir.join("phenotype.json"),
        r#"{"categories": [
            {"name": "shop", "subtags": ["supermarket", "bakery"]},
            {"name": "park", "subtags": []}
        ]}"#,
    )
    .unwrap();
    fs::write(
        dir.join("shop.csv"),
        format!(
            "names,x,y\nsupermarket,{},{}\nflorist,{},{}\n",
            shop_a.lon, shop_a.lat, shop_b.lon, shop_b.lat
        ),
    )
    .unwrap();
    fs::write(
        dir.join("park.csv"),
        format!("names,x,y\nwood,{},{}\n", park.lon, park.lat),
    )
    .unwrap();
    CategoryTable::load(dir).unwrap()
}

#[test]
fn test_full_pipeline_from_feeds() {
    let dir = std::env::temp_dir().join("trajectory_integration_pipeline");
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let mapper = CoordinateMapper::new(bounds(), 25, 25);
    let table = load_table_from_disk(&dir, &mapper);
    assert_eq!(table.len(), 2);
    // The unrecognized "florist" row folded into others_shop.
    assert_eq!(table.categories()[0].bucket_counts["others_shop"], 1);

    let index = GridIndex::build(
        &table,
        RoutabilityMap::filled(25, 25, true),
        mapper,
        5,
        5,
        1,
    )
    .unwrap();

    let cfg = config(WalkPolicy::ChargeWeightedNoRevisit);
    let run = GenerationRun::new(&index, &cfg, None, StartPoints::RandomRoutable).unwrap();
    let results = run.generate().unwrap();

    assert_eq!(results.len(), cfg.count);
    for result in &results {
        assert!(result.path.len() <= cfg.step_budget + 1);
        let distinct: HashSet<Point> = result.path.iter().copied().collect();
        assert_eq!(distinct.len(), result.path.len());
        assert_eq!(result.trajectory.real.len(), result.trajectory.points.len());
        // Real coordinates stay inside the bounding box.
        for geo in &result.trajectory.real {
            assert!(geo.lat >= 45.8 && geo.lat <= 46.3);
            assert!(geo.lon >= 14.1 && geo.lon <= 14.8);
        }
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_every_policy_runs_and_reproduces() {
    let dir = std::env::temp_dir().join("trajectory_integration_policies");
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let mapper = CoordinateMapper::new(bounds(), 25, 25);
    let table = load_table_from_disk(&dir, &mapper);
    let index = GridIndex::build(
        &table,
        RoutabilityMap::filled(25, 25, true),
        mapper,
        5,
        5,
        1,
    )
    .unwrap();
    let scape = landscape();

    for policy in WalkPolicy::ALL {
        let cfg = config(policy);
        let run =
            GenerationRun::new(&index, &cfg, Some(&scape), StartPoints::RandomRoutable).unwrap();
        let first = run.generate().unwrap();
        let second = run.generate().unwrap();
        assert_eq!(first, second, "{} not reproducible", policy.as_str());
        assert!(first.iter().enumerate().all(|(i, r)| r.index == i));
        // With a landscape supplied every result carries a fitness score.
        assert!(first.iter().all(|r| r.fitness.is_some()));
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_walks_stay_on_the_street_network() {
    // A cross-shaped street network: walkers must never leave it.
    let mapper = CoordinateMapper::new(bounds(), 21, 21);
    let mut routability = RoutabilityMap::filled(21, 21, false);
    for k in 0..21 {
        routability.set(k, 10, true);
        routability.set(10, k, true);
    }
    let index = GridIndex::build(
        &CategoryTable::from_categories(Vec::new()),
        routability,
        mapper,
        3,
        3,
        1,
    )
    .unwrap();

    let mut cfg = config(WalkPolicy::Uniform);
    cfg.weights = Vec::new();
    cfg.count = 6;
    let run = GenerationRun::new(&index, &cfg, None, StartPoints::RandomRoutable).unwrap();
    for result in run.generate().unwrap() {
        for p in &result.path {
            assert!(
                p.x == 10 || p.y == 10,
                "trajectory {} left the street network at {p:?}",
                result.index
            );
        }
    }
}
