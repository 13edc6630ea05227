//! End-to-end persistence test: a generation run driven by a cache-loaded
//! index must match one driven by the freshly built index, byte for byte.

use std::fs;

use synthesis::categories::{Category, CategoryTable};
use synthesis::config::{BoundingBox, RunConfig, SpeedModel};
use synthesis::grid::GridIndex;
use synthesis::point::{CoordinateMapper, Point};
use synthesis::routability::RoutabilityMap;
use synthesis::runner::{GenerationRun, StartPoints};
use synthesis::walk::WalkPolicy;

fn bounds() -> BoundingBox {
    BoundingBox {
        north: 46.3,
        south: 45.8,
        east: 14.8,
        west: 14.1,
    }
}

fn build_index() -> GridIndex {
    let mapper = CoordinateMapper::new(bounds(), 24, 24);
    let shops = Category::from_members(
        "shop",
        vec![
            mapper.to_geo(Point::new(5, 5)),
            mapper.to_geo(Point::new(20, 8)),
        ],
    );
    let parks = Category::from_members("park", vec![mapper.to_geo(Point::new(11, 19))]);
    GridIndex::build(
        &CategoryTable::from_categories(vec![shops, parks]),
        RoutabilityMap::filled(24, 24, true),
        mapper,
        6,
        6,
        1,
    )
    .unwrap()
}

#[test]
fn test_cached_index_generates_identical_trajectories() {
    let dir = std::env::temp_dir().join("trajectory_persistence_integration");
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let cache_path = dir.join("grid_index.cache");

    let built = build_index();
    save::save_index(&cache_path, &built).unwrap();
    let loaded = save::load_index(&cache_path).unwrap();
    assert_eq!(loaded, built);

    let config = RunConfig {
        bounds: bounds(),
        x_division: 6,
        y_division: 6,
        near_field_radius: 1,
        weights: vec![2.0, 1.0],
        policy: WalkPolicy::ChargeWeightedNoRevisit,
        step_budget: 50,
        count: 3,
        seed: 77,
        charge_constant: 0.1,
        speed: SpeedModel::default(),
        debug_single_worker: false,
    };

    let from_built = GenerationRun::new(&built, &config, None, StartPoints::RandomRoutable)
        .unwrap()
        .generate()
        .unwrap();
    let from_loaded = GenerationRun::new(&loaded, &config, None, StartPoints::RandomRoutable)
        .unwrap()
        .generate()
        .unwrap();
    assert_eq!(from_built, from_loaded);

    // The run's outputs serialize and parse back.
    let written = save::write_trajectory_set(&dir, "7", &from_loaded).unwrap();
    assert_eq!(written.len(), 4);
    for path in written {
        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert!(value.is_array());
    }

    let _ = fs::remove_dir_all(&dir);
}
