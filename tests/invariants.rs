mod common;

use std::collections::HashSet;

use cellmap::geometry::polygon_area;
use cellmap::validate;
use cellmap::{Biome, CellKind, FeatureKind, GenerationParams, RiverMouth, WorldType};
use common::{generate_ok, small_params};

#[test]
fn test_world_types_keep_invariants() {
    for (seed, world_type) in [
        (1, WorldType::EarthLike),
        (2, WorldType::Supercontinent),
        (3, WorldType::Archipelago),
        (4, WorldType::Mediterranean),
        (5, WorldType::IceAgeEarth),
        (6, WorldType::DesertMediterranean),
    ] {
        let mut params = small_params(1500);
        params.heightmap.world_type = world_type;
        let map = generate_ok(seed, &params);
        let violations = validate::check(&map);
        assert!(violations.is_empty(), "{world_type:?}: {violations:?}");
    }
}

#[test]
fn test_polygons_are_counter_clockwise_and_tile_the_map() {
    let map = generate_ok(42, &small_params(1200));
    let mut total = 0.0;
    for cell in &map.cells {
        let area = polygon_area(&cell.polygon);
        assert!(area > 0.0, "cell {} polygon is not counter-clockwise", cell.id);
        assert!((area - cell.area).abs() < 1e-6 * area.max(1.0));
        total += cell.area;
    }
    let rect_area = map.params.width * map.params.height;
    assert!(total <= rect_area * (1.0 + 1e-9));
    assert!(total > rect_area * 0.97);
}

#[test]
fn test_rivers_end_where_they_say() {
    let mut params = small_params(2500);
    params.hydrology.river_threshold = 8.0;
    let map = generate_ok(77, &params);
    assert!(!map.rivers.is_empty());

    for river in &map.rivers {
        let last = &map.cells[*river.cells.last().unwrap() as usize];
        match river.mouth {
            RiverMouth::Ocean => assert_eq!(last.kind, CellKind::Ocean),
            RiverMouth::Lake => assert_eq!(last.kind, CellKind::Lake),
            RiverMouth::Confluence(other) => {
                assert_eq!(river.parent, Some(other));
                assert!(other < river.id);
                assert_eq!(last.river, Some(other));
            }
            RiverMouth::MapEdge => assert!(last.border),
            RiverMouth::Sink => panic!("filled terrain produced a sink"),
        }
        // Все клетки реки, кроме устья, — суша этой реки
        for &c in &river.cells[..river.cells.len() - 1] {
            let cell = &map.cells[c as usize];
            assert!(cell.is_land());
            assert_eq!(cell.river, Some(river.id));
        }
    }
}

#[test]
fn test_states_and_cultures_are_consistent() {
    let map = generate_ok(9, &small_params(1500));
    assert_eq!(map.states.len(), map.params.political.num_states);
    assert_eq!(map.metadata.states_placed, map.states.len());

    for state in &map.states {
        let capital = &map.cells[state.capital as usize];
        assert_eq!(capital.state, Some(state.id));
        assert_eq!(capital.culture, Some(state.culture));
        for &nb in &state.neighbors {
            assert!(map.states[nb as usize].neighbors.contains(&state.id));
        }
        let area: f64 = state.cells.iter().map(|&c| map.cells[c as usize].area).sum();
        assert!((area - state.area).abs() < 1e-6 * area.max(1.0));
    }

    let mut covered = HashSet::new();
    for culture in &map.cultures {
        assert_eq!(map.cells[culture.center as usize].culture, Some(culture.id));
        for &c in &culture.cells {
            assert!(covered.insert(c));
        }
    }
    assert_eq!(covered.len(), map.metadata.land_cells);
}

#[test]
fn test_features_cover_every_cell() {
    let map = generate_ok(15, &small_params(1000));
    let total: usize = map.features.iter().map(|f| f.cells).sum();
    assert_eq!(total, map.cells.len());
    for cell in &map.cells {
        let feature = &map.features[cell.feature as usize];
        let expected = match cell.kind {
            CellKind::Land => FeatureKind::Island,
            CellKind::Ocean => FeatureKind::Ocean,
            CellKind::Lake => FeatureKind::Lake,
        };
        assert_eq!(feature.kind, expected);
    }
    assert!(map.features.iter().any(|f| f.kind == FeatureKind::Ocean && f.border));
}

#[test]
fn test_water_is_marine_and_unclaimed() {
    let map = generate_ok(21, &small_params(1000));
    for cell in &map.cells {
        if cell.kind.is_water() {
            assert_eq!(cell.biome, Biome::Marine);
            assert_eq!(cell.state, None);
            assert_eq!(cell.culture, None);
        } else {
            assert_ne!(cell.biome, Biome::Marine);
        }
    }
}

#[test]
fn test_wilderness_leaves_land_unclaimed() {
    let mut params = small_params(1500);
    params.political.allow_wilderness = true;
    params.political.max_expansion_cost = 3.0;
    let map = generate_ok(4, &params);

    assert!(map.metadata.unclaimed_land > 0);
    let unclaimed = map.land_cells().filter(|c| c.state.is_none()).count();
    assert_eq!(unclaimed, map.metadata.unclaimed_land);
    assert!(validate::check(&map).is_empty());
}

#[test]
fn test_json_serialization() {
    let map = generate_ok(5, &GenerationParams::with_points(200));
    let json = serde_json::to_value(&map.metadata).unwrap();
    assert_eq!(json["cell_count"], 200);
    assert_eq!(json["algorithm"], "pcg64");
}
