// src/political/mod.rs
//! Культуры и государства
//!
//! Порядок работы:
//! 1. пригодность каждой клетки суши;
//! 2. культурные очаги и их расселение по суше;
//! 3. столицы и рост государств от столиц;
//! 4. граф соседства государств.

mod capitals;
mod expansion;
pub mod graph;

use tracing::{debug, warn};

use crate::biome::Biome;
use crate::config::PoliticalSettings;
use crate::error::{MapError, MapResult};
use crate::heightmap::Terrain;
use crate::map::{CellKind, Culture, State};
use crate::random::RandomSource;
use crate::voronoi::CellGraph;
use graph::{build_state_graph, state_neighbors};

/// Насколько неровность рельефа снижает пригодность
const ROUGHNESS_PENALTY: f32 = 400.0;

/// Всё, что политике нужно знать о клетках
pub struct PoliticalInput<'a> {
    pub graph: &'a CellGraph,
    pub terrain: &'a Terrain,
    /// Высоты после заполнения впадин
    pub heights: &'a [f32],
    pub biomes: &'a [Biome],
    pub river_of: &'a [Option<u32>],
}

#[derive(Debug, Clone)]
pub struct Political {
    pub cultures: Vec<Culture>,
    pub culture_of: Vec<Option<u32>>,
    pub states: Vec<State>,
    pub state_of: Vec<Option<u32>>,
    /// Сколько государств было запрошено до ограничения числом клеток суши
    pub states_requested: usize,
    pub unclaimed_land: usize,
}

pub fn generate(input: &PoliticalInput<'_>, settings: &PoliticalSettings, rng: &RandomSource) -> MapResult<Political> {
    let graph = input.graph;
    let suitability = suitability(input);
    let land: Vec<u32> = (0..graph.len() as u32)
        .filter(|&c| input.terrain.kinds[c as usize] == CellKind::Land)
        .collect();

    let area = graph.rect.area();
    let spacing_for = |k: usize| (area / k.max(1) as f64).sqrt() / 2.0;

    // Культуры
    let culture_count = settings.num_cultures.min(land.len());
    let mut culture_rng = rng.child("cultures", 0);
    let centers = capitals::pick_centers(
        &graph.sites,
        &land,
        &suitability,
        culture_count,
        spacing_for(culture_count),
        &mut culture_rng,
    );
    let culture_of = claim_land(
        input,
        expansion::expand(graph, &centers, f64::INFINITY, |from, to| {
            culture_step(input, settings, from, to)
        }),
    );
    let cultures = centers
        .iter()
        .zip(group(&culture_of, centers.len()))
        .enumerate()
        .map(|(id, (&center, cells))| Culture {
            id: id as u32,
            center,
            cells,
        })
        .collect::<Vec<_>>();

    // Государства
    let state_count = settings.num_states.min(land.len());
    if state_count < settings.num_states {
        warn!(
            requested = settings.num_states,
            land = land.len(),
            "fewer land cells than requested states"
        );
    }
    let mut capital_rng = rng.child("capitals", 0);
    let capitals = capitals::pick_centers(
        &graph.sites,
        &land,
        &suitability,
        state_count,
        spacing_for(state_count),
        &mut capital_rng,
    );

    let max_cost = if settings.allow_wilderness {
        settings.max_expansion_cost
    } else {
        f64::INFINITY
    };
    let state_of = claim_land(
        input,
        expansion::expand(graph, &capitals, max_cost, |from, to| {
            state_step(input, settings, from, to)
        }),
    );

    let unclaimed: Vec<u32> = land
        .iter()
        .copied()
        .filter(|&c| state_of[c as usize].is_none())
        .collect();
    if !unclaimed.is_empty() && !settings.allow_wilderness {
        return Err(MapError::PoliticalAssignmentIncomplete {
            unclaimed: unclaimed.len(),
            first_cell: unclaimed[0],
        });
    }

    let adjacency = build_state_graph(graph, &state_of, capitals.len());
    let states = capitals
        .iter()
        .zip(group(&state_of, capitals.len()))
        .enumerate()
        .map(|(id, (&capital, cells))| {
            let id = id as u32;
            State {
                id,
                capital,
                culture: culture_of[capital as usize].unwrap_or_default(),
                area: cells.iter().map(|&c| graph.areas[c as usize]).sum(),
                cells,
                neighbors: state_neighbors(&adjacency, id),
            }
        })
        .collect::<Vec<_>>();

    debug!(
        cultures = cultures.len(),
        states = states.len(),
        unclaimed = unclaimed.len(),
        "political map assigned"
    );

    Ok(Political {
        cultures,
        culture_of,
        states,
        state_of,
        states_requested: settings.num_states,
        unclaimed_land: unclaimed.len(),
    })
}

/// Пригодность клетки суши для заселения; у воды — ноль
fn suitability(input: &PoliticalInput<'_>) -> Vec<f32> {
    let graph = input.graph;
    let terrain = input.terrain;
    (0..graph.len())
        .map(|i| {
            if terrain.kinds[i] != CellKind::Land {
                return 0.0;
            }
            let h = input.heights[i];
            let ns = &graph.neighbors[i];

            // Пресная вода рядом: река лучше озера, озеро лучше моря
            let bonus = if input.river_of[i].is_some() {
                0.6
            } else if ns.iter().any(|&n| terrain.kinds[n as usize] == CellKind::Lake) {
                0.4
            } else if terrain.coastal[i] {
                0.3
            } else {
                0.0
            };

            let variance = ns
                .iter()
                .map(|&n| {
                    let d = input.heights[n as usize] - h;
                    d * d
                })
                .sum::<f32>()
                / ns.len().max(1) as f32;

            input.biomes[i].habitability() * (1.0 + bonus) / (1.0 + ROUGHNESS_PENALTY * variance) + 1e-3
        })
        .collect()
}

fn culture_step(input: &PoliticalInput<'_>, settings: &PoliticalSettings, from: usize, to: usize) -> f64 {
    let graph = input.graph;
    let distance = graph.sites[from].distance(graph.sites[to]) / graph.spacing;
    let factor = if input.terrain.kinds[to].is_water() {
        settings.water_crossing_cost
    } else {
        f64::from(input.biomes[to].movement_cost())
    };
    distance * factor
}

fn state_step(input: &PoliticalInput<'_>, settings: &PoliticalSettings, from: usize, to: usize) -> f64 {
    let graph = input.graph;
    let terrain = input.terrain;
    let distance = graph.sites[from].distance(graph.sites[to]) / graph.spacing;
    let factor = if terrain.kinds[to].is_water() {
        settings.water_crossing_cost
    } else {
        let elevation = f64::from(input.heights[to]);
        f64::from(input.biomes[to].movement_cost()) * (1.0 + 4.0 * elevation * elevation)
    };
    // Переправа через реку
    let river = match (input.river_of[from], input.river_of[to]) {
        (_, None) => 0.0,
        (Some(a), Some(b)) if a == b => 0.0,
        _ => 0.5,
    };
    distance * factor + river
}

/// Вода не принадлежит никому
fn claim_land(input: &PoliticalInput<'_>, owner: Vec<Option<u32>>) -> Vec<Option<u32>> {
    owner
        .into_iter()
        .zip(&input.terrain.kinds)
        .map(|(o, kind)| if kind.is_water() { None } else { o })
        .collect()
}

/// Клетки каждого владельца по возрастанию id
fn group(owner: &[Option<u32>], count: usize) -> Vec<Vec<u32>> {
    let mut groups = vec![Vec::new(); count];
    for (cell, o) in owner.iter().enumerate() {
        if let Some(o) = o {
            groups[*o as usize].push(cell as u32);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome;
    use crate::climate;
    use crate::config::{BiomeSettings, ClimateSettings, HeightmapSettings, HydrologySettings};
    use crate::geometry::Rect;
    use crate::heightmap;
    use crate::hydrology;
    use crate::random::RandomAlgorithm;
    use crate::sampling::{min_distance_for, sample_points};
    use crate::voronoi;

    struct World {
        graph: CellGraph,
        terrain: Terrain,
        heights: Vec<f32>,
        biomes: Vec<Biome>,
        river_of: Vec<Option<u32>>,
    }

    fn world(seed: u64) -> World {
        let rect = Rect::new(800.0, 400.0);
        let n = 1500;
        let rng = RandomSource::new(seed, RandomAlgorithm::Pcg64);
        let r = min_distance_for(rect, n, 0.7);
        let sites = sample_points(rect, n, r, 40, &mut rng.child("sampling", 0)).unwrap();
        let graph = voronoi::build(sites, rect, (rect.area() / n as f64).sqrt(), &rng).unwrap();
        let terrain = heightmap::generate(&graph, &HeightmapSettings::default(), &rng);
        let climate = climate::generate(&graph, &terrain, &ClimateSettings::default());
        let hydrology =
            hydrology::generate(&graph, &terrain, &climate.precipitation, &HydrologySettings::default()).unwrap();
        let layer = biome::classify(
            &graph,
            &terrain,
            &hydrology.filled_heights,
            &climate,
            &hydrology.river_of,
            &BiomeSettings::default(),
        );
        World {
            graph,
            terrain,
            heights: hydrology.filled_heights,
            biomes: layer.biomes,
            river_of: hydrology.river_of,
        }
    }

    fn input(w: &World) -> PoliticalInput<'_> {
        PoliticalInput {
            graph: &w.graph,
            terrain: &w.terrain,
            heights: &w.heights,
            biomes: &w.biomes,
            river_of: &w.river_of,
        }
    }

    #[test]
    fn test_every_land_cell_has_a_state() {
        let w = world(7);
        let rng = RandomSource::new(7, RandomAlgorithm::Pcg64);
        let political = generate(&input(&w), &PoliticalSettings::default(), &rng).unwrap();

        assert_eq!(political.states.len(), 12);
        assert_eq!(political.unclaimed_land, 0);
        for i in 0..w.graph.len() {
            let land = w.terrain.kinds[i] == CellKind::Land;
            assert_eq!(political.state_of[i].is_some(), land);
            assert_eq!(political.culture_of[i].is_some(), land);
        }
        for state in &political.states {
            assert_eq!(political.state_of[state.capital as usize], Some(state.id));
            assert_eq!(political.culture_of[state.capital as usize], Some(state.culture));
            assert!(state.cells.windows(2).all(|w| w[0] < w[1]));
            assert!(!state.neighbors.contains(&state.id));
        }
    }

    #[test]
    fn test_wilderness_stops_at_max_cost() {
        let w = world(7);
        let rng = RandomSource::new(7, RandomAlgorithm::Pcg64);
        let settings = PoliticalSettings {
            num_states: 2,
            allow_wilderness: true,
            max_expansion_cost: 2.0,
            ..PoliticalSettings::default()
        };
        let political = generate(&input(&w), &settings, &rng).unwrap();
        assert!(political.unclaimed_land > 0);
        assert_eq!(political.states.len(), 2);
    }

    #[test]
    fn test_state_count_capped_by_land() {
        let w = world(7);
        let land = w.terrain.land_count();
        let rng = RandomSource::new(7, RandomAlgorithm::Pcg64);
        let settings = PoliticalSettings {
            num_states: land + 50,
            ..PoliticalSettings::default()
        };
        let political = generate(&input(&w), &settings, &rng).unwrap();
        assert_eq!(political.states.len(), land);
        assert_eq!(political.states_requested, land + 50);
    }

    #[test]
    fn test_same_stream_same_capitals() {
        let w = world(13);
        let rng = RandomSource::new(99, RandomAlgorithm::Pcg64);
        let a = generate(&input(&w), &PoliticalSettings::default(), &rng).unwrap();
        let b = generate(&input(&w), &PoliticalSettings::default(), &rng).unwrap();
        let capitals = |p: &Political| p.states.iter().map(|s| s.capital).collect::<Vec<_>>();
        assert_eq!(capitals(&a), capitals(&b));
        assert_eq!(a.state_of, b.state_of);
    }
}
