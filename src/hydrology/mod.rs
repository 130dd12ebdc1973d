// src/hydrology/mod.rs
//! Гидрология: заполнение впадин, направление стока, накопление, реки
//!
//! Сток идёт по графу соседства: каждая клетка суши отдаёт воду самому низкому
//! соседу. Накопление считается от вершин к низинам, поэтому каждая клетка
//! получает воду от всех верхних клеток до того, как передаст её дальше.

mod fill;
mod rivers;

pub use fill::EPS;

use tracing::{debug, warn};

use crate::config::HydrologySettings;
use crate::error::{MapError, MapResult};
use crate::heightmap::Terrain;
use crate::map::{CellKind, River};
use crate::voronoi::CellGraph;
use rivers::Drainage;

/// Результат гидрологии
///
/// `Terrain` остаётся нетронутым; следующие фазы читают `filled_heights`.
#[derive(Debug, Clone)]
pub struct Hydrology {
    /// Высоты после заполнения впадин
    pub filled_heights: Vec<f32>,
    /// Куда стекает клетка; `None` у воды и у пограничной суши без нижнего соседа
    pub receivers: Vec<Option<u32>>,
    pub flux: Vec<f32>,
    pub rivers: Vec<River>,
    pub river_of: Vec<Option<u32>>,
    /// Сколько клеток подняло заполнение
    pub raised_cells: usize,
}

pub fn generate(
    graph: &CellGraph,
    terrain: &Terrain,
    precipitation: &[f32],
    settings: &HydrologySettings,
) -> MapResult<Hydrology> {
    let mut heights = terrain.heights.clone();
    let raised_cells = if settings.fill_depressions {
        fill_depressions(graph, &terrain.kinds, &mut heights, settings.max_fill_passes)?
    } else {
        warn!("depression filling disabled, rivers may run uphill");
        0
    };

    let receivers = receivers(graph, &terrain.kinds, &heights, settings.fill_depressions);
    let flux = accumulate(&terrain.kinds, &heights, &receivers, precipitation);

    let (land_sum, land_cells) = terrain
        .kinds
        .iter()
        .zip(precipitation)
        .filter(|(k, _)| **k == CellKind::Land)
        .fold((0.0_f64, 0_usize), |(s, c), (_, &p)| (s + f64::from(p), c + 1));
    let mean_precipitation = if land_cells > 0 {
        (land_sum / land_cells as f64) as f32
    } else {
        0.0
    };
    let threshold = settings.river_threshold * mean_precipitation.max(1e-6);

    let drainage = Drainage {
        kinds: &terrain.kinds,
        heights: &heights,
        receivers: &receivers,
        flux: &flux,
    };
    let (rivers, river_of) = rivers::extract(&drainage, threshold, settings.min_river_cells);
    debug!(
        threshold,
        raised_cells,
        rivers = rivers.len(),
        "drainage computed"
    );

    Ok(Hydrology {
        filled_heights: heights,
        receivers,
        flux,
        rivers,
        river_of,
        raised_cells,
    })
}

fn fill_depressions(graph: &CellGraph, kinds: &[CellKind], heights: &mut [f32], max_passes: u32) -> MapResult<usize> {
    let mut raised = 0;
    let mut remaining = 0;
    for pass in 1..=max_passes {
        raised += fill::priority_flood(graph, kinds, heights);
        remaining = fill::unresolved(graph, kinds, heights);
        if remaining == 0 {
            return Ok(raised);
        }
        warn!(pass, remaining, "depressions remain after fill pass");
    }
    Err(MapError::HydrologyDepressionUnresolved {
        passes: max_passes,
        remaining,
    })
}

/// Направление стока: самый низкий сосед, при равенстве — меньший id.
///
/// При `strict` сосед должен быть строго ниже, иначе сток уходит за край
/// (пограничная клетка) или отсутствует. Без заполнения впадин клетка в яме
/// всё равно отдаёт воду самому низкому соседу, даже если он выше.
fn receivers(graph: &CellGraph, kinds: &[CellKind], heights: &[f32], strict: bool) -> Vec<Option<u32>> {
    (0..graph.len())
        .map(|i| {
            if kinds[i].is_water() {
                return None;
            }
            let lowest = graph.neighbors[i].iter().copied().min_by(|&a, &b| {
                heights[a as usize]
                    .total_cmp(&heights[b as usize])
                    .then(a.cmp(&b))
            })?;
            if heights[lowest as usize] < heights[i] {
                Some(lowest)
            } else if graph.border[i] || strict {
                None
            } else {
                Some(lowest)
            }
        })
        .collect()
}

/// Накопление стока: осадки суши плюс приток, от высоких клеток к низким
fn accumulate(kinds: &[CellKind], heights: &[f32], receivers: &[Option<u32>], precipitation: &[f32]) -> Vec<f32> {
    let n = kinds.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| heights[b].total_cmp(&heights[a]).then(a.cmp(&b)));

    let mut flux = vec![0.0_f64; n];
    for &c in &order {
        if kinds[c].is_water() {
            continue;
        }
        flux[c] += f64::from(precipitation[c]);
        if let Some(r) = receivers[c] {
            flux[r as usize] += flux[c];
        }
    }
    flux.into_iter().map(|f| f as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate;
    use crate::config::{ClimateSettings, HeightmapSettings};
    use crate::geometry::Rect;
    use crate::heightmap;
    use crate::map::RiverMouth;
    use crate::random::{RandomAlgorithm, RandomSource};
    use crate::sampling::{min_distance_for, sample_points};
    use crate::voronoi;

    fn world(seed: u64) -> (CellGraph, Terrain, Vec<f32>) {
        let rect = Rect::new(800.0, 400.0);
        let n = 2000;
        let rng = RandomSource::new(seed, RandomAlgorithm::Pcg64);
        let r = min_distance_for(rect, n, 0.7);
        let sites = sample_points(rect, n, r, 40, &mut rng.child("sampling", 0)).unwrap();
        let graph = voronoi::build(sites, rect, (rect.area() / n as f64).sqrt(), &rng).unwrap();
        let terrain = heightmap::generate(&graph, &HeightmapSettings::default(), &rng);
        let climate = climate::generate(&graph, &terrain, &ClimateSettings::default());
        (graph, terrain, climate.precipitation)
    }

    #[test]
    fn test_fill_leaves_every_interior_cell_an_outlet() {
        let (graph, terrain, precipitation) = world(3);
        let hydrology = generate(&graph, &terrain, &precipitation, &HydrologySettings::default()).unwrap();
        let filled = &hydrology.filled_heights;

        assert_eq!(fill::unresolved(&graph, &terrain.kinds, filled), 0);
        for i in 0..graph.len() {
            assert!(filled[i] >= terrain.heights[i]);
            if terrain.kinds[i] == CellKind::Land && !graph.border[i] {
                let r = hydrology.receivers[i].unwrap();
                assert!(filled[r as usize] < filled[i]);
            }
        }
    }

    #[test]
    fn test_terrain_is_left_untouched() {
        let (graph, terrain, precipitation) = world(3);
        let before = terrain.clone();
        let hydrology = generate(&graph, &terrain, &precipitation, &HydrologySettings::default()).unwrap();

        assert_eq!(terrain.heights, before.heights);
        assert_eq!(terrain.kinds, before.kinds);
        let raised = (0..graph.len())
            .filter(|&i| hydrology.filled_heights[i] > terrain.heights[i])
            .count();
        assert!(raised <= hydrology.raised_cells);
        assert_eq!(raised > 0, hydrology.raised_cells > 0);
    }

    #[test]
    fn test_rivers_run_downhill() {
        let (graph, terrain, precipitation) = world(11);
        let settings = HydrologySettings {
            river_threshold: 6.0,
            ..HydrologySettings::default()
        };
        let hydrology = generate(&graph, &terrain, &precipitation, &settings).unwrap();
        assert!(!hydrology.rivers.is_empty());

        let heights = &hydrology.filled_heights;
        for river in &hydrology.rivers {
            for w in river.cells.windows(2) {
                assert!(heights[w[1] as usize] < heights[w[0] as usize]);
            }
            assert_ne!(river.mouth, RiverMouth::Sink);
        }
    }

    #[test]
    fn test_flux_includes_upstream_water() {
        let (graph, terrain, precipitation) = world(5);
        let hydrology = generate(&graph, &terrain, &precipitation, &HydrologySettings::default()).unwrap();
        for i in 0..graph.len() {
            if let Some(r) = hydrology.receivers[i] {
                assert!(hydrology.flux[r as usize] >= hydrology.flux[i]);
            }
        }
    }

    #[test]
    fn test_accumulate_chain() {
        let kinds = vec![CellKind::Land, CellKind::Land, CellKind::Ocean];
        let heights = vec![0.8, 0.5, 0.1];
        let receivers = vec![Some(1), Some(2), None];
        let flux = accumulate(&kinds, &heights, &receivers, &[1.0, 2.0, 9.0]);
        assert_eq!(flux, vec![1.0, 3.0, 3.0]);
    }
}
