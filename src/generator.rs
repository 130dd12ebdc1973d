// src/generator.rs
//! Конвейер генерации карты
//!
//! Фазы выполняются строго по порядку, каждая читает готовые результаты
//! предыдущих. Ошибка любой фазы прерывает генерацию целиком: частично
//! заполненная [`MapData`] наружу не отдаётся.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::biome::{self, BiomeLayer};
use crate::climate::{self, Climate};
use crate::config::GenerationParams;
use crate::error::{GenerationError, MapError, Phase};
use crate::geometry::{Point, Rect};
use crate::heightmap::{self, Terrain};
use crate::hydrology::{self, Hydrology};
use crate::map::{Cell, CellKind, MapData, MapMetadata};
use crate::political::{self, Political, PoliticalInput};
use crate::random::{RandomSource, Seed};
use crate::sampling::{min_distance_for, sample_points};
use crate::voronoi::{self, CellGraph};

/// Генерирует карту по сиду и параметрам
///
/// # Пример
/// ```no_run
/// use cellmap::{GenerationParams, generate};
///
/// let map = generate(12345, &GenerationParams::with_points(1000))?;
/// println!("{} клеток, отпечаток {}", map.cells.len(), map.checksum());
/// # Ok::<(), cellmap::GenerationError>(())
/// ```
pub fn generate(seed: impl Into<Seed>, params: &GenerationParams) -> Result<MapData, GenerationError> {
    MapGenerator::new(params.clone()).generate(seed)
}

/// Генератор с фиксированными параметрами и необязательным флагом отмены
#[derive(Debug, Clone)]
pub struct MapGenerator {
    params: GenerationParams,
    cancel: Option<Arc<AtomicBool>>,
}

/// Результат выборки точек вместе с тем, чего она стоила
struct Sites {
    points: Vec<Point>,
    min_distance: f64,
    relaxations: u32,
}

impl MapGenerator {
    #[must_use]
    pub fn new(params: GenerationParams) -> Self {
        Self {
            params,
            cancel: None,
        }
    }

    /// Флаг проверяется только между фазами
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[must_use]
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn generate(&self, seed: impl Into<Seed>) -> Result<MapData, GenerationError> {
        let seed = seed.into().canonical();
        let params = &self.params;
        let fail = |phase: Phase, kind: MapError| GenerationError {
            phase,
            seed,
            params: Box::new(params.clone()),
            kind,
        };

        params.validate().map_err(|e| fail(Phase::Configuration, e))?;
        let rng = RandomSource::new(seed, params.random_algorithm);
        let rect = Rect::new(params.width, params.height);
        info!(seed, points = params.num_points, algorithm = %params.random_algorithm, "generating map");

        self.checkpoint(Phase::Sampling).map_err(|e| fail(Phase::Sampling, e))?;
        let sites = self.sample(rect, &rng).map_err(|e| fail(Phase::Sampling, e))?;
        info!(seed, placed = sites.points.len(), relaxations = sites.relaxations, "sampling done");

        self.checkpoint(Phase::Voronoi).map_err(|e| fail(Phase::Voronoi, e))?;
        let spacing = (rect.area() / params.num_points as f64).sqrt();
        let graph = voronoi::build(sites.points, rect, spacing, &rng).map_err(|e| fail(Phase::Voronoi, e))?;
        info!(seed, cells = graph.len(), relocated = graph.relocated, "voronoi done");

        self.checkpoint(Phase::Heightmap).map_err(|e| fail(Phase::Heightmap, e))?;
        let terrain = heightmap::generate(&graph, &params.heightmap, &rng);
        info!(seed, land = terrain.land_count(), features = terrain.features.len(), "heightmap done");

        self.checkpoint(Phase::Climate).map_err(|e| fail(Phase::Climate, e))?;
        let climate = climate::generate(&graph, &terrain, &params.resolved_climate());
        info!(seed, "climate done");

        self.checkpoint(Phase::Hydrology).map_err(|e| fail(Phase::Hydrology, e))?;
        let hydrology = hydrology::generate(&graph, &terrain, &climate.precipitation, &params.hydrology)
            .map_err(|e| fail(Phase::Hydrology, e))?;
        info!(seed, rivers = hydrology.rivers.len(), raised = hydrology.raised_cells, "hydrology done");

        self.checkpoint(Phase::Biomes).map_err(|e| fail(Phase::Biomes, e))?;
        let layer = biome::classify(
            &graph,
            &terrain,
            &hydrology.filled_heights,
            &climate,
            &hydrology.river_of,
            &params.biomes,
        );
        info!(seed, "biomes done");

        self.checkpoint(Phase::Political).map_err(|e| fail(Phase::Political, e))?;
        let input = PoliticalInput {
            graph: &graph,
            terrain: &terrain,
            heights: &hydrology.filled_heights,
            biomes: &layer.biomes,
            river_of: &hydrology.river_of,
        };
        let political = political::generate(&input, &params.political, &rng).map_err(|e| fail(Phase::Political, e))?;
        info!(
            seed,
            states = political.states.len(),
            cultures = political.cultures.len(),
            unclaimed = political.unclaimed_land,
            "political done"
        );

        self.checkpoint(Phase::Assembly).map_err(|e| fail(Phase::Assembly, e))?;
        let parts = Parts {
            graph,
            terrain,
            climate,
            hydrology,
            layer,
            political,
        };
        let map = parts.assemble(seed, params.clone(), sites.min_distance, sites.relaxations);
        info!(seed, checksum = %map.checksum(), "map assembled");
        Ok(map)
    }

    fn checkpoint(&self, phase: Phase) -> Result<(), MapError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => {
                warn!(%phase, "generation cancelled");
                Err(MapError::Cancelled { phase })
            }
            _ => Ok(()),
        }
    }

    /// Выборка точек; при нехватке места расстояние ослабляется
    fn sample(&self, rect: Rect, rng: &RandomSource) -> Result<Sites, MapError> {
        let settings = &self.params.sampling;
        let mut min_distance = min_distance_for(rect, self.params.num_points, settings.min_distance_factor);
        let mut attempt = 0;
        loop {
            let mut stream = rng.child("sampling", u64::from(attempt));
            match sample_points(
                rect,
                self.params.num_points,
                min_distance,
                settings.attempts_per_point,
                &mut stream,
            ) {
                Ok(points) => {
                    return Ok(Sites {
                        points,
                        min_distance,
                        relaxations: attempt,
                    });
                }
                Err(MapError::SamplingExhausted { deficit, .. }) if attempt < settings.max_relaxations => {
                    attempt += 1;
                    min_distance *= settings.relaxation_factor;
                    warn!(attempt, deficit, min_distance, "sampling exhausted, relaxing min distance");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Результаты всех фаз, из которых собирается карта
struct Parts {
    graph: CellGraph,
    terrain: Terrain,
    climate: Climate,
    hydrology: Hydrology,
    layer: BiomeLayer,
    political: Political,
}

impl Parts {
    fn assemble(self, seed: u64, params: GenerationParams, min_distance: f64, sampler_relaxations: u32) -> MapData {
        let Parts {
            graph,
            terrain,
            climate,
            hydrology,
            layer,
            political,
        } = self;
        let relocated_sites = graph.relocated;
        let perturbation_retries = graph.perturbation_retries;

        let CellGraph {
            sites,
            neighbors,
            polygons,
            areas,
            border,
            ..
        } = graph;

        let cells: Vec<Cell> = sites
            .into_iter()
            .zip(neighbors)
            .zip(polygons)
            .enumerate()
            .map(|(i, ((site, neighbors), polygon))| Cell {
                id: i as u32,
                site,
                polygon,
                neighbors,
                height: hydrology.filled_heights[i],
                kind: terrain.kinds[i],
                coastal: terrain.coastal[i],
                biome: layer.biomes[i],
                state: political.state_of[i],
                area: areas[i],
                border: border[i],
                feature: terrain.feature_of[i],
                temperature: climate.temperature[i],
                precipitation: climate.precipitation[i],
                moisture: layer.moisture[i],
                flux: hydrology.flux[i],
                river: hydrology.river_of[i],
                culture: political.culture_of[i],
            })
            .collect();

        let count = |kind: CellKind| cells.iter().filter(|c| c.kind == kind).count();
        let land_cells = count(CellKind::Land);
        let rivers = hydrology.rivers;
        let total_river_cells: usize = rivers.iter().map(|r| r.cells.len()).sum();

        let metadata = MapMetadata {
            algorithm: params.random_algorithm,
            cell_count: cells.len(),
            land_cells,
            ocean_cells: count(CellKind::Ocean),
            lake_cells: count(CellKind::Lake),
            land_fraction: land_cells as f64 / cells.len().max(1) as f64,
            river_count: rivers.len(),
            mean_river_length: if rivers.is_empty() {
                0.0
            } else {
                total_river_cells as f64 / rivers.len() as f64
            },
            longest_river: rivers.iter().map(|r| r.cells.len()).max().unwrap_or(0),
            min_distance,
            sampler_relaxations,
            relocated_sites,
            perturbation_retries,
            states_requested: political.states_requested,
            states_placed: political.states.len(),
            unclaimed_land: political.unclaimed_land,
        };

        MapData {
            seed,
            params,
            cells,
            rivers,
            states: political.states,
            cultures: political.cultures,
            features: terrain.features,
            metadata,
        }
    }
}
