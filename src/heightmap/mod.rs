// src/heightmap/mod.rs
//! Рельеф клеток
//!
//! Сценарий операций выполняется над изначально плоским полем, затем высоты
//! растягиваются на `[0, 1]` и (по умолчанию) монотонно перекраиваются так,
//! чтобы доля суши совпала с целевой. После этого клетки делятся на сушу,
//! океан и озёра.

mod ops;
pub mod templates;
mod water;

pub use ops::{HeightOp, Placement, StraitDirection};
pub use water::{classify_water, coastal_flags, features};

use tracing::debug;

use crate::config::HeightmapSettings;
use crate::map::{CellKind, Feature};
use crate::random::RandomSource;
use crate::voronoi::CellGraph;
use ops::OpContext;

/// Рельеф и разметка воды
#[derive(Debug, Clone)]
pub struct Terrain {
    pub heights: Vec<f32>,
    pub kinds: Vec<CellKind>,
    pub coastal: Vec<bool>,
    /// Номер связной области каждой клетки
    pub feature_of: Vec<u32>,
    pub features: Vec<Feature>,
    pub sea_level: f32,
}

impl Terrain {
    #[must_use]
    pub fn land_count(&self) -> usize {
        self.kinds.iter().filter(|&&k| k == CellKind::Land).count()
    }

    /// Пересчитывает типы клеток, береговые флаги и области по текущим высотам
    pub(crate) fn reclassify(&mut self, graph: &CellGraph) {
        self.kinds = classify_water(graph, &self.heights, self.sea_level);
        self.coastal = coastal_flags(graph, &self.kinds);
        let (feature_of, features) = features(graph, &self.kinds);
        self.feature_of = feature_of;
        self.features = features;
    }
}

/// Выполняет сценарий рельефа; операция `i` использует поток `("heightmap", i)`
#[must_use]
pub fn generate(graph: &CellGraph, settings: &HeightmapSettings, rng: &RandomSource) -> Terrain {
    let script = settings.resolved_script();
    let locator = graph.locator();
    let ctx = OpContext {
        graph,
        locator: &locator,
        sea_level: settings.sea_level,
    };

    let mut heights = vec![0.0_f32; graph.len()];
    for (i, op) in script.iter().enumerate() {
        let mut op_rng = rng.child("heightmap", i as u64);
        op.apply(&mut heights, &ctx, &mut op_rng);
        debug!(step = i, op = op.name(), "heightmap operation applied");
    }

    ops::normalize(&mut heights);
    if settings.fit_land {
        fit_land_ratio(&mut heights, settings.resolved_land_ratio(), settings.sea_level);
    }

    let mut terrain = Terrain {
        heights,
        kinds: Vec::new(),
        coastal: Vec::new(),
        feature_of: Vec::new(),
        features: Vec::new(),
        sea_level: settings.sea_level,
    };
    terrain.reclassify(graph);
    terrain
}

/// Монотонная кусочно-линейная перекройка: квантиль `1 - ratio` ложится ровно на `sea_level`
pub(crate) fn fit_land_ratio(heights: &mut [f32], ratio: f32, sea_level: f32) {
    let n = heights.len();
    if n == 0 {
        return;
    }
    let mut sorted = heights.to_vec();
    sorted.sort_by(f32::total_cmp);

    let idx = (((1.0 - f64::from(ratio)) * n as f64).round() as usize).min(n - 1);
    let q = sorted[idx];
    let min = sorted[0];
    let max = sorted[n - 1];
    // Наибольшее число строго ниже уровня моря
    let below_sea = f32::from_bits(sea_level.to_bits() - 1);

    for h in heights.iter_mut() {
        *h = if *h < q {
            let t = if q > min { (*h - min) / (q - min) } else { 0.0 };
            (t * sea_level).min(below_sea)
        } else {
            let t = if max > q { (*h - q) / (max - q) } else { 0.0 };
            (sea_level + t * (1.0 - sea_level)).clamp(sea_level, 1.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldType;
    use crate::geometry::Rect;
    use crate::random::RandomAlgorithm;
    use crate::sampling::{min_distance_for, sample_points};
    use crate::voronoi;

    fn graph(n: usize, seed: u64) -> CellGraph {
        let rect = Rect::new(512.0, 256.0);
        let rng = RandomSource::new(seed, RandomAlgorithm::Pcg64);
        let r = min_distance_for(rect, n, 0.7);
        let sites = sample_points(rect, n, r, 40, &mut rng.child("sampling", 0)).unwrap();
        voronoi::build(sites, rect, (rect.area() / n as f64).sqrt(), &rng).unwrap()
    }

    #[test]
    fn test_fit_land_ratio_hits_target() {
        let mut heights: Vec<f32> = (0..1000).map(|i| ((i * 37) % 1000) as f32 / 999.0).collect();
        fit_land_ratio(&mut heights, 0.3, 0.2);
        let land = heights.iter().filter(|&&h| h >= 0.2).count();
        assert_eq!(land, 300);
        assert!(heights.iter().all(|&h| (0.0..=1.0).contains(&h)));
    }

    #[test]
    fn test_fit_preserves_order() {
        let original: Vec<f32> = (0..200).map(|i| ((i * 91) % 200) as f32 * 0.01).collect();
        let mut fitted = original.clone();
        fit_land_ratio(&mut fitted, 0.4, 0.25);
        for i in 0..original.len() {
            for j in 0..original.len() {
                if original[i] < original[j] {
                    assert!(fitted[i] <= fitted[j]);
                }
            }
        }
    }

    #[test]
    fn test_world_types_produce_land_and_ocean() {
        let g = graph(1200, 9);
        for world_type in [WorldType::EarthLike, WorldType::Archipelago, WorldType::Mediterranean] {
            let settings = HeightmapSettings {
                world_type,
                ..HeightmapSettings::default()
            };
            let rng = RandomSource::new(77, RandomAlgorithm::Pcg64);
            let terrain = generate(&g, &settings, &rng);

            let ratio = terrain.land_count() as f32 / g.len() as f32;
            let target = world_type.target_land_ratio();
            assert!((ratio - target).abs() < 0.05, "{world_type:?}: {ratio}");
            assert!(terrain.kinds.contains(&CellKind::Ocean));
        }
    }

    #[test]
    fn test_coastal_cells_touch_land_and_ocean() {
        let g = graph(800, 2);
        let terrain = generate(&g, &HeightmapSettings::default(), &RandomSource::new(5, RandomAlgorithm::Pcg64));
        assert!(terrain.coastal.iter().any(|&c| c));
        for (i, &coastal) in terrain.coastal.iter().enumerate() {
            let ns = &g.neighbors[i];
            let land = ns.iter().any(|&n| terrain.kinds[n as usize] == CellKind::Land);
            let ocean = ns.iter().any(|&n| terrain.kinds[n as usize] == CellKind::Ocean);
            assert_eq!(coastal, land && ocean);
        }
    }

    #[test]
    fn test_lakes_are_enclosed() {
        let g = graph(800, 4);
        let terrain = generate(&g, &HeightmapSettings::default(), &RandomSource::new(8, RandomAlgorithm::Pcg64));
        for (i, kind) in terrain.kinds.iter().enumerate() {
            if *kind == CellKind::Lake {
                assert!(!g.border[i]);
                for &n in &g.neighbors[i] {
                    assert_ne!(terrain.kinds[n as usize], CellKind::Ocean);
                }
            }
        }
    }

    #[test]
    fn test_features_partition_cells() {
        let g = graph(600, 6);
        let terrain = generate(&g, &HeightmapSettings::default(), &RandomSource::new(1, RandomAlgorithm::Pcg64));
        let total: usize = terrain.features.iter().map(|f| f.cells).sum();
        assert_eq!(total, g.len());
        for (i, ns) in g.neighbors.iter().enumerate() {
            for &n in ns {
                if terrain.kinds[i] == terrain.kinds[n as usize] {
                    assert_eq!(terrain.feature_of[i], terrain.feature_of[n as usize]);
                }
            }
        }
    }
}
