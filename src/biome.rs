// src/biome.rs
//! Биомы клеток
//!
//! Биом суши берётся из таблицы «температура × влажность», затем поверх неё
//! накладываются высотные и прибрежные исключения. Вода всегда `Marine`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::climate::Climate;
use crate::config::BiomeSettings;
use crate::heightmap::Terrain;
use crate::parallel::map_indexed;
use crate::voronoi::CellGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    /// Любая вода: океан и озёра
    Marine,
    Glacier,
    Tundra,
    Taiga,
    ColdDesert,
    Grassland,
    TemperateForest,
    TemperateRainforest,
    Savanna,
    HotDesert,
    TropicalSeasonalForest,
    TropicalRainforest,
    Wetland,
    Mountain,
}

/// Строки — пояса температуры (от холодных), столбцы — пояса влажности (от сухих)
const TABLE: [[Biome; 5]; 6] = [
    [
        Biome::Tundra,
        Biome::Tundra,
        Biome::Glacier,
        Biome::Glacier,
        Biome::Glacier,
    ],
    [
        Biome::ColdDesert,
        Biome::Tundra,
        Biome::Tundra,
        Biome::Taiga,
        Biome::Taiga,
    ],
    [
        Biome::ColdDesert,
        Biome::Grassland,
        Biome::Taiga,
        Biome::Taiga,
        Biome::TemperateRainforest,
    ],
    [
        Biome::Grassland,
        Biome::Grassland,
        Biome::TemperateForest,
        Biome::TemperateForest,
        Biome::TemperateRainforest,
    ],
    [
        Biome::HotDesert,
        Biome::Savanna,
        Biome::Grassland,
        Biome::TemperateForest,
        Biome::TropicalSeasonalForest,
    ],
    [
        Biome::HotDesert,
        Biome::HotDesert,
        Biome::Savanna,
        Biome::TropicalSeasonalForest,
        Biome::TropicalRainforest,
    ],
];

const TEMPERATURE_BANDS: [f32; 5] = [0.15, 0.3, 0.45, 0.65, 0.8];
const MOISTURE_BANDS: [f32; 4] = [0.2, 0.4, 0.6, 0.8];

impl Biome {
    pub const ALL: [Biome; 14] = [
        Biome::Marine,
        Biome::Glacier,
        Biome::Tundra,
        Biome::Taiga,
        Biome::ColdDesert,
        Biome::Grassland,
        Biome::TemperateForest,
        Biome::TemperateRainforest,
        Biome::Savanna,
        Biome::HotDesert,
        Biome::TropicalSeasonalForest,
        Biome::TropicalRainforest,
        Biome::Wetland,
        Biome::Mountain,
    ];

    /// Стабильный номер для контрольной суммы
    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Пригодность для жизни, `[0, 1]`
    #[must_use]
    pub fn habitability(self) -> f32 {
        match self {
            Biome::Marine | Biome::Glacier => 0.0,
            Biome::Mountain => 0.02,
            Biome::Tundra | Biome::ColdDesert | Biome::HotDesert => 0.04,
            Biome::Taiga | Biome::Wetland => 0.12,
            Biome::Savanna => 0.22,
            Biome::Grassland => 0.3,
            Biome::TropicalSeasonalForest => 0.5,
            Biome::TropicalRainforest => 0.8,
            Biome::TemperateRainforest => 0.9,
            Biome::TemperateForest => 1.0,
        }
    }

    /// Стоимость прохода через клетку относительно степи
    #[must_use]
    pub fn movement_cost(self) -> f32 {
        match self {
            Biome::Marine => 0.2,
            Biome::Grassland => 1.0,
            Biome::Savanna => 1.2,
            Biome::TemperateForest | Biome::TropicalSeasonalForest => 1.4,
            Biome::TropicalRainforest => 1.6,
            Biome::TemperateRainforest => 1.8,
            Biome::ColdDesert | Biome::Wetland => 3.0,
            Biome::HotDesert | Biome::Taiga => 4.0,
            Biome::Tundra => 6.0,
            Biome::Mountain => 8.0,
            Biome::Glacier => 100.0,
        }
    }
}

/// Биомы и итоговая влажность клеток
#[derive(Debug, Clone)]
pub struct BiomeLayer {
    pub biomes: Vec<Biome>,
    pub moisture: Vec<f32>,
}

/// Назначает биомы на основе высоты, температуры и влажности
///
/// `heights`: высоты после заполнения впадин.
#[must_use]
pub fn classify(
    graph: &CellGraph,
    terrain: &Terrain,
    heights: &[f32],
    climate: &Climate,
    river_of: &[Option<u32>],
    settings: &BiomeSettings,
) -> BiomeLayer {
    let distance = water_distance(graph, terrain, river_of);
    let moisture = map_indexed(graph.len(), |i| {
        let bonus = if river_of[i].is_some() {
            settings.river_moisture_bonus
        } else {
            0.0
        };
        (0.6 * climate.precipitation[i] + 0.4 / (1.0 + distance[i] as f32) + bonus).clamp(0.0, 1.0)
    });

    let biomes = map_indexed(graph.len(), |i| {
        if terrain.kinds[i].is_water() {
            return Biome::Marine;
        }
        let elevation = heights[i];
        let temperature = climate.temperature[i];

        // Горы: на холоде превращаются в ледник, а не в голые скалы
        if elevation > settings.mountain_height {
            return Biome::Mountain;
        }
        if elevation > settings.alpine_height && temperature < TEMPERATURE_BANDS[1] {
            return Biome::Glacier;
        }
        // Болото: низина у воды с высокой влажностью, не в мерзлоте
        if distance[i] <= 1
            && elevation < terrain.sea_level + settings.wetland_band
            && moisture[i] > MOISTURE_BANDS[3]
            && temperature >= TEMPERATURE_BANDS[0]
        {
            return Biome::Wetland;
        }
        table_biome(temperature, moisture[i])
    });

    debug!(
        land = biomes.iter().filter(|&&b| b != Biome::Marine).count(),
        "biomes classified"
    );
    BiomeLayer { biomes, moisture }
}

fn table_biome(temperature: f32, moisture: f32) -> Biome {
    let t = TEMPERATURE_BANDS.iter().take_while(|&&b| temperature >= b).count();
    let m = MOISTURE_BANDS.iter().take_while(|&&b| moisture >= b).count();
    TABLE[t][m]
}

/// Число шагов до ближайшей воды или реки
fn water_distance(graph: &CellGraph, terrain: &Terrain, river_of: &[Option<u32>]) -> Vec<u32> {
    let mut distance = vec![u32::MAX; graph.len()];
    let mut queue = VecDeque::new();
    for i in 0..graph.len() {
        if terrain.kinds[i].is_water() || river_of[i].is_some() {
            distance[i] = 0;
            queue.push_back(i);
        }
    }
    while let Some(c) = queue.pop_front() {
        for &nb in &graph.neighbors[c] {
            let nb = nb as usize;
            if distance[nb] == u32::MAX {
                distance[nb] = distance[c] + 1;
                queue.push_back(nb);
            }
        }
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate;
    use crate::config::{ClimateSettings, HeightmapSettings};
    use crate::geometry::Rect;
    use crate::heightmap;
    use crate::random::{RandomAlgorithm, RandomSource};
    use crate::sampling::{min_distance_for, sample_points};
    use crate::voronoi;

    #[test]
    fn test_ids_are_stable_and_unique() {
        for (i, biome) in Biome::ALL.iter().enumerate() {
            assert_eq!(biome.id() as usize, i);
        }
    }

    #[test]
    fn test_table_bands() {
        assert_eq!(table_biome(0.05, 0.9), Biome::Glacier);
        assert_eq!(table_biome(0.2, 0.1), Biome::ColdDesert);
        assert_eq!(table_biome(0.5, 0.5), Biome::TemperateForest);
        assert_eq!(table_biome(0.95, 0.05), Biome::HotDesert);
        assert_eq!(table_biome(0.95, 0.95), Biome::TropicalRainforest);
        assert_eq!(table_biome(1.0, 1.0), Biome::TropicalRainforest);
        assert_eq!(table_biome(0.0, 0.0), Biome::Tundra);
    }

    #[test]
    fn test_every_cell_gets_a_biome() {
        let rect = Rect::new(600.0, 300.0);
        let n = 1200;
        let rng = RandomSource::new(21, RandomAlgorithm::Pcg64);
        let r = min_distance_for(rect, n, 0.7);
        let sites = sample_points(rect, n, r, 40, &mut rng.child("sampling", 0)).unwrap();
        let graph = voronoi::build(sites, rect, (rect.area() / n as f64).sqrt(), &rng).unwrap();
        let terrain = heightmap::generate(&graph, &HeightmapSettings::default(), &rng);
        let climate = climate::generate(&graph, &terrain, &ClimateSettings::default());
        let river_of = vec![None; graph.len()];

        let layer = classify(&graph, &terrain, &terrain.heights, &climate, &river_of, &BiomeSettings::default());
        assert_eq!(layer.biomes.len(), graph.len());
        for i in 0..graph.len() {
            assert_eq!(terrain.kinds[i].is_water(), layer.biomes[i] == Biome::Marine);
            assert!((0.0..=1.0).contains(&layer.moisture[i]));
        }
    }

    #[test]
    fn test_costs_are_positive() {
        for biome in Biome::ALL {
            assert!(biome.movement_cost() > 0.0);
            assert!((0.0..=1.0).contains(&biome.habitability()));
        }
    }

    #[test]
    fn test_cold_lands_cost_order() {
        assert!(Biome::Taiga.movement_cost() < Biome::Tundra.movement_cost());
        assert!(Biome::Tundra.movement_cost() < Biome::Mountain.movement_cost());
        assert!(Biome::Mountain.movement_cost() < Biome::Glacier.movement_cost());
    }
}
