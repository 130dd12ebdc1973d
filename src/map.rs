// src/map.rs
//! Результат генерации: плотный массив клеток и всё, что на нём построено
//!
//! Клетка адресуется своим `id`, который совпадает с индексом в `MapData::cells`.
//! Реки, государства и культуры ссылаются на клетки только по `id`.

use serde::Serialize;

use crate::biome::Biome;
use crate::checksum::{Checksum, fingerprint};
use crate::config::GenerationParams;
use crate::geometry::Point;
use crate::random::RandomAlgorithm;

/// Тип поверхности клетки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CellKind {
    Land,
    Ocean,
    Lake,
}

impl CellKind {
    #[must_use]
    pub fn is_water(self) -> bool {
        !matches!(self, CellKind::Land)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Cell {
    pub id: u32,
    pub site: Point,
    /// Граница клетки против часовой стрелки, обрезанная прямоугольником карты
    pub polygon: Vec<Point>,
    /// Соседи против часовой стрелки вокруг `site`
    pub neighbors: Vec<u32>,
    /// Нормированная высота после заполнения впадин
    pub height: f32,
    pub kind: CellKind,
    /// Есть и сухопутный, и океанический сосед
    pub coastal: bool,
    pub biome: Biome,
    pub state: Option<u32>,
    pub area: f64,
    /// Клетка касается края карты
    pub border: bool,
    pub feature: u32,
    pub temperature: f32,
    pub precipitation: f32,
    pub moisture: f32,
    /// Накопленный сток
    pub flux: f32,
    pub river: Option<u32>,
    pub culture: Option<u32>,
}

impl Cell {
    #[must_use]
    pub fn is_land(&self) -> bool {
        self.kind == CellKind::Land
    }
}

/// Чем заканчивается река
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiverMouth {
    Ocean,
    Lake,
    /// Впадает в другую реку; последняя клетка пути — место слияния
    Confluence(u32),
    /// Уходит за край карты
    MapEdge,
    /// Упирается в бессточную впадину (только без заполнения впадин)
    Sink,
}

#[derive(Debug, Clone, Serialize)]
pub struct River {
    pub id: u32,
    /// Клетки от истока к устью
    pub cells: Vec<u32>,
    pub discharge: f32,
    pub mouth: RiverMouth,
    pub parent: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct State {
    pub id: u32,
    pub capital: u32,
    pub culture: u32,
    /// Клетки территории по возрастанию
    pub cells: Vec<u32>,
    pub area: f64,
    /// Соседние государства по возрастанию
    pub neighbors: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Culture {
    pub id: u32,
    pub center: u32,
    pub cells: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureKind {
    Ocean,
    Lake,
    Island,
}

/// Связная область клеток одного типа
#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    pub id: u32,
    pub kind: FeatureKind,
    pub cells: usize,
    /// Касается края карты
    pub border: bool,
}

/// Сводка по карте
#[derive(Debug, Clone, Serialize)]
pub struct MapMetadata {
    pub algorithm: RandomAlgorithm,
    pub cell_count: usize,
    pub land_cells: usize,
    pub ocean_cells: usize,
    pub lake_cells: usize,
    pub land_fraction: f64,
    pub river_count: usize,
    pub mean_river_length: f64,
    pub longest_river: usize,
    /// Итоговое минимальное расстояние выборки
    pub min_distance: f64,
    pub sampler_relaxations: u32,
    pub relocated_sites: usize,
    pub perturbation_retries: u32,
    pub states_requested: usize,
    pub states_placed: usize,
    pub unclaimed_land: usize,
}

/// Готовая карта. Не изменяется после генерации.
#[derive(Debug, Clone, Serialize)]
pub struct MapData {
    pub seed: u64,
    pub params: GenerationParams,
    pub cells: Vec<Cell>,
    pub rivers: Vec<River>,
    pub states: Vec<State>,
    pub cultures: Vec<Culture>,
    pub features: Vec<Feature>,
    pub metadata: MapMetadata,
}

impl MapData {
    #[must_use]
    pub fn checksum(&self) -> Checksum {
        fingerprint(self)
    }

    #[must_use]
    pub fn cell(&self, id: u32) -> Option<&Cell> {
        self.cells.get(id as usize)
    }

    pub fn land_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter().filter(|c| c.is_land())
    }
}
