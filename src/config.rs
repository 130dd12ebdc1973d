// src/config.rs
//! Конфигурация генерации карты
//!
//! Этот модуль определяет все параметры, управляющие генерацией:
//! - Типы миров (землеподобный, архипелаг и т.д.) со своими сценариями рельефа
//! - Выборку точек и построение клеток
//! - Рельеф, климат, гидрологию, биомы
//! - Культуры и государства
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.
//! Каждое поле имеет значение по умолчанию, так что пустой файл: корректная конфигурация.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MapError, MapResult};
use crate::heightmap::HeightOp;
use crate::heightmap::templates;
use crate::random::RandomAlgorithm;

/// Допустимый диапазон числа точек
pub const MIN_POINTS: usize = 16;
/// Минимум клеток поперёк узкой стороны карты
pub const MIN_CELLS_ACROSS: f64 = 2.0;
pub const MAX_POINTS: usize = 100_000;

/// Тип генерируемого мира
///
/// Определяет сценарий рельефа по умолчанию, долю суши и климат.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WorldType {
    /// Землеподобный мир с несколькими континентами и океанами (≈30% суши)
    #[default]
    EarthLike,
    /// Один крупный суперконтинент с небольшими островами (≈70% суши)
    Supercontinent,
    /// Многочисленные острова и архипелаги, мало крупных континентов (≈15% суши)
    Archipelago,
    /// Большое внутреннее море, окружённое континентами (≈25% суши)
    Mediterranean,
    /// Ледниковый период: расширенные полярные шапки, больше льда и тундры (≈35% "суши", но большая часть непригодна)
    IceAgeEarth,
    /// Средиземноморье с преобладанием пустынь и засушливых биомов (≈20% суши)
    DesertMediterranean,
}

impl WorldType {
    /// Возвращает целевую долю суши для данного типа мира.
    ///
    /// # Примеры
    /// ```
    /// use cellmap::config::WorldType;
    /// assert_eq!(WorldType::EarthLike.target_land_ratio(), 0.30);
    /// assert_eq!(WorldType::Archipelago.target_land_ratio(), 0.15);
    /// ```
    #[must_use]
    pub fn target_land_ratio(self) -> f32 {
        match self {
            WorldType::EarthLike => 0.30,
            WorldType::Supercontinent => 0.70,
            WorldType::Archipelago => 0.15,
            WorldType::Mediterranean => 0.25,
            WorldType::IceAgeEarth => 0.35, // больше льда = больше "суши", но непригодной
            WorldType::DesertMediterranean => 0.20,
        }
    }

    /// Возвращает настройки климата по умолчанию для данного типа мира.
    ///
    /// # Особенности
    /// - `IceAgeEarth` имеет пониженную глобальную температуру и усиленное полярное охлаждение
    /// - `DesertMediterranean` суше и жарче остальных
    #[must_use]
    pub fn default_climate(self) -> ClimateSettings {
        match self {
            WorldType::IceAgeEarth => ClimateSettings {
                global_temperature_offset: -0.3,
                global_humidity_offset: 0.0,
                polar_amplification: 1.8,
            },
            WorldType::DesertMediterranean => ClimateSettings {
                global_temperature_offset: 0.1,
                global_humidity_offset: -0.25,
                polar_amplification: 1.0,
            },
            _ => ClimateSettings::default(),
        }
    }

    /// Сценарий рельефа по умолчанию
    #[must_use]
    pub fn default_script(self) -> Vec<HeightOp> {
        templates::script_for(self)
    }
}

/// Параметры выборки точек
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSettings {
    /// Множитель минимального расстояния: `r = factor · sqrt(W·H / N)`
    #[serde(default = "default_min_distance_factor")]
    pub min_distance_factor: f64,

    /// Бюджет попыток на одну точку
    #[serde(default = "default_attempts_per_point")]
    pub attempts_per_point: u32,

    /// Во сколько раз уменьшается `r` при повторной попытке
    #[serde(default = "default_relaxation_factor")]
    pub relaxation_factor: f64,

    /// Сколько раз можно ослабить `r`, прежде чем вернуть ошибку
    #[serde(default = "default_max_relaxations")]
    pub max_relaxations: u32,
}

fn default_min_distance_factor() -> f64 {
    0.7
}
fn default_attempts_per_point() -> u32 {
    40
}
fn default_relaxation_factor() -> f64 {
    0.85
}
fn default_max_relaxations() -> u32 {
    4
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            min_distance_factor: 0.7,
            attempts_per_point: 40,
            relaxation_factor: 0.85,
            max_relaxations: 4,
        }
    }
}

/// Настройки рельефа
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightmapSettings {
    /// Тип мира: задаёт сценарий и долю суши, если они не указаны явно
    #[serde(default)]
    pub world_type: WorldType,

    /// Явный сценарий операций; `None`: шаблон типа мира
    #[serde(default)]
    pub script: Option<Vec<HeightOp>>,

    /// Уровень моря в нормированных высотах
    #[serde(default = "default_sea_level")]
    pub sea_level: f32,

    /// Целевая доля суши; `None`: доля типа мира
    #[serde(default)]
    pub target_land_ratio: Option<f32>,

    /// Подгонять ли высоты под целевую долю суши
    #[serde(default = "default_true")]
    pub fit_land: bool,
}

fn default_sea_level() -> f32 {
    0.2
}
fn default_true() -> bool {
    true
}

impl Default for HeightmapSettings {
    fn default() -> Self {
        Self {
            world_type: WorldType::EarthLike,
            script: None,
            sea_level: 0.2,
            target_land_ratio: None,
            fit_land: true,
        }
    }
}

impl HeightmapSettings {
    /// Сценарий, который будет выполнен
    #[must_use]
    pub fn resolved_script(&self) -> Vec<HeightOp> {
        match &self.script {
            Some(script) => script.clone(),
            None => self.world_type.default_script(),
        }
    }

    #[must_use]
    pub fn resolved_land_ratio(&self) -> f32 {
        self.target_land_ratio
            .unwrap_or_else(|| self.world_type.target_land_ratio())
    }
}

/// Глобальные климатические модификаторы
///
/// Управляет распределением температуры и влажности по широте и высоте.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSettings {
    /// Глобальный сдвиг температуры (-1.0 = очень холодно, +1.0 = очень жарко)
    #[serde(default)]
    pub global_temperature_offset: f32,

    /// Глобальный сдвиг влажности (-1.0 = очень сухо, +1.0 = очень влажно)
    #[serde(default)]
    pub global_humidity_offset: f32,

    /// Усиление полярного эффекта:
    /// - `1.0`: стандартное охлаждение к полюсам
    /// - `>1.0`: более резкое охлаждение (широкие тундры/льды)
    /// - `<1.0`: более мягкое охлаждение (узкие полярные зоны)
    #[serde(default = "default_polar_amplification")]
    pub polar_amplification: f32,
}

fn default_polar_amplification() -> f32 {
    1.0
}

impl Default for ClimateSettings {
    fn default() -> Self {
        Self {
            global_temperature_offset: 0.0,
            global_humidity_offset: 0.0,
            polar_amplification: 1.0,
        }
    }
}

/// Настройки гидрологии
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrologySettings {
    /// Заполнять ли бессточные впадины. Отключение ломает монотонность рек
    /// и нужно только для регрессионных проверок.
    #[serde(default = "default_true")]
    pub fill_depressions: bool,

    #[serde(default = "default_max_fill_passes")]
    pub max_fill_passes: u32,

    /// Порог истока в единицах среднего осадка суши
    #[serde(default = "default_river_threshold")]
    pub river_threshold: f32,

    /// Реки короче этого числа клеток отбрасываются
    #[serde(default = "default_min_river_cells")]
    pub min_river_cells: usize,
}

fn default_max_fill_passes() -> u32 {
    3
}
fn default_river_threshold() -> f32 {
    20.0
}
fn default_min_river_cells() -> usize {
    3
}

impl Default for HydrologySettings {
    fn default() -> Self {
        Self {
            fill_depressions: true,
            max_fill_passes: 3,
            river_threshold: 20.0,
            min_river_cells: 3,
        }
    }
}

/// Пороги классификации биомов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeSettings {
    /// Выше этой высоты: горы
    #[serde(default = "default_mountain_height")]
    pub mountain_height: f32,

    /// Выше этой высоты в холодном климате: ледник
    #[serde(default = "default_alpine_height")]
    pub alpine_height: f32,

    /// Насколько выше уровня моря может лежать болото
    #[serde(default = "default_wetland_band")]
    pub wetland_band: f32,

    /// Прибавка влажности клеткам с рекой
    #[serde(default = "default_river_moisture_bonus")]
    pub river_moisture_bonus: f32,
}

fn default_mountain_height() -> f32 {
    0.85
}
fn default_alpine_height() -> f32 {
    0.75
}
fn default_wetland_band() -> f32 {
    0.04
}
fn default_river_moisture_bonus() -> f32 {
    0.15
}

impl Default for BiomeSettings {
    fn default() -> Self {
        Self {
            mountain_height: 0.85,
            alpine_height: 0.75,
            wetland_band: 0.04,
            river_moisture_bonus: 0.15,
        }
    }
}

/// Культуры и государства
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliticalSettings {
    #[serde(default = "default_num_states")]
    pub num_states: usize,

    #[serde(default = "default_num_cultures")]
    pub num_cultures: usize,

    /// Разрешить ничейные земли. Тогда экспансия останавливается на `max_expansion_cost`,
    /// а недостижимая суша получает `state = None` вместо ошибки.
    #[serde(default)]
    pub allow_wilderness: bool,

    #[serde(default = "default_max_expansion_cost")]
    pub max_expansion_cost: f64,

    /// Цена пересечения водной клетки (в шагах равнины)
    #[serde(default = "default_water_crossing_cost")]
    pub water_crossing_cost: f64,
}

fn default_num_states() -> usize {
    12
}
fn default_num_cultures() -> usize {
    6
}
fn default_max_expansion_cost() -> f64 {
    300.0
}
fn default_water_crossing_cost() -> f64 {
    8.0
}

impl Default for PoliticalSettings {
    fn default() -> Self {
        Self {
            num_states: 12,
            num_cultures: 6,
            allow_wilderness: false,
            max_expansion_cost: 300.0,
            water_crossing_cost: 8.0,
        }
    }
}

/// Основные параметры генерации
///
/// Полная конфигурация для генерации одной карты. Поддерживает загрузку из TOML-файлов.
/// Сид в параметры не входит: он передаётся в [`crate::generate`] отдельно.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Число клеток карты
    #[serde(default = "default_num_points")]
    pub num_points: usize,

    /// Ширина карты (по умолчанию 2048)
    #[serde(default = "default_width")]
    pub width: f64,

    /// Высота карты (по умолчанию 1024)
    #[serde(default = "default_height")]
    pub height: f64,

    #[serde(default)]
    pub random_algorithm: RandomAlgorithm,

    #[serde(default)]
    pub sampling: SamplingSettings,

    #[serde(default)]
    pub heightmap: HeightmapSettings,

    /// Климатические настройки; `None`: климат типа мира
    #[serde(default)]
    pub climate: Option<ClimateSettings>,

    #[serde(default)]
    pub hydrology: HydrologySettings,

    #[serde(default)]
    pub biomes: BiomeSettings,

    #[serde(default)]
    pub political: PoliticalSettings,
}

fn default_num_points() -> usize {
    4000
}
fn default_width() -> f64 {
    2048.0
}
fn default_height() -> f64 {
    1024.0
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            num_points: 4000,
            width: 2048.0,
            height: 1024.0,
            random_algorithm: RandomAlgorithm::Pcg64,
            sampling: SamplingSettings::default(),
            heightmap: HeightmapSettings::default(),
            climate: None,
            hydrology: HydrologySettings::default(),
            biomes: BiomeSettings::default(),
            political: PoliticalSettings::default(),
        }
    }
}

impl GenerationParams {
    /// Параметры по умолчанию с заданным числом точек
    #[must_use]
    pub fn with_points(num_points: usize) -> Self {
        Self {
            num_points,
            ..Self::default()
        }
    }

    /// Загружает параметры из TOML-файла
    ///
    /// # Ошибки
    /// Возвращает [`MapError::Configuration`], если файл не найден или содержит недопустимый формат.
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// num_points = 8000
    /// width = 1024
    /// height = 512
    ///
    /// [heightmap]
    /// world_type = "Archipelago"
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> MapResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| MapError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> MapResult<Self> {
        toml::from_str(contents).map_err(|e| MapError::config(format!("malformed TOML: {e}")))
    }

    /// Климат, который будет использован
    #[must_use]
    pub fn resolved_climate(&self) -> ClimateSettings {
        self.climate
            .clone()
            .unwrap_or_else(|| self.heightmap.world_type.default_climate())
    }

    /// Проверяет параметры до начала генерации
    pub fn validate(&self) -> MapResult<()> {
        if !(MIN_POINTS..=MAX_POINTS).contains(&self.num_points) {
            return Err(MapError::config(format!(
                "num_points must be in [{MIN_POINTS}, {MAX_POINTS}], got {}",
                self.num_points
            )));
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MapError::config(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        // В полосе в одну клетку у точек нет трёх соседей
        let spacing = (self.width * self.height / self.num_points as f64).sqrt();
        let across = self.width.min(self.height) / spacing;
        if across < MIN_CELLS_ACROSS {
            return Err(MapError::config(format!(
                "map {}x{} with {} points is only {across:.2} cells across, need at least {MIN_CELLS_ACROSS}",
                self.width, self.height, self.num_points
            )));
        }

        let s = &self.sampling;
        if !(s.min_distance_factor.is_finite() && s.min_distance_factor > 0.0) {
            return Err(MapError::config("sampling.min_distance_factor must be positive"));
        }
        if s.attempts_per_point == 0 {
            return Err(MapError::config("sampling.attempts_per_point must be positive"));
        }
        if !(s.relaxation_factor > 0.0 && s.relaxation_factor < 1.0) {
            return Err(MapError::config("sampling.relaxation_factor must be in (0, 1)"));
        }

        let h = &self.heightmap;
        in_unit_interval("heightmap.sea_level", h.sea_level)?;
        if let Some(ratio) = h.target_land_ratio {
            in_unit_interval("heightmap.target_land_ratio", ratio)?;
        }
        if let Some(script) = &h.script {
            if script.is_empty() {
                return Err(MapError::config("heightmap.script must not be empty"));
            }
            for (i, op) in script.iter().enumerate() {
                op.validate()
                    .map_err(|reason| MapError::config(format!("heightmap.script[{i}]: {reason}")))?;
            }
        }

        if let Some(c) = &self.climate {
            if !(c.polar_amplification.is_finite() && c.polar_amplification >= 0.0) {
                return Err(MapError::config("climate.polar_amplification must be non-negative"));
            }
        }

        let hy = &self.hydrology;
        if hy.max_fill_passes == 0 {
            return Err(MapError::config("hydrology.max_fill_passes must be positive"));
        }
        if !(hy.river_threshold.is_finite() && hy.river_threshold > 0.0) {
            return Err(MapError::config("hydrology.river_threshold must be positive"));
        }
        if hy.min_river_cells < 2 {
            return Err(MapError::config("hydrology.min_river_cells must be at least 2"));
        }

        let p = &self.political;
        if p.num_states == 0 {
            return Err(MapError::config("political.num_states must be at least 1"));
        }
        if p.num_cultures == 0 {
            return Err(MapError::config("political.num_cultures must be at least 1"));
        }
        if !(p.water_crossing_cost.is_finite() && p.water_crossing_cost > 0.0) {
            return Err(MapError::config("political.water_crossing_cost must be positive"));
        }
        if p.max_expansion_cost.is_nan() || p.max_expansion_cost <= 0.0 {
            return Err(MapError::config("political.max_expansion_cost must be positive"));
        }

        Ok(())
    }
}

fn in_unit_interval(name: &str, value: f32) -> MapResult<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(MapError::config(format!("{name} must be in (0, 1), got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GenerationParams::default().validate().is_ok());
        for world_type in [
            WorldType::EarthLike,
            WorldType::Supercontinent,
            WorldType::Archipelago,
            WorldType::Mediterranean,
            WorldType::IceAgeEarth,
            WorldType::DesertMediterranean,
        ] {
            let script = world_type.default_script();
            assert!(!script.is_empty());
            assert!(script.iter().all(|op| op.validate().is_ok()), "{world_type:?}");
        }
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let params = GenerationParams::from_toml_str("").unwrap();
        assert_eq!(params, GenerationParams::default());
    }

    #[test]
    fn test_toml_with_script() {
        let params = GenerationParams::from_toml_str(
            r#"
            num_points = 2000
            random_algorithm = "chacha8"

            [heightmap]
            world_type = "Archipelago"
            sea_level = 0.25

            [[heightmap.script]]
            op = "hill"
            count = [2, 3]
            height = [0.5, 0.9]
            x = [0.2, 0.8]
            y = [0.2, 0.8]

            [[heightmap.script]]
            op = "strait"
            width = 3
            direction = "vertical"

            [[heightmap.script]]
            op = "normalize"

            [political]
            num_states = 5
            allow_wilderness = true
            "#,
        )
        .unwrap();

        assert_eq!(params.num_points, 2000);
        assert_eq!(params.random_algorithm, RandomAlgorithm::ChaCha8);
        assert_eq!(params.heightmap.world_type, WorldType::Archipelago);
        assert_eq!(params.heightmap.script.as_ref().map(Vec::len), Some(3));
        assert_eq!(params.political.num_states, 5);
        assert!(params.political.allow_wilderness);
        assert_eq!(params.political.num_cultures, 6);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_unknown_algorithm_is_configuration_error() {
        let err = GenerationParams::from_toml_str(r#"random_algorithm = "mt19937""#).unwrap_err();
        assert!(matches!(err, MapError::Configuration { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut p = GenerationParams::with_points(10);
        assert!(p.validate().is_err());

        p = GenerationParams::default();
        p.width = 0.0;
        assert!(p.validate().is_err());

        p = GenerationParams::default();
        p.height = f64::NAN;
        assert!(p.validate().is_err());

        p = GenerationParams::default();
        p.heightmap.sea_level = 1.0;
        assert!(p.validate().is_err());

        p = GenerationParams::default();
        p.political.num_states = 0;
        assert!(p.validate().is_err());

        p = GenerationParams::default();
        p.heightmap.script = Some(Vec::new());
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_thin_strip_is_rejected() {
        let mut p = GenerationParams::with_points(100);
        p.width = 1000.0;
        p.height = 10.0;
        let err = p.validate().unwrap_err();
        assert!(matches!(err, MapError::Configuration { .. }));
        assert!(err.to_string().contains("cells across"));

        // Пять клеток поперёк
        p.height = 250.0;
        p.num_points = 100;
        p.width = 250.0 * 4.0;
        assert!(p.validate().is_ok());

        p = GenerationParams::with_points(16);
        p.width = 10.0;
        p.height = 10.0;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_world_type_climate() {
        let params = GenerationParams {
            heightmap: HeightmapSettings {
                world_type: WorldType::IceAgeEarth,
                ..HeightmapSettings::default()
            },
            ..GenerationParams::default()
        };
        assert!(params.resolved_climate().global_temperature_offset < 0.0);
        assert_eq!(params.heightmap.resolved_land_ratio(), 0.35);
    }
}
