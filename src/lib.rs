//! Детерминированный генератор карт мира на клетках Вороного
//!
//! Конвейер: точки → граф клеток → рельеф → климат → гидрология → биомы → политика.
//! Один и тот же сид с одними и теми же параметрами всегда даёт одну и ту же карту
//! (и один и тот же [`Checksum`]).

pub mod biome;
pub mod checksum;
pub mod climate;
pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod heightmap;
pub mod hydrology;
pub mod map;
mod parallel;
pub mod political;
pub mod random;
pub mod sampling;
pub mod validate;
pub mod voronoi;

pub use biome::Biome;
pub use checksum::Checksum;
pub use config::{
    BiomeSettings, ClimateSettings, GenerationParams, HeightmapSettings, HydrologySettings, PoliticalSettings,
    SamplingSettings, WorldType,
};
pub use error::{GenerationError, MapError, MapResult, Phase};
pub use generator::{MapGenerator, generate};
pub use geometry::{Point, Rect};
pub use heightmap::HeightOp;
pub use map::{Cell, CellKind, Culture, Feature, FeatureKind, MapData, MapMetadata, River, RiverMouth, State};
pub use random::{RandomAlgorithm, RandomSource, Seed};
