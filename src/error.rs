// src/error.rs
//! Ошибки генерации карты
//!
//! Два уровня:
//! - [`MapError`]: что именно пошло не так (возвращается фазами);
//! - [`GenerationError`]: та же ошибка с контекстом воспроизведения:
//!   фаза, канонический сид и параметры, на которых она возникла.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::GenerationParams;
use crate::geometry::Point;

/// Фаза конвейера генерации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Configuration,
    Sampling,
    Voronoi,
    Heightmap,
    Climate,
    Hydrology,
    Biomes,
    Political,
    Assembly,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Configuration => "configuration",
            Phase::Sampling => "sampling",
            Phase::Voronoi => "voronoi",
            Phase::Heightmap => "heightmap",
            Phase::Climate => "climate",
            Phase::Hydrology => "hydrology",
            Phase::Biomes => "biomes",
            Phase::Political => "political",
            Phase::Assembly => "assembly",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("sampling exhausted: placed {} of {requested} points (deficit {deficit})", .placed.len())]
    SamplingExhausted {
        placed: Vec<Point>,
        requested: usize,
        deficit: usize,
    },

    #[error("degenerate geometry after {retries} retries: {reason}")]
    GeometryDegenerate { reason: String, retries: u32 },

    #[error("depressions unresolved after {passes} passes: {remaining} land cells without outflow")]
    HydrologyDepressionUnresolved { passes: u32, remaining: usize },

    #[error("political assignment incomplete: {unclaimed} land cells unreached (first: {first_cell})")]
    PoliticalAssignmentIncomplete { unclaimed: usize, first_cell: u32 },

    #[error("generation cancelled before the {phase} phase")]
    Cancelled { phase: Phase },
}

impl MapError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        MapError::Configuration {
            reason: reason.into(),
        }
    }

    /// Может ли вызывающий исправить ситуацию, изменив входные данные
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MapError::Configuration { .. } | MapError::SamplingExhausted { .. }
        )
    }
}

/// Result type alias for phase-level operations
pub type MapResult<T> = Result<T, MapError>;

/// Ошибка генерации с контекстом для воспроизводимого отчёта
#[derive(Error, Debug)]
#[error("{phase} phase failed for seed {seed}: {kind}")]
pub struct GenerationError {
    pub phase: Phase,
    pub seed: u64,
    pub params: Box<GenerationParams>,
    #[source]
    pub kind: MapError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_display() {
        let err = MapError::SamplingExhausted {
            placed: vec![Point::new(1.0, 1.0); 3],
            requested: 10,
            deficit: 7,
        };
        assert_eq!(
            err.to_string(),
            "sampling exhausted: placed 3 of 10 points (deficit 7)"
        );
        assert!(err.is_recoverable());

        let err = MapError::HydrologyDepressionUnresolved {
            passes: 3,
            remaining: 2,
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_generation_error_carries_context() {
        let err = GenerationError {
            phase: Phase::Political,
            seed: 42,
            params: Box::default(),
            kind: MapError::PoliticalAssignmentIncomplete {
                unclaimed: 5,
                first_cell: 17,
            },
        };
        let text = err.to_string();
        assert!(text.starts_with("political phase failed for seed 42"));
        assert!(text.contains("first: 17"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
