// src/heightmap/templates.rs
//! Сценарии рельефа по умолчанию для каждого типа мира
//!
//! Высоты здесь — в долях единицы; итоговая доля суши всё равно подгоняется
//! после сценария, так что шаблон задаёт прежде всего форму суши.

use super::ops::{HeightOp, Placement, StraitDirection};
use crate::config::WorldType;

fn place(count: (u32, u32), height: (f32, f32), x: (f32, f32), y: (f32, f32)) -> Placement {
    Placement {
        count,
        height,
        x,
        y,
    }
}

fn hill(count: (u32, u32), height: (f32, f32), x: (f32, f32), y: (f32, f32)) -> HeightOp {
    HeightOp::Hill(place(count, height, x, y))
}

fn pit(count: (u32, u32), height: (f32, f32), x: (f32, f32), y: (f32, f32)) -> HeightOp {
    HeightOp::Pit(place(count, height, x, y))
}

fn range(count: (u32, u32), height: (f32, f32), x: (f32, f32), y: (f32, f32)) -> HeightOp {
    HeightOp::Range(place(count, height, x, y))
}

fn trough(count: (u32, u32), height: (f32, f32), x: (f32, f32), y: (f32, f32)) -> HeightOp {
    HeightOp::Trough(place(count, height, x, y))
}

fn strait(width: u32, direction: StraitDirection) -> HeightOp {
    HeightOp::Strait { width, direction }
}

#[must_use]
pub fn script_for(world_type: WorldType) -> Vec<HeightOp> {
    match world_type {
        WorldType::EarthLike => continents(),
        WorldType::Supercontinent => pangea(),
        WorldType::Archipelago => archipelago(),
        WorldType::Mediterranean => mediterranean(),
        WorldType::IceAgeEarth => ice_age(),
        WorldType::DesertMediterranean => desert_sea(),
    }
}

/// Два-три материка, разделённых океаном
fn continents() -> Vec<HeightOp> {
    vec![
        hill((1, 1), (0.80, 0.85), (0.60, 0.80), (0.40, 0.60)),
        hill((1, 1), (0.80, 0.85), (0.20, 0.30), (0.40, 0.60)),
        hill((6, 7), (0.15, 0.30), (0.25, 0.75), (0.15, 0.85)),
        HeightOp::Multiply {
            factor: 0.6,
            land_only: true,
        },
        hill((8, 10), (0.05, 0.10), (0.15, 0.85), (0.20, 0.80)),
        range((1, 2), (0.30, 0.60), (0.05, 0.15), (0.25, 0.75)),
        range((1, 2), (0.30, 0.60), (0.80, 0.95), (0.25, 0.75)),
        range((0, 3), (0.30, 0.60), (0.80, 0.90), (0.20, 0.80)),
        strait(2, StraitDirection::Vertical),
        strait(1, StraitDirection::Vertical),
        HeightOp::Smooth { strength: 3.0 },
        trough((3, 4), (0.15, 0.20), (0.15, 0.85), (0.20, 0.80)),
        trough((3, 4), (0.05, 0.10), (0.45, 0.55), (0.45, 0.55)),
        pit((3, 4), (0.10, 0.20), (0.15, 0.85), (0.20, 0.80)),
        HeightOp::Noise {
            amplitude: 0.03,
            frequency: 6.0,
        },
        HeightOp::Mask { power: 4.0 },
    ]
}

/// Один большой материк
fn pangea() -> Vec<HeightOp> {
    vec![
        hill((1, 2), (0.25, 0.40), (0.15, 0.50), (0.00, 0.10)),
        hill((1, 2), (0.05, 0.40), (0.50, 0.85), (0.00, 0.10)),
        hill((1, 2), (0.25, 0.40), (0.50, 0.85), (0.90, 1.00)),
        hill((1, 2), (0.05, 0.40), (0.15, 0.50), (0.90, 1.00)),
        hill((8, 12), (0.20, 0.40), (0.20, 0.80), (0.48, 0.52)),
        HeightOp::Smooth { strength: 2.0 },
        HeightOp::Multiply {
            factor: 0.7,
            land_only: true,
        },
        trough((3, 4), (0.25, 0.35), (0.05, 0.95), (0.10, 0.90)),
        range((5, 6), (0.30, 0.40), (0.10, 0.90), (0.35, 0.65)),
        HeightOp::Erode {
            iterations: 2,
            talus: 0.02,
        },
        HeightOp::Mask { power: 2.0 },
    ]
}

/// Россыпь островов
fn archipelago() -> Vec<HeightOp> {
    vec![
        HeightOp::Add {
            value: 0.11,
            land_only: false,
        },
        range((2, 3), (0.40, 0.60), (0.20, 0.80), (0.20, 0.80)),
        hill((5, 5), (0.15, 0.20), (0.10, 0.90), (0.30, 0.70)),
        hill((2, 2), (0.10, 0.15), (0.10, 0.30), (0.20, 0.80)),
        hill((2, 2), (0.10, 0.15), (0.60, 0.90), (0.20, 0.80)),
        HeightOp::Smooth { strength: 3.0 },
        trough((10, 10), (0.20, 0.30), (0.05, 0.95), (0.05, 0.95)),
        strait(2, StraitDirection::Vertical),
        strait(2, StraitDirection::Horizontal),
        HeightOp::Noise {
            amplitude: 0.05,
            frequency: 8.0,
        },
    ]
}

/// Внутреннее море в кольце суши
fn mediterranean() -> Vec<HeightOp> {
    vec![
        range((4, 6), (0.30, 0.80), (0.00, 1.00), (0.00, 0.10)),
        range((4, 6), (0.30, 0.80), (0.00, 1.00), (0.90, 1.00)),
        hill((6, 8), (0.30, 0.50), (0.10, 0.90), (0.00, 0.05)),
        hill((6, 8), (0.30, 0.50), (0.10, 0.90), (0.95, 1.00)),
        HeightOp::Multiply {
            factor: 0.9,
            land_only: false,
        },
        HeightOp::Mask { power: -2.0 },
        HeightOp::Smooth { strength: 1.0 },
        hill((2, 3), (0.30, 0.70), (0.00, 0.05), (0.20, 0.80)),
        hill((2, 3), (0.30, 0.70), (0.95, 1.00), (0.20, 0.80)),
        trough((3, 6), (0.40, 0.50), (0.00, 1.00), (0.00, 0.10)),
        trough((3, 6), (0.40, 0.50), (0.00, 1.00), (0.90, 1.00)),
    ]
}

/// Материки с высокими нагорьями под ледниками
fn ice_age() -> Vec<HeightOp> {
    let mut script = continents();
    script.insert(
        5,
        range((2, 3), (0.40, 0.70), (0.30, 0.70), (0.05, 0.25)),
    );
    script.push(HeightOp::Erode {
        iterations: 3,
        talus: 0.015,
    });
    script
}

/// Засушливое побережье: узкое море, широкие плато
fn desert_sea() -> Vec<HeightOp> {
    vec![
        range((3, 4), (0.30, 0.60), (0.00, 1.00), (0.00, 0.15)),
        range((3, 4), (0.30, 0.60), (0.00, 1.00), (0.85, 1.00)),
        hill((4, 6), (0.20, 0.40), (0.10, 0.90), (0.05, 0.25)),
        hill((4, 6), (0.20, 0.40), (0.10, 0.90), (0.75, 0.95)),
        HeightOp::Mask { power: -3.0 },
        HeightOp::Smooth { strength: 2.0 },
        trough((2, 3), (0.30, 0.40), (0.10, 0.90), (0.40, 0.60)),
        pit((2, 4), (0.10, 0.20), (0.10, 0.90), (0.10, 0.90)),
    ]
}
