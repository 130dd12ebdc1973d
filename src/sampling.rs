// src/sampling.rs
//! Пуассоновская выборка точек (метание дротиков с сеточным ускорением)
//!
//! Сетка со стороной `r / √2` хранит не более одной точки на ячейку,
//! поэтому проверка минимального расстояния смотрит только окно 5×5.
//! Бюджет попыток ограничен; если он исчерпан раньше, чем набрано `count` точек,
//! возвращается [`MapError::SamplingExhausted`] с частичным набором.

use rand::Rng;
use tracing::debug;

use crate::error::{MapError, MapResult};
use crate::geometry::{Point, Rect};
use crate::random::RandomSource;

const EMPTY: u32 = u32::MAX;

/// Минимальное расстояние между точками для `count` точек в `rect`
#[must_use]
pub fn min_distance_for(rect: Rect, count: usize, factor: f64) -> f64 {
    factor * (rect.area() / count.max(1) as f64).sqrt()
}

/// Генерирует `count` точек с попарным расстоянием не меньше `min_distance`
pub fn sample_points(
    rect: Rect,
    count: usize,
    min_distance: f64,
    attempts_per_point: u32,
    rng: &mut RandomSource,
) -> MapResult<Vec<Point>> {
    let cell_size = min_distance / std::f64::consts::SQRT_2;
    let cols = ((rect.width / cell_size).ceil() as usize).max(1);
    let rows = ((rect.height / cell_size).ceil() as usize).max(1);
    let mut grid = vec![EMPTY; cols * rows];

    let min_d2 = min_distance * min_distance;
    let budget = (count as u64).saturating_mul(u64::from(attempts_per_point));
    let mut points: Vec<Point> = Vec::with_capacity(count);
    let mut attempts = 0u64;

    while points.len() < count && attempts < budget {
        attempts += 1;
        let candidate = Point::new(
            rng.gen_range(0.0..rect.width),
            rng.gen_range(0.0..rect.height),
        );

        let gx = ((candidate.x / cell_size) as usize).min(cols - 1);
        let gy = ((candidate.y / cell_size) as usize).min(rows - 1);

        let mut free = true;
        'search: for ny in gy.saturating_sub(2)..=(gy + 2).min(rows - 1) {
            for nx in gx.saturating_sub(2)..=(gx + 2).min(cols - 1) {
                let id = grid[ny * cols + nx];
                if id != EMPTY && points[id as usize].distance_squared(candidate) < min_d2 {
                    free = false;
                    break 'search;
                }
            }
        }

        if free {
            grid[gy * cols + gx] = points.len() as u32;
            points.push(candidate);
        }
    }

    debug!(
        placed = points.len(),
        requested = count,
        attempts,
        min_distance,
        "poisson sampling finished"
    );

    if points.len() < count {
        let deficit = count - points.len();
        return Err(MapError::SamplingExhausted {
            placed: points,
            requested: count,
            deficit,
        });
    }
    Ok(points)
}
