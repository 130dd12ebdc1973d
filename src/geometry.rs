// src/geometry.rs
//! Базовая планиметрия: точки, прямоугольник карты, ориентация и отсечение многоугольников.
//!
//! Все вычисления идут в `f64` и только арифметикой IEEE-754 (плюс `sqrt`), без
//! трансцендентных функций платформенной `libm`, поэтому результат одинаков на всех платформах.

use serde::{Deserialize, Serialize};

/// Точка на плоскости карты
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Прямоугольник карты `[0, width] × [0, height]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width && p.y <= self.height
    }

    #[must_use]
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Удвоенная ориентированная площадь треугольника `abc`:
/// `> 0`: обход против часовой стрелки, `< 0`: по часовой, `0`: коллинеарны.
#[must_use]
pub fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[must_use]
pub fn centroid(a: Point, b: Point, c: Point) -> Point {
    Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
}

/// Площадь многоугольника по формуле шнурования (положительна для CCW)
#[must_use]
pub fn polygon_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut prev = polygon[polygon.len() - 1];
    for &p in polygon {
        sum += prev.x * p.y - p.x * prev.y;
        prev = p;
    }
    sum * 0.5
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn coord(self, p: Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    fn intersect(self, a: Point, b: Point, bound: f64) -> Point {
        match self {
            Axis::X => {
                let t = (bound - a.x) / (b.x - a.x);
                Point::new(bound, a.y + t * (b.y - a.y))
            }
            Axis::Y => {
                let t = (bound - a.y) / (b.y - a.y);
                Point::new(a.x + t * (b.x - a.x), bound)
            }
        }
    }
}

fn clip_half_plane(polygon: &[Point], axis: Axis, bound: f64, keep_greater: bool) -> Vec<Point> {
    let mut out = Vec::with_capacity(polygon.len() + 2);
    let Some(&last) = polygon.last() else {
        return out;
    };

    let inside = |p: Point| {
        let v = axis.coord(p);
        if keep_greater { v >= bound } else { v <= bound }
    };

    let mut prev = last;
    let mut prev_in = inside(prev);
    for &cur in polygon {
        let cur_in = inside(cur);
        if cur_in {
            if !prev_in {
                out.push(axis.intersect(prev, cur, bound));
            }
            out.push(cur);
        } else if prev_in {
            out.push(axis.intersect(prev, cur, bound));
        }
        prev = cur;
        prev_in = cur_in;
    }
    out
}

/// Отсекает выпуклый многоугольник прямоугольником карты (Сазерленда-Ходжмана)
#[must_use]
pub fn clip_to_rect(polygon: &[Point], rect: Rect) -> Vec<Point> {
    let clipped = clip_half_plane(polygon, Axis::X, 0.0, true);
    let clipped = clip_half_plane(&clipped, Axis::X, rect.width, false);
    let clipped = clip_half_plane(&clipped, Axis::Y, 0.0, true);
    let mut clipped = clip_half_plane(&clipped, Axis::Y, rect.height, false);

    // Убираем совпадающие соседние вершины, появляющиеся на углах
    clipped.dedup_by(|a, b| a.distance_squared(*b) < 1e-18);
    if clipped.len() > 1 && clipped[0].distance_squared(clipped[clipped.len() - 1]) < 1e-18 {
        clipped.pop();
    }
    clipped
}
