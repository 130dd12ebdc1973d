// src/heightmap/ops.rs
//! Операции сценария рельефа
//!
//! Закрытый набор операций с одним исполнителем. Каждая операция получает
//! собственный поток случайных чисел, поэтому её результат зависит только
//! от её позиции в сценарии и от высот, оставленных предыдущими операциями.
//!
//! Высоты живут в `[0, 1]`; после каждой операции значения обрезаются.

use std::collections::VecDeque;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::parallel::map_indexed;
use crate::random::RandomSource;
use crate::voronoi::{CellGraph, CellLocator};

/// Где и сколько: диапазоны для холмов, впадин, хребтов и желобов.
///
/// `x` и `y`: доли ширины и высоты карты.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub count: (u32, u32),
    pub height: (f32, f32),
    pub x: (f32, f32),
    pub y: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StraitDirection {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HeightOp {
    /// Холм, расплывающийся от центра
    Hill(Placement),
    /// Впадина: холм с обратным знаком
    Pit(Placement),
    /// Хребет вдоль извилистой линии
    Range(Placement),
    /// Желоб: хребет с обратным знаком
    Trough(Placement),
    /// Пролив от края до края карты
    Strait {
        width: u32,
        direction: StraitDirection,
    },
    /// Сглаживание по соседям; `strength >= 1`, больше: слабее
    Smooth { strength: f32 },
    /// Спад к краям карты (`power > 0`) или к центру (`power < 0`)
    Mask { power: f32 },
    Add {
        value: f32,
        #[serde(default)]
        land_only: bool,
    },
    /// Для суши умножается превышение над уровнем моря
    Multiply {
        factor: f32,
        #[serde(default)]
        land_only: bool,
    },
    /// Фрактальный шум OpenSimplex2; `frequency`: примерно число деталей по ширине карты
    Noise { amplitude: f32, frequency: f32 },
    /// Термальная эрозия: перепад больше `talus` частично осыпается вниз
    Erode { iterations: u32, talus: f32 },
    /// Растягивает высоты на `[0, 1]`
    Normalize,
}

fn ordered<T: PartialOrd + Copy>(name: &str, (lo, hi): (T, T)) -> Result<(), String> {
    if lo <= hi {
        Ok(())
    } else {
        Err(format!("{name} range is reversed"))
    }
}

fn fraction(name: &str, (lo, hi): (f32, f32)) -> Result<(), String> {
    ordered(name, (lo, hi))?;
    if (0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi) {
        Ok(())
    } else {
        Err(format!("{name} must lie in [0, 1]"))
    }
}

impl Placement {
    fn validate(&self) -> Result<(), String> {
        ordered("count", self.count)?;
        if self.count.1 > 1000 {
            return Err("count must not exceed 1000".into());
        }
        fraction("height", self.height)?;
        fraction("x", self.x)?;
        fraction("y", self.y)
    }
}

impl HeightOp {
    /// Имя операции, как в сценарии
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            HeightOp::Hill(_) => "hill",
            HeightOp::Pit(_) => "pit",
            HeightOp::Range(_) => "range",
            HeightOp::Trough(_) => "trough",
            HeightOp::Strait { .. } => "strait",
            HeightOp::Smooth { .. } => "smooth",
            HeightOp::Mask { .. } => "mask",
            HeightOp::Add { .. } => "add",
            HeightOp::Multiply { .. } => "multiply",
            HeightOp::Noise { .. } => "noise",
            HeightOp::Erode { .. } => "erode",
            HeightOp::Normalize => "normalize",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            HeightOp::Hill(p) | HeightOp::Pit(p) | HeightOp::Range(p) | HeightOp::Trough(p) => {
                p.validate()
            }
            HeightOp::Strait { width, .. } => {
                if (1..=64).contains(width) {
                    Ok(())
                } else {
                    Err("strait width must be in [1, 64]".into())
                }
            }
            HeightOp::Smooth { strength } => {
                if strength.is_finite() && *strength >= 1.0 {
                    Ok(())
                } else {
                    Err("smooth strength must be at least 1".into())
                }
            }
            HeightOp::Mask { power } => {
                if power.is_finite() && power.abs() >= 1.0 {
                    Ok(())
                } else {
                    Err("mask power must satisfy |power| >= 1".into())
                }
            }
            HeightOp::Add { value, .. } => {
                if value.is_finite() && value.abs() <= 1.0 {
                    Ok(())
                } else {
                    Err("add value must be in [-1, 1]".into())
                }
            }
            HeightOp::Multiply { factor, .. } => {
                if factor.is_finite() && *factor >= 0.0 {
                    Ok(())
                } else {
                    Err("multiply factor must be non-negative".into())
                }
            }
            HeightOp::Noise {
                amplitude,
                frequency,
            } => {
                if amplitude.is_finite() && frequency.is_finite() && *frequency > 0.0 {
                    Ok(())
                } else {
                    Err("noise needs a finite amplitude and a positive frequency".into())
                }
            }
            HeightOp::Erode { iterations, talus } => {
                if *iterations <= 1000 && talus.is_finite() && *talus >= 0.0 {
                    Ok(())
                } else {
                    Err("erode needs at most 1000 iterations and a non-negative talus".into())
                }
            }
            HeightOp::Normalize => Ok(()),
        }
    }
}

/// Всё, что операции читают, кроме самих высот
pub(crate) struct OpContext<'a> {
    pub graph: &'a CellGraph,
    pub locator: &'a CellLocator,
    pub sea_level: f32,
}

impl OpContext<'_> {
    fn n(&self) -> usize {
        self.graph.len()
    }

    /// Множитель затухания холма за один шаг по графу
    fn blob_decay(&self) -> f32 {
        (1.0 - 10.0 / (self.n() as f32).sqrt()).clamp(0.5, 0.99)
    }

    /// Множитель затухания хребта за одно кольцо
    fn line_decay(&self) -> f32 {
        (1.0 - 12.0 / (self.n() as f32).sqrt()).clamp(0.5, 0.97)
    }

    fn cell_at(&self, p: Point) -> u32 {
        self.locator.nearest(p).unwrap_or(0)
    }

    /// Случайная клетка в прямоугольнике долей `x × y`
    fn pick_cell(&self, x: (f32, f32), y: (f32, f32), rng: &mut RandomSource) -> u32 {
        let rect = self.graph.rect;
        let fx = f64::from(rng.gen_range(x.0..=x.1));
        let fy = f64::from(rng.gen_range(y.0..=y.1));
        self.cell_at(Point::new(fx * rect.width, fy * rect.height))
    }
}

impl HeightOp {
    pub(crate) fn apply(&self, heights: &mut [f32], ctx: &OpContext<'_>, rng: &mut RandomSource) {
        match self {
            HeightOp::Hill(p) => blobs(heights, ctx, rng, p, 1.0),
            HeightOp::Pit(p) => blobs(heights, ctx, rng, p, -1.0),
            HeightOp::Range(p) => ridges(heights, ctx, rng, p, 1.0),
            HeightOp::Trough(p) => ridges(heights, ctx, rng, p, -1.0),
            HeightOp::Strait { width, direction } => strait(heights, ctx, rng, *width, *direction),
            HeightOp::Smooth { strength } => smooth(heights, ctx.graph, *strength),
            HeightOp::Mask { power } => mask(heights, ctx.graph, *power),
            HeightOp::Add { value, land_only } => {
                for h in heights.iter_mut() {
                    if !*land_only || *h >= ctx.sea_level {
                        *h = (*h + value).clamp(0.0, 1.0);
                    }
                }
            }
            HeightOp::Multiply { factor, land_only } => {
                for h in heights.iter_mut() {
                    if *land_only {
                        if *h >= ctx.sea_level {
                            *h = (ctx.sea_level + (*h - ctx.sea_level) * factor).clamp(0.0, 1.0);
                        }
                    } else {
                        *h = (*h * factor).clamp(0.0, 1.0);
                    }
                }
            }
            HeightOp::Noise {
                amplitude,
                frequency,
            } => noise(heights, ctx.graph, rng, *amplitude, *frequency),
            HeightOp::Erode { iterations, talus } => {
                for _ in 0..*iterations {
                    thermal_erosion(heights, ctx.graph, *talus);
                }
            }
            HeightOp::Normalize => normalize(heights),
        }
    }
}

fn blobs(heights: &mut [f32], ctx: &OpContext<'_>, rng: &mut RandomSource, p: &Placement, sign: f32) {
    let count = rng.gen_range(p.count.0..=p.count.1);
    let decay = ctx.blob_decay();
    let neighbors = &ctx.graph.neighbors;

    for _ in 0..count {
        let h = rng.gen_range(p.height.0..=p.height.1);

        // Холм не ставим на уже высокую вершину, впадину: на дно
        let mut start = ctx.pick_cell(p.x, p.y, rng);
        for _ in 0..50 {
            let fits = if sign > 0.0 {
                heights[start as usize] + h <= 0.9
            } else {
                heights[start as usize] - h >= 0.1
            };
            if fits {
                break;
            }
            start = ctx.pick_cell(p.x, p.y, rng);
        }

        let mut change = vec![0.0_f32; heights.len()];
        change[start as usize] = h;
        let mut queue = VecDeque::from([start]);

        while let Some(c) = queue.pop_front() {
            for &nb in &neighbors[c as usize] {
                if change[nb as usize] != 0.0 {
                    continue;
                }
                let v = change[c as usize] * decay * rng.gen_range(0.9..=1.1);
                change[nb as usize] = v;
                if v > 0.005 {
                    queue.push_back(nb);
                }
            }
        }

        for (height, delta) in heights.iter_mut().zip(&change) {
            *height = (*height + sign * delta).clamp(0.0, 1.0);
        }
    }
}

/// Извилистый путь от `start` к `end`: обычно к ближайшему к цели соседу, изредка к случайному
fn ridge_path(ctx: &OpContext<'_>, rng: &mut RandomSource, start: u32, end: u32, wander: f64) -> Vec<u32> {
    let sites = &ctx.graph.sites;
    let neighbors = &ctx.graph.neighbors;
    let target = sites[end as usize];
    let max_len = 4 * (ctx.n() as f64).sqrt() as usize + 16;

    let mut on_path = vec![false; ctx.n()];
    let mut path = vec![start];
    on_path[start as usize] = true;
    let mut cur = start;

    for _ in 0..max_len {
        if cur == end {
            break;
        }
        let ns = &neighbors[cur as usize];
        cur = if rng.gen_bool(wander) {
            ns[rng.gen_range(0..ns.len())]
        } else {
            let mut best = ns[0];
            let mut best_d = sites[best as usize].distance_squared(target);
            for &nb in &ns[1..] {
                let d = sites[nb as usize].distance_squared(target);
                if d < best_d || (d == best_d && nb < best) {
                    best = nb;
                    best_d = d;
                }
            }
            best
        };
        if !on_path[cur as usize] {
            on_path[cur as usize] = true;
            path.push(cur);
        }
    }
    path
}

/// Кольца вокруг пути; `rings[0]` это сам путь, далее соседи ещё не задействованных клеток
fn rings(ctx: &OpContext<'_>, path: &[u32], max_rings: usize) -> Vec<Vec<u32>> {
    let mut used = vec![false; ctx.n()];
    for &c in path {
        used[c as usize] = true;
    }
    let mut out = vec![path.to_vec()];
    while out.len() < max_rings {
        let mut next = Vec::new();
        for &c in out.last().map_or(&[][..], Vec::as_slice) {
            for &nb in &ctx.graph.neighbors[c as usize] {
                if !used[nb as usize] {
                    used[nb as usize] = true;
                    next.push(nb);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        out.push(next);
    }
    out
}

fn ridges(heights: &mut [f32], ctx: &OpContext<'_>, rng: &mut RandomSource, p: &Placement, sign: f32) {
    let count = rng.gen_range(p.count.0..=p.count.1);
    let decay = ctx.line_decay();
    let rect = ctx.graph.rect;

    for _ in 0..count {
        let h = rng.gen_range(p.height.0..=p.height.1);
        let start = ctx.pick_cell(p.x, p.y, rng);
        let from = ctx.graph.sites[start as usize];

        // Конец хребта: на расстоянии от 1/8 до 1/3 ширины карты
        let mut to = from;
        for _ in 0..50 {
            to = Point::new(rng.gen_range(0.0..=rect.width), rng.gen_range(0.0..=rect.height));
            let d = from.distance(to);
            if d >= rect.width / 8.0 && d <= rect.width / 3.0 {
                break;
            }
        }
        let end = ctx.cell_at(to);
        let path = ridge_path(ctx, rng, start, end, 0.15);

        // Число колец, после которого вклад падает ниже 0.02
        let mut n_rings = 1;
        let mut v = h;
        while v > 0.02 && n_rings < 256 {
            v *= decay;
            n_rings += 1;
        }

        let mut value = h;
        for ring in rings(ctx, &path, n_rings) {
            for c in ring {
                let delta = value * rng.gen_range(0.85..=1.15);
                let height = &mut heights[c as usize];
                *height = (*height + sign * delta).clamp(0.0, 1.0);
            }
            value *= decay;
        }
    }
}

fn strait(
    heights: &mut [f32],
    ctx: &OpContext<'_>,
    rng: &mut RandomSource,
    width: u32,
    direction: StraitDirection,
) {
    let rect = ctx.graph.rect;
    let (from, to) = match direction {
        StraitDirection::Vertical => {
            let x = rng.gen_range(0.3..=0.7) * rect.width;
            let end_x = (rect.width - x + rng.gen_range(-0.1..=0.1) * rect.width).clamp(0.0, rect.width);
            (Point::new(x, 0.0), Point::new(end_x, rect.height))
        }
        StraitDirection::Horizontal => {
            let y = rng.gen_range(0.3..=0.7) * rect.height;
            let end_y =
                (rect.height - y + rng.gen_range(-0.1..=0.1) * rect.height).clamp(0.0, rect.height);
            (Point::new(0.0, y), Point::new(rect.width, end_y))
        }
    };
    let path = ridge_path(ctx, rng, ctx.cell_at(from), ctx.cell_at(to), 0.1);

    for (k, ring) in rings(ctx, &path, width as usize).into_iter().enumerate() {
        let factor = 0.25 + 0.6 * k as f32 / width as f32;
        for c in ring {
            heights[c as usize] *= factor;
        }
    }
}

fn smooth(heights: &mut [f32], graph: &CellGraph, strength: f32) {
    let current: &[f32] = heights;
    let smoothed = map_indexed(current.len(), |i| {
        let ns = &graph.neighbors[i];
        let sum: f32 = current[i] + ns.iter().map(|&n| current[n as usize]).sum::<f32>();
        let mean = sum / (ns.len() + 1) as f32;
        ((current[i] * (strength - 1.0) + mean) / strength).clamp(0.0, 1.0)
    });
    heights.copy_from_slice(&smoothed);
}

fn mask(heights: &mut [f32], graph: &CellGraph, power: f32) {
    let fr = power.abs();
    let rect = graph.rect;
    for (h, site) in heights.iter_mut().zip(&graph.sites) {
        let nx = (2.0 * site.x / rect.width - 1.0) as f32;
        let ny = (2.0 * site.y / rect.height - 1.0) as f32;
        let mut distance = (1.0 - nx * nx) * (1.0 - ny * ny);
        if power < 0.0 {
            distance = 1.0 - distance;
        }
        let masked = *h * distance;
        *h = ((*h * (fr - 1.0) + masked) / fr).clamp(0.0, 1.0);
    }
}

fn noise(heights: &mut [f32], graph: &CellGraph, rng: &mut RandomSource, amplitude: f32, frequency: f32) {
    let mut noise = FastNoiseLite::new();
    noise.set_seed(Some(rng.next_u32() as i32));
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(3));
    noise.set_frequency(Some(frequency));

    let width = graph.rect.width;
    let values = map_indexed(heights.len(), |i| {
        let site = graph.sites[i];
        noise.get_noise_2d((site.x / width) as f32, (site.y / width) as f32)
    });
    for (h, v) in heights.iter_mut().zip(values) {
        *h = (*h + amplitude * v).clamp(0.0, 1.0);
    }
}

/// Один проход термальной эрозии (гравитационное выветривание)
pub(crate) fn thermal_erosion(heights: &mut [f32], graph: &CellGraph, talus: f32) {
    let mut delta = vec![0.0_f32; heights.len()];

    for (i, ns) in graph.neighbors.iter().enumerate() {
        let current = heights[i];
        let mut max_diff = 0.0;
        let mut target = i;
        for &n in ns {
            let diff = current - heights[n as usize];
            if diff > max_diff {
                max_diff = diff;
                target = n as usize;
            }
        }

        // Если перепад больше порога: перераспределяем
        if max_diff > talus {
            let move_amount = (max_diff - talus) * 0.3; // Коэффициент переноса
            delta[i] -= move_amount;
            delta[target] += move_amount; // Материал перемещается, а не исчезает
        }
    }

    for (h, d) in heights.iter_mut().zip(delta) {
        *h = (*h + d).clamp(0.0, 1.0);
    }
}

/// Растягивает значения на `[0, 1]`; постоянное поле не меняется
pub(crate) fn normalize(heights: &mut [f32]) {
    let min_h = heights.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max_h = heights.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    if max_h > min_h {
        for h in heights.iter_mut() {
            *h = (*h - min_h) / (max_h - min_h);
        }
    }
}
