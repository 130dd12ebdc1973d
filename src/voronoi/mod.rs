// src/voronoi/mod.rs
//! Граф клеток Вороного
//!
//! Конвейер:
//! 1. вокруг прямоугольника карты на расстоянии одного шага ставится кольцо «призрачных» точек,
//!    слегка выгнутое наружу, чтобы на оболочке не было трёх точек на одной прямой;
//! 2. реальные точки и призраки отдаются `voronoice` в рамке с запасом, так что ни одна
//!    точка не отбрасывается;
//! 3. соседи клетки: реальные соседи по Делоне, упорядоченные против часовой стрелки;
//!    многоугольник: вершины ячейки, обрезанные прямоугольником карты. Клетки призраков
//!    отбрасываются.
//!
//! Если триангуляция не удалась или потеряла точку, все точки детерминированно дрожат
//! и граф строится заново. Точка, у которой меньше трёх реальных соседей (бывает в углах
//! карты), переносится в центроид соседнего треугольника.

mod locator;

pub use locator::CellLocator;

use std::cmp::Ordering;

use rand::Rng;
use tracing::{debug, warn};
use voronoice::{BoundingBox, Voronoi, VoronoiBuilder};

use crate::error::{MapError, MapResult};
use crate::geometry::{Point, Rect, centroid, clip_to_rect, orient, polygon_area};
use crate::parallel::map_indexed;
use crate::random::RandomSource;

const MAX_PERTURBATIONS: u32 = 4;
const MAX_RELOCATION_PASSES: u32 = 8;

/// Планарный граф клеток
#[derive(Debug, Clone)]
pub struct CellGraph {
    pub rect: Rect,
    /// Характерное расстояние между соседними точками
    pub spacing: f64,
    pub sites: Vec<Point>,
    /// Соседи каждой клетки против часовой стрелки
    pub neighbors: Vec<Vec<u32>>,
    pub polygons: Vec<Vec<Point>>,
    pub areas: Vec<f64>,
    /// Клетка касается края карты
    pub border: Vec<bool>,
    /// Сколько точек было перенесено ради трёх соседей
    pub relocated: usize,
    /// Сколько раз пришлось дрожать точки из-за вырождения
    pub perturbation_retries: u32,
}

impl CellGraph {
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[must_use]
    pub fn locator(&self) -> CellLocator {
        CellLocator::new(&self.sites, self.rect, self.spacing)
    }
}

/// Строит граф клеток по точкам
pub fn build(
    sites: Vec<Point>,
    rect: Rect,
    spacing: f64,
    rng: &RandomSource,
) -> MapResult<CellGraph> {
    let mut sites = sites;
    let mut retries = 0;
    let mut passes = 0;
    let mut relocated = 0;

    loop {
        let mesh = match Mesh::new(&sites, rect, spacing) {
            Ok(mesh) => mesh,
            Err(reason) => {
                if retries == MAX_PERTURBATIONS {
                    return Err(MapError::GeometryDegenerate { reason, retries });
                }
                let mut jitter = rng.child("voronoi-perturb", u64::from(retries));
                retries += 1;
                let eps = spacing * 1e-4 * f64::from(retries);
                warn!(retries, eps, %reason, "degenerate triangulation, perturbing sites");
                for site in &mut sites {
                    let moved = Point::new(
                        site.x + jitter.gen_range(-eps..=eps),
                        site.y + jitter.gen_range(-eps..=eps),
                    );
                    *site = rect.clamp(moved);
                }
                continue;
            }
        };

        let poor: Vec<usize> = (0..sites.len())
            .filter(|&i| mesh.neighbors[i].len() < 3)
            .collect();
        if poor.is_empty() {
            debug!(
                cells = sites.len(),
                vertices = mesh.voronoi.vertices().len(),
                relocated,
                retries,
                "voronoi graph built"
            );
            return Ok(mesh.into_graph(sites, rect, spacing, relocated, retries));
        }

        if passes == MAX_RELOCATION_PASSES {
            return Err(MapError::GeometryDegenerate {
                reason: format!(
                    "{} sites still have fewer than three neighbors (first: {})",
                    poor.len(),
                    poor[0]
                ),
                retries,
            });
        }
        passes += 1;
        let moved = mesh.relocate(&poor, &mut sites, rect, spacing);
        relocated += moved;
        warn!(pass = passes, sites = moved, "relocating sites with fewer than three neighbors");
    }
}

/// Диаграмма вместе с реальными соседями каждой точки
struct Mesh {
    voronoi: Voronoi,
    neighbors: Vec<Vec<u32>>,
    /// Точка граничит с призраком
    border: Vec<bool>,
}

impl Mesh {
    fn new(sites: &[Point], rect: Rect, spacing: f64) -> Result<Self, String> {
        let n = sites.len();
        let points: Vec<voronoice::Point> = sites
            .iter()
            .chain(&ghost_ring(rect, spacing))
            .map(|p| voronoice::Point { x: p.x, y: p.y })
            .collect();
        let total = points.len();

        // Рамка шире кольца призраков на полшага с каждой стороны
        let center = rect.center();
        let frame = BoundingBox::new(
            voronoice::Point {
                x: center.x,
                y: center.y,
            },
            rect.width + 4.0 * spacing,
            rect.height + 4.0 * spacing,
        );
        let voronoi = VoronoiBuilder::default()
            .set_sites(points)
            .set_bounding_box(frame)
            .build()
            .ok_or_else(|| "triangulation failed, sites are collinear".to_string())?;
        if voronoi.sites().len() != total {
            return Err(format!(
                "{} of {total} sites were dropped by the frame",
                total - voronoi.sites().len()
            ));
        }

        let mut neighbors = Vec::with_capacity(n);
        let mut border = Vec::with_capacity(n);
        for i in 0..n {
            // Совпавшая точка не попадает ни в один треугольник
            if voronoi.cells()[i].is_empty() {
                return Err(format!("site {i} is not in the triangulation"));
            }
            let (real, ghosts): (Vec<usize>, Vec<usize>) = voronoi.cell(i).iter_neighbors().partition(|&nb| nb < n);
            let mut real: Vec<u32> = real.into_iter().map(|nb| nb as u32).collect();
            real.sort_unstable();
            real.dedup();
            sort_around(sites[i], &mut real, sites);
            neighbors.push(real);
            border.push(!ghosts.is_empty());
        }

        Ok(Self {
            voronoi,
            neighbors,
            border,
        })
    }

    /// Общий реальный сосед `a` и `b`, кроме `own` и уже задействованных
    fn apex_beyond(&self, own: u32, a: u32, b: u32, touched: &[bool]) -> Option<u32> {
        self.neighbors[a as usize].iter().copied().find(|&d| {
            d != own
                && !touched[d as usize]
                && !self.neighbors[own as usize].contains(&d)
                && self.neighbors[b as usize].contains(&d)
        })
    }

    /// Переносит бедные соседями точки; возвращает число перенесённых
    fn relocate(&self, poor: &[usize], sites: &mut [Point], rect: Rect, spacing: f64) -> usize {
        let mut touched = vec![false; sites.len()];
        let mut moved = 0;

        for &i in poor {
            if touched[i] {
                continue;
            }
            let own = i as u32;
            let ns = &self.neighbors[i];

            // Ребро ab между двумя соседями и вершина d по другую сторону от него
            let target = ns.iter().enumerate().find_map(|(k, &a)| {
                ns[k + 1..].iter().find_map(|&b| {
                    if touched[a as usize] || touched[b as usize] || !self.neighbors[a as usize].contains(&b) {
                        return None;
                    }
                    self.apex_beyond(own, a, b, &touched).map(|d| [a, b, d])
                })
            });

            let new_site = match target {
                Some(verts) => {
                    for &v in &verts {
                        touched[v as usize] = true;
                    }
                    let [a, b, d] = verts.map(|v| sites[v as usize]);
                    centroid(a, b, d)
                }
                None => {
                    // Нет подходящего треугольника: сдвигаем к центру карты на полшага
                    let site = sites[i];
                    let c = rect.center();
                    let len = site.distance(c);
                    if len == 0.0 {
                        continue;
                    }
                    let k = (0.5 * spacing / len).min(1.0);
                    Point::new(site.x + (c.x - site.x) * k, site.y + (c.y - site.y) * k)
                }
            };

            touched[i] = true;
            sites[i] = rect.clamp(new_site);
            moved += 1;
        }
        moved
    }

    fn into_graph(
        self,
        sites: Vec<Point>,
        rect: Rect,
        spacing: f64,
        relocated: usize,
        perturbation_retries: u32,
    ) -> CellGraph {
        let n = sites.len();
        let rings: Vec<Vec<Point>> = (0..n)
            .map(|i| {
                self.voronoi
                    .cell(i)
                    .iter_vertices()
                    .map(|v| Point::new(v.x, v.y))
                    .collect()
            })
            .collect();

        let polygons = map_indexed(n, |i| {
            let mut polygon = clip_to_rect(&rings[i], rect);
            if polygon_area(&polygon) < 0.0 {
                polygon.reverse();
            }
            polygon
        });
        let areas = map_indexed(n, |i| polygon_area(&polygons[i]));

        CellGraph {
            rect,
            spacing,
            sites,
            neighbors: self.neighbors,
            polygons,
            areas,
            border: self.border,
            relocated,
            perturbation_retries,
        }
    }
}

/// Упорядочивает соседей против часовой стрелки, начиная с направления `+x`
fn sort_around(center: Point, ids: &mut [u32], sites: &[Point]) {
    let upper = |p: Point| p.y > center.y || (p.y == center.y && p.x > center.x);
    ids.sort_by(|&a, &b| {
        let (pa, pb) = (sites[a as usize], sites[b as usize]);
        upper(pb).cmp(&upper(pa)).then_with(|| {
            let turn = orient(center, pa, pb);
            if turn > 0.0 {
                Ordering::Less
            } else if turn < 0.0 {
                Ordering::Greater
            } else {
                a.cmp(&b)
            }
        })
    });
}

/// Кольцо призраков на расстоянии `margin` от прямоугольника, против часовой стрелки.
///
/// Стороны выгнуты параболой наружу (до половины отступа), так что оболочка строго выпукла.
fn ghost_ring(rect: Rect, margin: f64) -> Vec<Point> {
    let m = margin;
    let w = rect.width + 2.0 * m;
    let h = rect.height + 2.0 * m;
    let nx = ((w / margin).ceil() as usize).max(2);
    let ny = ((h / margin).ceil() as usize).max(2);
    let bulge = |k: usize, n: usize| {
        let t = 2.0 * k as f64 / n as f64 - 1.0;
        0.5 * m * (1.0 - t * t)
    };

    let (left, bottom) = (-m, -m);
    let (right, top) = (rect.width + m, rect.height + m);
    let mut ring = Vec::with_capacity(2 * (nx + ny));

    ring.push(Point::new(left, bottom));
    for k in 1..nx {
        ring.push(Point::new(left + w * k as f64 / nx as f64, bottom - bulge(k, nx)));
    }
    ring.push(Point::new(right, bottom));
    for k in 1..ny {
        ring.push(Point::new(right + bulge(k, ny), bottom + h * k as f64 / ny as f64));
    }
    ring.push(Point::new(right, top));
    for k in 1..nx {
        ring.push(Point::new(right - w * k as f64 / nx as f64, top + bulge(k, nx)));
    }
    ring.push(Point::new(left, top));
    for k in 1..ny {
        ring.push(Point::new(left - bulge(k, ny), top - h * k as f64 / ny as f64));
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RandomAlgorithm;
    use crate::sampling::{min_distance_for, sample_points};

    fn sample_graph(n: usize, seed: u64) -> CellGraph {
        let rect = Rect::new(400.0, 200.0);
        let r = min_distance_for(rect, n, 0.7);
        let rng = RandomSource::new(seed, RandomAlgorithm::Pcg64);
        let sites = sample_points(rect, n, r, 40, &mut rng.child("sampling", 0)).unwrap();
        let spacing = (rect.area() / n as f64).sqrt();
        build(sites, rect, spacing, &rng).unwrap()
    }

    #[test]
    fn test_every_cell_has_three_symmetric_neighbors() {
        let graph = sample_graph(600, 11);
        assert_eq!(graph.len(), 600);
        for (i, ns) in graph.neighbors.iter().enumerate() {
            assert!(ns.len() >= 3, "cell {i} has {} neighbors", ns.len());
            for &n in ns {
                assert!(graph.neighbors[n as usize].contains(&(i as u32)));
            }
        }
    }

    #[test]
    fn test_polygons_cover_the_rectangle() {
        let graph = sample_graph(400, 3);
        let total: f64 = graph.areas.iter().sum();
        let area = graph.rect.area();
        // Клетки не перекрываются; призраки могут лишь чуть заходить на карту
        assert!(total <= area * (1.0 + 1e-9));
        assert!(total > 0.97 * area);
        assert!(graph.areas.iter().all(|&a| a > 0.0));
        for polygon in &graph.polygons {
            assert!(polygon.iter().all(|&p| graph.rect.contains(p)));
        }
    }

    #[test]
    fn test_border_cells_are_near_the_edge() {
        let graph = sample_graph(500, 8);
        let border = graph.border.iter().filter(|&&b| b).count();
        assert!(border > 0 && border < graph.len() / 2);
        let limit = 3.0 * graph.spacing;
        for (i, &b) in graph.border.iter().enumerate() {
            if b {
                let s = graph.sites[i];
                let edge = s.x.min(s.y).min(graph.rect.width - s.x).min(graph.rect.height - s.y);
                assert!(edge < limit, "border cell {i} is {edge} away from the edge");
            }
        }
    }

    #[test]
    fn test_interior_neighbors_turn_counterclockwise() {
        let graph = sample_graph(500, 4);
        for i in (0..graph.len()).filter(|&i| !graph.border[i]) {
            let ns = &graph.neighbors[i];
            for k in 0..ns.len() {
                let a = graph.sites[ns[k] as usize];
                let b = graph.sites[ns[(k + 1) % ns.len()] as usize];
                assert!(orient(graph.sites[i], a, b) > 0.0, "cell {i} neighbors out of order");
            }
        }
    }

    #[test]
    fn test_ghost_cells_are_dropped() {
        let graph = sample_graph(300, 9);
        let n = graph.len() as u32;
        assert!(graph.neighbors.iter().flatten().all(|&nb| nb < n));
        assert_eq!(graph.polygons.len(), graph.len());
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = sample_graph(300, 21);
        let b = sample_graph(300, 21);
        assert_eq!(a.neighbors, b.neighbors);
        assert_eq!(a.sites, b.sites);
        assert_eq!(a.areas, b.areas);
    }

    #[test]
    fn test_corner_site_gets_three_neighbors() {
        // Редкая решётка с точкой в самом углу
        let rect = Rect::new(100.0, 100.0);
        let mut sites = vec![Point::new(0.0, 0.0)];
        for y in 0..5 {
            for x in 0..5 {
                if x + y > 0 {
                    sites.push(Point::new(
                        10.0 + f64::from(x) * 20.0 + f64::from(y) * 0.37,
                        10.0 + f64::from(y) * 20.0 + f64::from(x) * 0.29,
                    ));
                }
            }
        }
        let rng = RandomSource::new(1, RandomAlgorithm::Pcg64);
        let graph = build(sites, rect, 20.0, &rng).unwrap();
        assert!(graph.neighbors.iter().all(|ns| ns.len() >= 3));
    }
}
