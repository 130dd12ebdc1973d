// src/voronoi/locator.rs
//! Поиск ближайшей клетки по координатам карты

use crate::geometry::{Point, Rect};

/// Корзинная сетка над центрами клеток
#[derive(Debug, Clone)]
pub struct CellLocator {
    cell_size: f64,
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<u32>>,
    sites: Vec<Point>,
}

impl CellLocator {
    #[must_use]
    pub fn new(sites: &[Point], rect: Rect, cell_size: f64) -> Self {
        let cols = ((rect.width / cell_size).ceil() as usize).max(1);
        let rows = ((rect.height / cell_size).ceil() as usize).max(1);
        let mut buckets = vec![Vec::new(); cols * rows];

        let mut locator = Self {
            cell_size,
            cols,
            rows,
            buckets: Vec::new(),
            sites: sites.to_vec(),
        };
        for (id, &site) in sites.iter().enumerate() {
            let (gx, gy) = locator.bucket_of(site);
            buckets[gy * cols + gx].push(id as u32);
        }
        locator.buckets = buckets;
        locator
    }

    fn bucket_of(&self, p: Point) -> (usize, usize) {
        let gx = ((p.x / self.cell_size).max(0.0) as usize).min(self.cols - 1);
        let gy = ((p.y / self.cell_size).max(0.0) as usize).min(self.rows - 1);
        (gx, gy)
    }

    /// Ближайшая клетка; при равенстве расстояний — с меньшим id
    #[must_use]
    pub fn nearest(&self, p: Point) -> Option<u32> {
        if self.sites.is_empty() {
            return None;
        }
        let (gx, gy) = self.bucket_of(p);
        let mut best: Option<(f64, u32)> = None;

        for ring in 0..=self.cols.max(self.rows) {
            let x0 = gx as isize - ring as isize;
            let x1 = gx as isize + ring as isize;
            let y0 = gy as isize - ring as isize;
            let y1 = gy as isize + ring as isize;

            for y in y0..=y1 {
                for x in x0..=x1 {
                    let on_ring = x == x0 || x == x1 || y == y0 || y == y1;
                    if !on_ring || x < 0 || y < 0 || x >= self.cols as isize || y >= self.rows as isize
                    {
                        continue;
                    }
                    for &id in &self.buckets[y as usize * self.cols + x as usize] {
                        let d2 = self.sites[id as usize].distance_squared(p);
                        let better = match best {
                            None => true,
                            Some((bd, bid)) => d2 < bd || (d2 == bd && id < bid),
                        };
                        if better {
                            best = Some((d2, id));
                        }
                    }
                }
            }

            // Всё, что за следующим кольцом, дальше ring * cell_size
            if let Some((bd, _)) = best {
                let reach = ring as f64 * self.cell_size;
                if reach * reach > bd {
                    break;
                }
            }
        }
        best.map(|(_, id)| id)
    }
}
