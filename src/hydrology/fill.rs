// src/hydrology/fill.rs
//! Заполнение бессточных впадин (Priority-Flood с ε-уклоном)
//!
//! Фронт растёт от стоков (вода и пограничная суша) в порядке возрастания высоты.
//! Каждая впервые достигнутая клетка суши, лежащая не выше клетки, из которой
//! её достигли, поднимается на `EPS` над ней. В итоге у каждой внутренней клетки
//! суши есть строго более низкий сосед.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::map::CellKind;
use crate::voronoi::CellGraph;

/// Минимальный уклон, который оставляет заполнение
pub const EPS: f32 = 1e-5;

/// Элемент очереди: сначала ниже, при равенстве — меньший id
#[derive(Debug, Clone, Copy)]
struct Entry {
    height: f32,
    cell: u32,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // BinaryHeap — max-куча, поэтому порядок обратный
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .height
            .total_cmp(&self.height)
            .then(other.cell.cmp(&self.cell))
    }
}

/// Один проход заполнения. Возвращает число поднятых клеток.
pub fn priority_flood(graph: &CellGraph, kinds: &[CellKind], heights: &mut [f32]) -> usize {
    let n = graph.len();
    let mut closed = vec![false; n];
    let mut heap = BinaryHeap::with_capacity(n);

    for i in 0..n {
        if kinds[i].is_water() || graph.border[i] {
            closed[i] = true;
            heap.push(Entry {
                height: heights[i],
                cell: i as u32,
            });
        }
    }

    let mut raised = 0;
    while let Some(Entry { height, cell }) = heap.pop() {
        for &nb in &graph.neighbors[cell as usize] {
            let nb = nb as usize;
            if closed[nb] {
                continue;
            }
            closed[nb] = true;
            if heights[nb] <= height {
                heights[nb] = height + EPS;
                raised += 1;
            }
            heap.push(Entry {
                height: heights[nb],
                cell: nb as u32,
            });
        }
    }
    raised
}

/// Внутренние клетки суши без строго более низкого соседа
#[must_use]
pub fn unresolved(graph: &CellGraph, kinds: &[CellKind], heights: &[f32]) -> usize {
    (0..graph.len())
        .filter(|&i| kinds[i] == CellKind::Land && !graph.border[i])
        .filter(|&i| {
            !graph.neighbors[i]
                .iter()
                .any(|&nb| heights[nb as usize] < heights[i])
        })
        .count()
}
