// src/heightmap/water.rs
//! Разделение на сушу, океан и озёра; береговые клетки; связные области

use std::collections::VecDeque;

use petgraph::unionfind::UnionFind;

use crate::map::{CellKind, Feature, FeatureKind};
use crate::voronoi::CellGraph;

/// Вода, связанная с водой на краю карты: океан; остальная вода: озёра
#[must_use]
pub fn classify_water(graph: &CellGraph, heights: &[f32], sea_level: f32) -> Vec<CellKind> {
    let n = graph.len();
    let mut kinds = vec![CellKind::Land; n];
    let mut visited = vec![false; n];

    // Очередь для BFS
    let mut queue = VecDeque::new();

    // Все пограничные водные клетки: океан
    for i in 0..n {
        if graph.border[i] && heights[i] < sea_level {
            kinds[i] = CellKind::Ocean;
            visited[i] = true;
            queue.push_back(i);
        }
    }

    // BFS от краёв
    while let Some(c) = queue.pop_front() {
        for &nb in &graph.neighbors[c] {
            let nb = nb as usize;
            if !visited[nb] && heights[nb] < sea_level {
                kinds[nb] = CellKind::Ocean;
                visited[nb] = true;
                queue.push_back(nb);
            }
        }
    }

    // Всё остальное: озёра
    for (kind, &h) in kinds.iter_mut().zip(heights) {
        if h < sea_level && *kind == CellKind::Land {
            *kind = CellKind::Lake;
        }
    }

    kinds
}

/// Береговая клетка: та, у которой есть и сухопутный, и океанический сосед
#[must_use]
pub fn coastal_flags(graph: &CellGraph, kinds: &[CellKind]) -> Vec<bool> {
    graph
        .neighbors
        .iter()
        .map(|ns| {
            let land = ns.iter().any(|&n| kinds[n as usize] == CellKind::Land);
            let ocean = ns.iter().any(|&n| kinds[n as usize] == CellKind::Ocean);
            land && ocean
        })
        .collect()
}

/// Связные области одного типа. Номера областей: в порядке первой клетки.
#[must_use]
pub fn features(graph: &CellGraph, kinds: &[CellKind]) -> (Vec<u32>, Vec<Feature>) {
    let n = graph.len();
    let mut sets = UnionFind::<usize>::new(n);
    for (i, ns) in graph.neighbors.iter().enumerate() {
        for &nb in ns {
            if kinds[nb as usize] == kinds[i] {
                sets.union(i, nb as usize);
            }
        }
    }

    let mut by_root = vec![u32::MAX; n];
    let mut cell_feature = vec![0; n];
    let mut list: Vec<Feature> = Vec::new();

    for i in 0..n {
        let root = sets.find_mut(i);
        if by_root[root] == u32::MAX {
            by_root[root] = list.len() as u32;
            list.push(Feature {
                id: list.len() as u32,
                kind: match kinds[i] {
                    CellKind::Land => FeatureKind::Island,
                    CellKind::Ocean => FeatureKind::Ocean,
                    CellKind::Lake => FeatureKind::Lake,
                },
                cells: 0,
                border: false,
            });
        }
        let id = by_root[root];
        let feature = &mut list[id as usize];
        feature.cells += 1;
        feature.border |= graph.border[i];
        cell_feature[i] = id;
    }

    (cell_feature, list)
}
