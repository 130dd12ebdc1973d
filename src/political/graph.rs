// src/political/graph.rs
use std::collections::HashSet;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::voronoi::CellGraph;

/// Граф соседства государств: ребро, если у двух государств есть общая граница клеток
pub fn build_state_graph(graph: &CellGraph, state_of: &[Option<u32>], state_count: usize) -> UnGraph<u32, ()> {
    let mut states = UnGraph::new_undirected();
    // Узел `k` соответствует государству `k`
    for id in 0..state_count as u32 {
        states.add_node(id);
    }

    let mut edges = HashSet::new();
    for (cell, ns) in graph.neighbors.iter().enumerate() {
        let Some(a) = state_of[cell] else {
            continue;
        };
        for &nb in ns {
            let Some(b) = state_of[nb as usize] else {
                continue;
            };
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            if edges.insert(key) {
                states.add_edge(NodeIndex::new(key.0 as usize), NodeIndex::new(key.1 as usize), ());
            }
        }
    }
    states
}

/// Соседи государства по возрастанию id
#[must_use]
pub fn state_neighbors(states: &UnGraph<u32, ()>, id: u32) -> Vec<u32> {
    let mut list: Vec<u32> = states
        .neighbors(NodeIndex::new(id as usize))
        .map(|n| states[n])
        .collect();
    list.sort_unstable();
    list.dedup();
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::random::{RandomAlgorithm, RandomSource};
    use crate::sampling::{min_distance_for, sample_points};
    use crate::voronoi;

    #[test]
    fn test_left_and_right_halves_are_neighbors() {
        let rect = Rect::new(200.0, 100.0);
        let n = 200;
        let rng = RandomSource::new(2, RandomAlgorithm::Pcg64);
        let r = min_distance_for(rect, n, 0.7);
        let sites = sample_points(rect, n, r, 40, &mut rng.child("sampling", 0)).unwrap();
        let g = voronoi::build(sites, rect, (rect.area() / n as f64).sqrt(), &rng).unwrap();

        let state_of: Vec<Option<u32>> = g
            .sites
            .iter()
            .map(|p| Some(u32::from(p.x >= 100.0)))
            .collect();
        let states = build_state_graph(&g, &state_of, 3);

        assert_eq!(state_neighbors(&states, 0), vec![1]);
        assert_eq!(state_neighbors(&states, 1), vec![0]);
        assert!(state_neighbors(&states, 2).is_empty());
        assert_eq!(states.edge_count(), 1);
        assert_eq!(states.node_count(), 3);
        assert!(states.node_indices().all(|n| states[n] as usize == n.index()));
    }
}
