// src/political/expansion.rs
//! Рост территорий от нескольких центров одновременно (многоисточниковый Дейкстра)

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::voronoi::CellGraph;

/// Элемент очереди: `(стоимость, владелец, клетка)` по возрастанию
#[derive(Debug, Clone, Copy)]
struct Front {
    cost: f64,
    owner: u32,
    cell: u32,
}

impl PartialEq for Front {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Front {}

impl PartialOrd for Front {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Front {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then(other.owner.cmp(&self.owner))
            .then(other.cell.cmp(&self.cell))
    }
}

/// Владелец каждой клетки. Источник `k` — владелец `k`.
///
/// `step_cost(from, to)` — цена перехода; клетки дороже `max_cost` не захватываются.
pub(crate) fn expand<F>(graph: &CellGraph, sources: &[u32], max_cost: f64, step_cost: F) -> Vec<Option<u32>>
where
    F: Fn(usize, usize) -> f64,
{
    let n = graph.len();
    let mut best = vec![f64::INFINITY; n];
    let mut owner: Vec<Option<u32>> = vec![None; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    for (k, &cell) in sources.iter().enumerate() {
        best[cell as usize] = 0.0;
        heap.push(Front {
            cost: 0.0,
            owner: k as u32,
            cell,
        });
    }

    while let Some(Front { cost, owner: who, cell }) = heap.pop() {
        let c = cell as usize;
        if settled[c] {
            continue;
        }
        settled[c] = true;
        owner[c] = Some(who);

        for &nb in &graph.neighbors[c] {
            let nb = nb as usize;
            if settled[nb] {
                continue;
            }
            let next = cost + step_cost(c, nb);
            if next <= max_cost && next <= best[nb] {
                best[nb] = next;
                heap.push(Front {
                    cost: next,
                    owner: who,
                    cell: nb as u32,
                });
            }
        }
    }

    owner
}
