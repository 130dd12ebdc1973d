// src/hydrology/rivers.rs
//! Выделение рек по накопленному стоку

use crate::map::{CellKind, River, RiverMouth};

/// Всё, что нужно для трассировки рек
pub(crate) struct Drainage<'a> {
    pub kinds: &'a [CellKind],
    pub heights: &'a [f32],
    pub receivers: &'a [Option<u32>],
    pub flux: &'a [f32],
}

/// Реки и принадлежность клеток к ним
pub(crate) fn extract(
    drainage: &Drainage<'_>,
    threshold: f32,
    min_cells: usize,
) -> (Vec<River>, Vec<Option<u32>>) {
    let n = drainage.kinds.len();
    let above: Vec<bool> = (0..n)
        .map(|i| drainage.kinds[i] == CellKind::Land && drainage.flux[i] > threshold)
        .collect();

    let mut fed_from_above = vec![false; n];
    for (i, receiver) in drainage.receivers.iter().enumerate() {
        if let Some(r) = receiver {
            if above[i] {
                fed_from_above[*r as usize] = true;
            }
        }
    }

    let mut heads: Vec<u32> = (0..n as u32)
        .filter(|&i| above[i as usize] && !fed_from_above[i as usize])
        .collect();
    heads.sort_by(|&a, &b| {
        drainage.heights[b as usize]
            .total_cmp(&drainage.heights[a as usize])
            .then(a.cmp(&b))
    });

    let mut river_of: Vec<Option<u32>> = vec![None; n];
    let mut on_path = vec![u32::MAX; n];
    let mut rivers: Vec<River> = Vec::new();

    for (attempt, &head) in heads.iter().enumerate() {
        if river_of[head as usize].is_some() {
            continue;
        }

        let mut cells = Vec::new();
        let mut own = 0;
        let mut parent = None;
        let mut cur = head;
        let mouth = loop {
            let c = cur as usize;
            match drainage.kinds[c] {
                CellKind::Ocean => {
                    cells.push(cur);
                    break RiverMouth::Ocean;
                }
                CellKind::Lake => {
                    cells.push(cur);
                    break RiverMouth::Lake;
                }
                CellKind::Land => {}
            }
            if let Some(other) = river_of[c] {
                cells.push(cur);
                parent = Some(other);
                break RiverMouth::Confluence(other);
            }
            // Замкнулись сами на себя: бессточная впадина
            if on_path[c] == attempt as u32 {
                break RiverMouth::Sink;
            }
            on_path[c] = attempt as u32;
            cells.push(cur);
            own += 1;
            match drainage.receivers[c] {
                Some(next) => cur = next,
                None => break RiverMouth::MapEdge,
            }
        };

        if cells.len() < min_cells {
            continue;
        }

        let id = rivers.len() as u32;
        for &c in &cells[..own] {
            river_of[c as usize] = Some(id);
        }
        rivers.push(River {
            id,
            discharge: drainage.flux[cells[own - 1] as usize],
            cells,
            mouth,
            parent,
        });
    }

    (rivers, river_of)
}
