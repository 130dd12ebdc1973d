// src/validate.rs
//! Проверка инвариантов готовой карты
//!
//! [`check`] собирает все нарушения сразу, а не останавливается на первом:
//! так удобнее разбирать регрессии.

use std::collections::HashSet;

use thiserror::Error;

use crate::biome::Biome;
use crate::map::{CellKind, MapData};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("cell {cell} has only {count} neighbors")]
    TooFewNeighbors { cell: u32, count: usize },

    #[error("cell {cell} lists unknown neighbor {neighbor}")]
    UnknownNeighbor { cell: u32, neighbor: u32 },

    #[error("cell {cell} lists {neighbor}, but not the other way round")]
    AsymmetricAdjacency { cell: u32, neighbor: u32 },

    #[error("cell {cell} coastal flag disagrees with its neighbors")]
    CoastalMismatch { cell: u32 },

    #[error("river {river} flows uphill from cell {from} to cell {to}")]
    RiverUphill { river: u32, from: u32, to: u32 },

    #[error("river {river} visits cell {cell} twice")]
    RiverRepeatsCell { river: u32, cell: u32 },

    #[error("cell {cell} has biome {biome:?} that does not match its kind")]
    BiomeMismatch { cell: u32, biome: Biome },

    #[error("land cell {cell} belongs to no state")]
    UnclaimedLand { cell: u32 },

    #[error("water cell {cell} belongs to state {state}")]
    ClaimedWater { cell: u32, state: u32 },

    #[error("state {state} membership disagrees with cell {cell}")]
    StateMembership { state: u32, cell: u32 },
}

/// Все нарушения инвариантов карты
#[must_use]
pub fn check(map: &MapData) -> Vec<Violation> {
    let mut violations = check_neighbors(map);
    violations.extend(check_coastal(map));
    violations.extend(check_rivers(map));
    violations.extend(check_biomes(map));
    violations.extend(check_states(map));
    violations
}

/// Не меньше трёх соседей, соседство симметрично
#[must_use]
pub fn check_neighbors(map: &MapData) -> Vec<Violation> {
    let mut violations = Vec::new();
    for cell in &map.cells {
        if cell.neighbors.len() < 3 {
            violations.push(Violation::TooFewNeighbors {
                cell: cell.id,
                count: cell.neighbors.len(),
            });
        }
        for &nb in &cell.neighbors {
            match map.cell(nb) {
                None => violations.push(Violation::UnknownNeighbor {
                    cell: cell.id,
                    neighbor: nb,
                }),
                Some(other) if !other.neighbors.contains(&cell.id) || nb == cell.id => {
                    violations.push(Violation::AsymmetricAdjacency {
                        cell: cell.id,
                        neighbor: nb,
                    });
                }
                Some(_) => {}
            }
        }
    }
    violations
}

/// Береговая клетка: ровно та, у которой есть сосед-суша и сосед-океан
#[must_use]
pub fn check_coastal(map: &MapData) -> Vec<Violation> {
    map.cells
        .iter()
        .filter(|cell| {
            let kinds = || cell.neighbors.iter().filter_map(|&nb| map.cell(nb)).map(|c| c.kind);
            let expected = kinds().any(|k| k == CellKind::Land) && kinds().any(|k| k == CellKind::Ocean);
            cell.coastal != expected
        })
        .map(|cell| Violation::CoastalMismatch { cell: cell.id })
        .collect()
}

/// Реки не поднимаются в гору и не проходят клетку дважды
#[must_use]
pub fn check_rivers(map: &MapData) -> Vec<Violation> {
    let mut violations = Vec::new();
    for river in &map.rivers {
        let mut seen = HashSet::new();
        for &c in &river.cells {
            if !seen.insert(c) {
                violations.push(Violation::RiverRepeatsCell { river: river.id, cell: c });
            }
        }
        for w in river.cells.windows(2) {
            let (Some(a), Some(b)) = (map.cell(w[0]), map.cell(w[1])) else {
                continue;
            };
            if b.height > a.height {
                violations.push(Violation::RiverUphill {
                    river: river.id,
                    from: a.id,
                    to: b.id,
                });
            }
        }
    }
    violations
}

/// У суши: сухопутный биом, у воды: `Marine`
#[must_use]
pub fn check_biomes(map: &MapData) -> Vec<Violation> {
    map.cells
        .iter()
        .filter(|cell| cell.is_land() == (cell.biome == Biome::Marine))
        .map(|cell| Violation::BiomeMismatch {
            cell: cell.id,
            biome: cell.biome,
        })
        .collect()
}

/// Каждая клетка суши принадлежит ровно одному государству (если ничейные земли запрещены)
#[must_use]
pub fn check_states(map: &MapData) -> Vec<Violation> {
    let mut violations = Vec::new();
    let wilderness = map.params.political.allow_wilderness;

    for cell in &map.cells {
        match (cell.is_land(), cell.state) {
            (true, None) if !wilderness => violations.push(Violation::UnclaimedLand { cell: cell.id }),
            (false, Some(state)) => violations.push(Violation::ClaimedWater { cell: cell.id, state }),
            _ => {}
        }
    }

    for state in &map.states {
        for &c in &state.cells {
            if map.cell(c).and_then(|cell| cell.state) != Some(state.id) {
                violations.push(Violation::StateMembership { state: state.id, cell: c });
            }
        }
    }
    // Клетка ссылается на государство, которое её не перечисляет
    for cell in &map.cells {
        if let Some(state) = cell.state {
            let listed = map
                .states
                .get(state as usize)
                .is_some_and(|s| s.cells.binary_search(&cell.id).is_ok());
            if !listed {
                violations.push(Violation::StateMembership { state, cell: cell.id });
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationParams;
    use crate::generator::generate;

    fn map() -> MapData {
        generate(2024, &GenerationParams::with_points(800)).unwrap()
    }

    #[test]
    fn test_generated_map_is_clean() {
        let violations = check(&map());
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_detects_broken_adjacency() {
        let mut map = map();
        let victim = map.cells[10].neighbors[0];
        map.cells[10].neighbors.retain(|&n| n != victim);
        let violations = check_neighbors(&map);
        assert!(violations.contains(&Violation::AsymmetricAdjacency {
            cell: victim,
            neighbor: 10
        }));
    }

    #[test]
    fn test_detects_uphill_river() {
        let mut map = map();
        let Some(river) = map.rivers.first().cloned() else {
            return;
        };
        let last = *river.cells.last().unwrap();
        map.cells[last as usize].height = 2.0;
        assert!(
            check_rivers(&map)
                .iter()
                .any(|v| matches!(v, Violation::RiverUphill { to, .. } if *to == last))
        );
    }

    #[test]
    fn test_detects_water_biome_on_land() {
        let mut map = map();
        let land = map.land_cells().next().unwrap().id;
        map.cells[land as usize].biome = Biome::Marine;
        assert_eq!(
            check_biomes(&map),
            vec![Violation::BiomeMismatch {
                cell: land,
                biome: Biome::Marine
            }]
        );
    }

    #[test]
    fn test_detects_unclaimed_land() {
        let mut map = map();
        let land = map.land_cells().next().unwrap().id;
        map.cells[land as usize].state = None;
        let violations = check_states(&map);
        assert!(violations.contains(&Violation::UnclaimedLand { cell: land }));
    }
}
