// src/political/capitals.rs
//! Выбор центров (столиц и культурных очагов)
//!
//! Взвешенная рулетка без возвращения: клетка выбирается с вероятностью,
//! пропорциональной её пригодности, среди клеток не ближе `spacing` к уже
//! выбранным. Если таких не осталось, расстояние уменьшается вдвое.

use rand::Rng;
use tracing::debug;

use crate::geometry::Point;
use crate::random::RandomSource;

/// Выбирает до `count` клеток из `candidates`; `weights` индексируются id клетки
pub(crate) fn pick_centers(
    sites: &[Point],
    candidates: &[u32],
    weights: &[f32],
    count: usize,
    spacing: f64,
    rng: &mut RandomSource,
) -> Vec<u32> {
    let mut chosen: Vec<u32> = Vec::with_capacity(count);
    let mut taken = vec![false; sites.len()];
    let mut spacing = spacing;
    let target = count.min(candidates.len());

    while chosen.len() < target {
        let min_d2 = spacing * spacing;
        let eligible: Vec<u32> = candidates
            .iter()
            .copied()
            .filter(|&c| !taken[c as usize])
            .filter(|&c| {
                let p = sites[c as usize];
                chosen
                    .iter()
                    .all(|&o| p.distance_squared(sites[o as usize]) >= min_d2)
            })
            .collect();

        if eligible.is_empty() {
            spacing *= 0.5;
            debug!(spacing, placed = chosen.len(), "no eligible center, halving spacing");
            continue;
        }

        let total: f64 = eligible.iter().map(|&c| f64::from(weights[c as usize])).sum();
        let mut roll = rng.r#gen::<f64>() * total;
        let mut pick = eligible[eligible.len() - 1];
        for &c in &eligible {
            roll -= f64::from(weights[c as usize]);
            if roll < 0.0 {
                pick = c;
                break;
            }
        }

        taken[pick as usize] = true;
        chosen.push(pick);
    }

    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RandomAlgorithm;

    fn grid(side: usize) -> Vec<Point> {
        (0..side * side)
            .map(|i| Point::new((i % side) as f64 * 10.0, (i / side) as f64 * 10.0))
            .collect()
    }

    #[test]
    fn test_respects_spacing_when_possible() {
        let sites = grid(10);
        let candidates: Vec<u32> = (0..100).collect();
        let weights = vec![1.0; 100];
        let mut rng = RandomSource::new(3, RandomAlgorithm::Pcg64);
        let centers = pick_centers(&sites, &candidates, &weights, 4, 30.0, &mut rng);

        assert_eq!(centers.len(), 4);
        for (i, &a) in centers.iter().enumerate() {
            for &b in &centers[i + 1..] {
                assert!(sites[a as usize].distance(sites[b as usize]) >= 30.0 - 1e-9);
            }
        }
    }

    #[test]
    fn test_spacing_halves_until_count_is_met() {
        let sites = grid(4);
        let candidates: Vec<u32> = (0..16).collect();
        let weights = vec![1.0; 16];
        let mut rng = RandomSource::new(9, RandomAlgorithm::Pcg64);
        let centers = pick_centers(&sites, &candidates, &weights, 16, 1000.0, &mut rng);

        let mut sorted = centers.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 16);
    }

    #[test]
    fn test_count_is_capped_by_candidates() {
        let sites = grid(3);
        let candidates = vec![0, 4, 8];
        let weights = vec![1.0; 9];
        let mut rng = RandomSource::new(1, RandomAlgorithm::Pcg64);
        let centers = pick_centers(&sites, &candidates, &weights, 10, 5.0, &mut rng);
        assert_eq!(centers.len(), 3);
    }

    #[test]
    fn test_heavier_cells_win_more_often() {
        let sites = grid(2);
        let candidates: Vec<u32> = (0..4).collect();
        let weights = vec![100.0, 1.0, 1.0, 1.0];
        let mut wins = 0;
        for seed in 0..50 {
            let mut rng = RandomSource::new(seed, RandomAlgorithm::Pcg64);
            if pick_centers(&sites, &candidates, &weights, 1, 0.0, &mut rng) == vec![0] {
                wins += 1;
            }
        }
        assert!(wins > 35);
    }
}
