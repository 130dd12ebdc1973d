#![allow(dead_code)]

use cellmap::{GenerationParams, MapData, generate};

/// Небольшая карта, которая строится за доли секунды
pub fn small_params(points: usize) -> GenerationParams {
    GenerationParams {
        num_points: points,
        width: 1024.0,
        height: 512.0,
        ..GenerationParams::default()
    }
}

pub fn generate_ok(seed: u64, params: &GenerationParams) -> MapData {
    match generate(seed, params) {
        Ok(map) => map,
        Err(e) => panic!("generation failed: {e}"),
    }
}
