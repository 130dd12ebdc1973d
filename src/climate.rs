// src/climate.rs
//! Температура и осадки по клеткам
//!
//! Температура падает к полюсам и с высотой. Осадки считаются проходом ветра
//! вдоль широтных полос: над водой воздух насыщается влагой, над сушей отдаёт её,
//! сильнее на подъёмах (дождевая тень за горами получается сама собой).

use tracing::debug;

use crate::config::ClimateSettings;
use crate::heightmap::Terrain;
use crate::parallel::map_indexed;
use crate::voronoi::CellGraph;

/// Широтный множитель осадков: влажный экватор, сухие субтропики, влажные умеренные широты
const LATITUDE_BANDS: [(f32, f32); 5] = [(0.0, 1.0), (0.25, 0.55), (0.5, 0.9), (0.75, 0.6), (1.0, 0.35)];

#[derive(Debug, Clone)]
pub struct Climate {
    /// `[0, 1]`, от мороза (0) до жары (1)
    pub temperature: Vec<f32>,
    /// `[0, 1]`
    pub precipitation: Vec<f32>,
}

/// Расстояние от экватора (середины карты по вертикали), от 0 на экваторе до 1 на полюсе
fn latitude(graph: &CellGraph, y: f64) -> f32 {
    ((y / graph.rect.height - 0.5).abs() * 2.0) as f32
}

fn band_factor(lat: f32) -> f32 {
    for w in LATITUDE_BANDS.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if lat <= x1 {
            let t = ((lat - x0) / (x1 - x0)).clamp(0.0, 1.0);
            return y0 + (y1 - y0) * t;
        }
    }
    LATITUDE_BANDS[LATITUDE_BANDS.len() - 1].1
}

#[must_use]
pub fn generate(graph: &CellGraph, terrain: &Terrain, settings: &ClimateSettings) -> Climate {
    let temperature = temperatures(graph, terrain, settings);
    let precipitation = precipitation(graph, terrain, settings);
    debug!(
        cells = graph.len(),
        mean_temperature = temperature.iter().sum::<f32>() / graph.len().max(1) as f32,
        "climate computed"
    );
    Climate {
        temperature,
        precipitation,
    }
}

fn temperatures(graph: &CellGraph, terrain: &Terrain, settings: &ClimateSettings) -> Vec<f32> {
    let sea = terrain.sea_level;
    map_indexed(graph.len(), |i| {
        let lat = latitude(graph, graph.sites[i].y);
        let h = terrain.heights[i];
        // Температура падает с высотой
        let elevation_loss = if h >= sea {
            0.5 * (h - sea) / (1.0 - sea)
        } else {
            0.0
        };
        (1.0 - lat * lat * settings.polar_amplification - elevation_loss
            + settings.global_temperature_offset)
            .clamp(0.0, 1.0)
    })
}

fn precipitation(graph: &CellGraph, terrain: &Terrain, settings: &ClimateSettings) -> Vec<f32> {
    let n = graph.len();
    let rows = ((graph.rect.height / graph.spacing).ceil() as usize).max(1);
    let mut bands: Vec<Vec<u32>> = vec![Vec::new(); rows];
    for (i, site) in graph.sites.iter().enumerate() {
        let row = ((site.y / graph.spacing) as usize).min(rows - 1);
        bands[row].push(i as u32);
    }

    let mut raw = vec![0.0_f32; n];
    for (row, cells) in bands.iter_mut().enumerate() {
        if cells.is_empty() {
            continue;
        }
        let center = (row as f64 + 0.5) * graph.spacing;
        let lat = latitude(graph, center);

        // Ветер: на экваторе и полюсах дует на запад, в умеренных широтах на восток
        let wind_east = lat > 0.3 && lat < 0.7;
        cells.sort_by(|&a, &b| {
            let (xa, xb) = (graph.sites[a as usize].x, graph.sites[b as usize].x);
            xa.total_cmp(&xb).then(a.cmp(&b))
        });
        if !wind_east {
            cells.reverse();
        }

        let mut air_moisture = 0.5_f32;
        for (k, &c) in cells.iter().enumerate() {
            let c = c as usize;
            let h = terrain.heights[c];
            if terrain.kinds[c].is_water() {
                // Вода насыщает воздух влагой
                air_moisture = (air_moisture + 0.15).min(1.0);
                raw[c] = air_moisture;
            } else {
                // Суша забирает влагу. Подъём заставляет влагу выпадать осадками.
                let next_h = cells.get(k + 1).map_or(h, |&nx| terrain.heights[nx as usize]);
                let slope = (next_h - h).max(0.0);
                let rain = (air_moisture * (0.06 + slope * 2.5)).min(air_moisture);
                air_moisture -= rain;
                raw[c] = (rain * 8.0).clamp(0.0, 1.0);
            }
        }
    }

    // Широтные пояса и одно сглаживание по соседям, чтобы не было полос от ветра
    let banded = map_indexed(n, |i| raw[i] * band_factor(latitude(graph, graph.sites[i].y)));
    map_indexed(n, |i| {
        let ns = &graph.neighbors[i];
        let mean = ns.iter().map(|&nb| banded[nb as usize]).sum::<f32>() / ns.len().max(1) as f32;
        (0.5 * (banded[i] + mean) + settings.global_humidity_offset).clamp(0.0, 1.0)
    })
}
