use clap::Parser;
use cellmap::{GenerationParams, Seed, WorldType, generate, validate};
use serde::Serialize;
use std::path::PathBuf;

/// Генератор карт мира на клетках Вороного
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Сид: число или произвольная строка
    #[arg(short, long, default_value = "0")]
    seed: Seed,

    /// Число клеток (перекрывает значение из конфигурации)
    #[arg(short, long)]
    points: Option<usize>,

    #[arg(long)]
    width: Option<f64>,

    #[arg(long)]
    height: Option<f64>,

    /// Тип мира: EarthLike, Supercontinent, Archipelago, Mediterranean, IceAgeEarth, DesertMediterranean
    #[arg(short, long, value_parser = parse_world_type)]
    world_type: Option<WorldType>,

    /// Проверить инварианты готовой карты
    #[arg(long)]
    check: bool,

    /// Вывести сводку в JSON вместо текста
    #[arg(long)]
    json: bool,
}

fn parse_world_type(s: &str) -> Result<WorldType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown world type `{s}`"))
}

#[derive(Serialize)]
struct Summary<'a> {
    seed: u64,
    checksum: String,
    metadata: &'a cellmap::MapMetadata,
    violations: Option<Vec<String>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => {
            if !cli.json {
                println!("🔍 Загрузка конфигурации из {}...", path.display());
            }
            GenerationParams::from_toml_file(path)?
        }
        None => GenerationParams::default(),
    };
    if let Some(points) = cli.points {
        params.num_points = points;
    }
    if let Some(width) = cli.width {
        params.width = width;
    }
    if let Some(height) = cli.height {
        params.height = height;
    }
    if let Some(world_type) = cli.world_type {
        params.heightmap.world_type = world_type;
    }

    if !cli.json {
        println!(
            "🌍 Генерация карты (сид: {}, клеток: {}, размер: {}×{})...",
            cli.seed, params.num_points, params.width, params.height
        );
    }
    let map = generate(cli.seed.clone(), &params)?;
    let violations = cli
        .check
        .then(|| validate::check(&map).iter().map(ToString::to_string).collect::<Vec<_>>());

    if cli.json {
        let summary = Summary {
            seed: map.seed,
            checksum: map.checksum().to_string(),
            metadata: &map.metadata,
            violations: violations.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let meta = &map.metadata;
        println!("   Суша: {:.1}% ({} клеток)", meta.land_fraction * 100.0, meta.land_cells);
        println!("   Океан: {} клеток, озёра: {} клеток", meta.ocean_cells, meta.lake_cells);
        println!(
            "   Реки: {} (средняя длина {:.1}, самая длинная {})",
            meta.river_count, meta.mean_river_length, meta.longest_river
        );
        println!(
            "   Государства: {} из {}, культуры: {}",
            meta.states_placed,
            meta.states_requested,
            map.cultures.len()
        );
        println!("🔑 Контрольная сумма: {}", map.checksum());

        if let Some(list) = &violations {
            if list.is_empty() {
                println!("✅ Инварианты соблюдены");
            } else {
                println!("❌ Нарушено инвариантов: {}", list.len());
                for v in list.iter().take(20) {
                    println!("   - {v}");
                }
            }
        }
    }

    if violations.is_some_and(|list| !list.is_empty()) {
        return Err("invariant check failed".into());
    }
    Ok(())
}
