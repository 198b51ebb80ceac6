use clap::Parser;
use hextonic::{MapConfig, generate_with};
use std::path::PathBuf;

/// Процедурный генератор карт биомов на тектонических плитах
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Сид генератора (переопределяет значение из конфигурации)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Ширина карты в клетках
    #[arg(long)]
    width: Option<u32>,

    /// Высота карты в клетках
    #[arg(long)]
    height: Option<u32>,

    /// Путь для сохранения карты биомов (по умолчанию: ./biomes.png)
    #[arg(short, long, default_value = "biomes.png")]
    output: PathBuf,

    /// Размер клетки в пикселях
    #[arg(long, default_value_t = 4)]
    scale: u32,

    /// Куда сохранить JSON-сводку по карте
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Куда сохранить нормализованную карту высот в оттенках серого
    #[arg(long)]
    heightmap: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => {
            println!("🔍 Загрузка конфигурации...");
            MapConfig::from_toml_file(path)?
        }
        None => MapConfig::default(),
    };
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    if let Some(width) = cli.width {
        params.width = width;
    }
    if let Some(height) = cli.height {
        params.height = height;
    }

    println!(
        "Генерация карты (размер: {}×{}, сид: {})...",
        params.width, params.height, params.seed
    );
    let world = generate_with(&params)?;

    println!("Сохранение в {:?}", cli.output);
    world
        .biome_map()
        .save_as_png(&cli.output.to_string_lossy(), cli.scale)?;

    if let Some(path) = &cli.heightmap {
        println!("Карта высот в {path:?}");
        world.heightfield().save_as_png(&path.to_string_lossy())?;
    }

    if let Some(path) = &cli.summary {
        println!("Сводка в {path:?}");
        world.summary().save_json(&path.to_string_lossy())?;
    }

    let sea = world.sea_level();
    println!(
        "\nГотово! Уровень моря {:.2}, рек: {}.",
        sea.threshold,
        world.rivers().len()
    );
    Ok(())
}
