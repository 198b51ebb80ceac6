//! Полный проход генерации и результат, который читают потребители

use crate::biome::{Biome, BiomeMap, assign_biomes};
use crate::climate::{apply_lapse_rate, calculate_moisture, generate_temperature_map};
use crate::config::MapConfig;
use crate::error::{GenError, Result};
use crate::heightmap::{Heightfield, SeaLevel, solve_sea_level};
use crate::rivers::{RiverPath, generate_rivers, water_pass};
use crate::tectonics::generate_plate_heightfield;
use crate::tile::{Hydrology, Tile, TileGrid};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Готовая карта. После генерации не изменяется.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMap {
    seed: u64,
    sea_level: SeaLevel,
    /// Сглаженное нормализованное поле высот, по которому проведён уровень моря
    heightfield: Heightfield,
    grid: TileGrid,
    rivers: Vec<RiverPath>,
}

/// Краткая сводка по карте
#[derive(Debug, Clone, Serialize)]
pub struct WorldSummary {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub sea_level: f64,
    pub target_coverage: f64,
    pub ocean_fraction: f64,
    pub rivers: usize,
    /// Число клеток по кодам биомов 0..6
    pub biome_counts: [usize; 7],
}

impl WorldSummary {
    pub fn save_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl WorldMap {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn width(&self) -> u32 {
        self.grid.width as u32
    }

    pub fn height(&self) -> u32 {
        self.grid.height as u32
    }

    pub fn sea_level(&self) -> SeaLevel {
        self.sea_level
    }

    pub fn heightfield(&self) -> &Heightfield {
        &self.heightfield
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.grid
    }

    pub fn rivers(&self) -> &[RiverPath] {
        &self.rivers
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Result<&Tile> {
        if x >= self.width() || y >= self.height() {
            return Err(GenError::OutOfBounds {
                x,
                y,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(self.grid.get(x as usize, y as usize))
    }

    pub fn biome_at(&self, x: u32, y: u32) -> Result<Biome> {
        self.tile_at(x, y).map(Tile::biome)
    }

    /// Код биома 0..6
    pub fn biome_code_at(&self, x: u32, y: u32) -> Result<u8> {
        self.biome_at(x, y).map(Biome::code)
    }

    pub fn biome_map(&self) -> BiomeMap {
        BiomeMap::from_grid(&self.grid)
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            seed: self.seed,
            width: self.width(),
            height: self.height(),
            sea_level: self.sea_level.threshold,
            target_coverage: self.sea_level.target_coverage,
            ocean_fraction: self.grid.ocean_fraction(),
            rivers: self.rivers.len(),
            biome_counts: self.biome_map().histogram(),
        }
    }
}

/// Генерирует карту с параметрами по умолчанию
pub fn generate(width: u32, height: u32, seed: u64) -> Result<WorldMap> {
    generate_with(&MapConfig::new(width, height, seed))
}

/// Полный проход: плиты → температура → сглаживание → уровень моря → реки →
/// влажность → биомы. Один генератор случайных чисел на весь проход.
pub fn generate_with(config: &MapConfig) -> Result<WorldMap> {
    config.validate()?;
    let started = Instant::now();
    let width = config.width as usize;
    let height = config.height as usize;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let raw = generate_plate_heightfield(width, height, &config.tectonics, &mut rng);
    let temperature = generate_temperature_map(width, height, &config.climate, &mut rng);
    let world = build_from_heightfield(&raw, &temperature, config, &mut rng)?;

    log::info!(
        "Generated {width}x{height} map (seed {}) in {} ms",
        config.seed,
        started.elapsed().as_millis()
    );
    Ok(world)
}

/// Разделяет нормализованное поле на сушу и океан.
///
/// Суша: `elevation = (h - sea) / (1 - sea) · max_elevation` в `[0, max_elevation]`,
/// океан получает отрицательную высоту и стоячую воду. Температура берётся из
/// `temperature` с поправкой на высоту.
pub fn split_land_and_ocean(
    normalized: &Heightfield,
    sea_level: &SeaLevel,
    temperature: &[f64],
    config: &MapConfig,
) -> TileGrid {
    let threshold = sea_level.threshold;
    let span = if threshold < 1.0 { 1.0 - threshold } else { 1.0 };

    let mut grid = TileGrid::from_fn(normalized.width, normalized.height, |x, y| {
        let h = normalized.get(x, y);
        let is_land = h >= threshold;
        Tile {
            elevation: ((h - threshold) / span * config.sea.max_elevation) as i32,
            temperature: temperature[y * normalized.width + x],
            moisture: 0.0,
            is_land,
            water: if is_land {
                Hydrology::Dry
            } else {
                Hydrology::StillWater
            },
            ..Tile::default()
        }
    });
    apply_lapse_rate(&mut grid, &config.climate);
    grid
}

/// Стадии 3–7 над готовым сырым полем высот и картой температур
pub fn build_from_heightfield(
    raw: &Heightfield,
    temperature: &[f64],
    config: &MapConfig,
    rng: &mut ChaCha8Rng,
) -> Result<WorldMap> {
    config.validate()?;
    if raw.width != config.width as usize
        || raw.height != config.height as usize
        || temperature.len() != raw.data.len()
    {
        return Err(GenError::InvalidConfig(format!(
            "heightfield {}x{} with {} temperatures does not match a {}x{} map",
            raw.width,
            raw.height,
            temperature.len(),
            config.width,
            config.height
        )));
    }

    let normalized = raw.smoothed(config.sea.smooth_radius).normalized();
    let sea_level = solve_sea_level(&normalized, &config.sea, rng);
    let mut grid = split_land_and_ocean(&normalized, &sea_level, temperature, config);

    let rivers = generate_rivers(&mut grid, &config.hydrology, config.max_trace_steps(), rng)?;
    water_pass(&mut grid, config.hydrology.lake_fill);
    calculate_moisture(&mut grid, &config.moisture);
    assign_biomes(&mut grid, &config.biomes);

    Ok(WorldMap {
        seed: config.seed,
        sea_level,
        heightfield: normalized,
        grid,
        rivers,
    })
}

/// Держит текущую карту и перегенерирует её по запросу.
///
/// Потребители получают `Arc` на готовую карту. Новый проход идёт целиком
/// в стороне, и `Arc` подменяется только после его завершения, поэтому
/// частично построенная карта никогда не видна.
#[derive(Debug)]
pub struct MapGenerator {
    config: MapConfig,
    seeds: ChaCha8Rng,
    current: Arc<WorldMap>,
}

impl MapGenerator {
    pub fn new(config: MapConfig) -> Result<Self> {
        let current = Arc::new(generate_with(&config)?);
        let seeds = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            seeds,
            current,
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Текущая готовая карта
    pub fn snapshot(&self) -> Arc<WorldMap> {
        Arc::clone(&self.current)
    }

    pub fn biome_at(&self, x: u32, y: u32) -> Result<Biome> {
        self.current.biome_at(x, y)
    }

    /// Новая карта со следующим сидом из потока сидов генератора
    pub fn regenerate(&mut self) -> Result<Arc<WorldMap>> {
        let seed = self.seeds.next_u64();
        self.regenerate_with_seed(seed)
    }

    pub fn regenerate_with_seed(&mut self, seed: u64) -> Result<Arc<WorldMap>> {
        let config = MapConfig {
            seed,
            ..self.config.clone()
        };
        let world = Arc::new(generate_with(&config)?);
        self.config = config;
        self.current = Arc::clone(&world);
        Ok(world)
    }
}
