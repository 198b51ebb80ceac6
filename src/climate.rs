use crate::config::{ClimateSettings, MoistureSettings};
use crate::tile::{Hydrology, TileGrid};
use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::RngCore;
use std::f64::consts::PI;

/// Генерирует карту температур, не зависящую от рельефа.
///
/// Широтный градиент `cos²` с максимумом посередине карты плюс плавный шум.
/// Поправка на высоту применяется позже, после масштабирования высот.
pub fn generate_temperature_map(
    width: usize,
    height: usize,
    settings: &ClimateSettings,
    rng: &mut impl RngCore,
) -> Vec<f64> {
    let mut noise = FastNoiseLite::new();
    noise.set_seed(Some(rng.next_u32() as i32));
    noise.set_noise_type(Some(NoiseType::Perlin));
    noise.set_frequency(Some((1.0 / settings.noise_zoom) as f32));

    let equator = (height / 2) as f64;
    let span = height as f64 * settings.latitude_stretch;

    let mut temperatures = vec![0.0; width * height];
    for y in 0..height {
        let lat = ((y as f64 - equator) * PI / span).cos();
        let lat_temp = settings.equator_temperature * lat * lat;
        for x in 0..width {
            let n = f64::from(noise.get_noise_2d(x as f32, y as f32));
            temperatures[y * width + x] = lat_temp + settings.noise_amplitude * n;
        }
    }
    temperatures
}

/// Температурная поправка на высоту: минус градус на каждые `lapse_rate` метров.
/// Ниже уровня моря поправка слегка повышает температуру.
pub fn apply_lapse_rate(grid: &mut TileGrid, settings: &ClimateSettings) {
    for tile in &mut grid.tiles {
        tile.temperature -= f64::from(tile.elevation) / settings.lapse_rate;
    }
}

/// Распространяет влажность от воды.
///
/// Каждая водная клетка (река, озеро, океан) добавляет `1 / sqrt(1 + i² + j²)` в
/// четыре квадранта вокруг себя. Итог приводится к `[0, max_moisture]` по
/// максимуму среди клеток, не являющихся стоячей водой; стоячая вода, которая
/// может превышать этот максимум, обрезается.
pub fn calculate_moisture(grid: &mut TileGrid, settings: &MoistureSettings) {
    let width = grid.width;
    let height = grid.height;
    let r = settings.radius;

    let weights: Vec<f64> = (0..r * r)
        .map(|k| {
            let (i, j) = ((k / r) as f64, (k % r) as f64);
            1.0 / (1.0 + i * i + j * j).sqrt()
        })
        .collect();

    let mut values = vec![0.0; width * height];
    for y in 0..height {
        for x in 0..width {
            if !grid.get(x, y).water.is_water() {
                continue;
            }
            for i in 0..r {
                for j in 0..r {
                    let w = weights[i * r + j];
                    let (left, right) = (x.checked_sub(i), x + i);
                    let (up, down) = (y.checked_sub(j), y + j);
                    if let (Some(lx), Some(uy)) = (left, up) {
                        values[uy * width + lx] += w;
                    }
                    if let Some(lx) = left {
                        if down < height {
                            values[down * width + lx] += w;
                        }
                    }
                    if let Some(uy) = up {
                        if right < width {
                            values[uy * width + right] += w;
                        }
                    }
                    if right < width && down < height {
                        values[down * width + right] += w;
                    }
                }
            }
        }
    }

    let max = grid
        .tiles
        .iter()
        .zip(&values)
        .filter(|(tile, _)| tile.water != Hydrology::StillWater)
        .fold(0.0_f64, |m, (_, &v)| m.max(v));

    for (tile, &v) in grid.tiles.iter_mut().zip(&values) {
        tile.moisture = if max > 0.0 {
            (settings.max_moisture * v / max).min(settings.max_moisture)
        } else {
            0.0
        };
    }
}
