use crate::config::BiomeSettings;
use crate::error::{GenError, Result};
use crate::tile::{Hydrology, Tile, TileGrid};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Биом клетки; числовой код (`code()`) — 0..6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Biome {
    /// Побережье и низины ниже 400 м
    #[default]
    Coast,
    Desert,
    Forest,
    Grassland,
    Mountain,
    /// Стоячая вода: океан или озеро
    Water,
    River,
}

impl Biome {
    pub const ALL: [Biome; 7] = [
        Biome::Coast,
        Biome::Desert,
        Biome::Forest,
        Biome::Grassland,
        Biome::Mountain,
        Biome::Water,
        Biome::River,
    ];

    pub fn code(self) -> u8 {
        match self {
            Biome::Coast => 0,
            Biome::Desert => 1,
            Biome::Forest => 2,
            Biome::Grassland => 3,
            Biome::Mountain => 4,
            Biome::Water => 5,
            Biome::River => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Biome> {
        Biome::ALL.get(usize::from(code)).copied()
    }

    pub fn to_rgb(self) -> [u8; 3] {
        match self {
            Biome::Coast => [214, 200, 150],
            Biome::Desert => [230, 205, 120],
            Biome::Forest => [40, 110, 50],
            Biome::Grassland => [130, 190, 90],
            Biome::Mountain => [140, 135, 130],
            Biome::Water => [20, 60, 140],
            Biome::River => [60, 130, 210],
        }
    }
}

/// Таблица решений для одной клетки.
///
/// Река и стоячая вода проверяются первыми и никогда не становятся горами;
/// горный порог применяется только к сухой суше выше побережья.
pub fn classify(tile: &Tile, settings: &BiomeSettings) -> Biome {
    match tile.water {
        Hydrology::StillWater => return Biome::Water,
        Hydrology::River(_) => return Biome::River,
        Hydrology::Dry => {}
    }
    if tile.elevation < settings.coast_elevation {
        return Biome::Coast;
    }

    let biome = if tile.moisture < settings.desert_moisture {
        Biome::Desert
    } else if tile.moisture < settings.forest_moisture {
        if tile.temperature < settings.warm_temperature {
            Biome::Grassland
        } else {
            Biome::Forest
        }
    } else {
        Biome::Forest
    };

    if tile.elevation > settings.mountain_elevation {
        Biome::Mountain
    } else {
        biome
    }
}

/// Назначает биомы всем клеткам сетки
pub fn assign_biomes(grid: &mut TileGrid, settings: &BiomeSettings) {
    #[cfg(feature = "parallel")]
    grid.tiles
        .par_iter_mut()
        .for_each(|tile| tile.biome = classify(tile, settings));

    #[cfg(not(feature = "parallel"))]
    for tile in &mut grid.tiles {
        tile.biome = classify(tile, settings);
    }
}

/// Снимок биомов для отрисовки
#[derive(Debug, Clone)]
pub struct BiomeMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<Biome>,
}

impl BiomeMap {
    pub fn from_grid(grid: &TileGrid) -> Self {
        Self {
            width: grid.width as u32,
            height: grid.height as u32,
            data: grid.tiles.iter().map(Tile::biome).collect(),
        }
    }

    /// Сколько клеток каждого биома, по кодам 0..6
    pub fn histogram(&self) -> [usize; 7] {
        let mut counts = [0; 7];
        for b in &self.data {
            counts[usize::from(b.code())] += 1;
        }
        counts
    }

    /// RGBA-изображение, каждая клетка рисуется квадратом `scale×scale`
    pub fn to_rgba_image(&self, scale: u32) -> Vec<u8> {
        let scale = scale.max(1) as usize;
        let width = self.width as usize;
        let row_len = width * scale * 4;

        let render_row = |y: usize| -> Vec<u8> {
            let row: Vec<u8> = self.data[y * width..(y + 1) * width]
                .iter()
                .flat_map(|&b| {
                    let [r, g, b] = b.to_rgb();
                    std::iter::repeat([r, g, b, 255]).take(scale).flatten()
                })
                .collect();
            row.repeat(scale)
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<u8>> = (0..self.height as usize).into_par_iter().map(render_row).collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<u8>> = (0..self.height as usize).map(render_row).collect();

        let mut out = Vec::with_capacity(row_len * scale * self.height as usize);
        for row in rows {
            out.extend_from_slice(&row);
        }
        out
    }

    pub fn save_as_png(&self, path: &str, scale: u32) -> Result<()> {
        let scale = scale.max(1);
        let img: image::ImageBuffer<image::Rgba<u8>, Vec<u8>> = image::ImageBuffer::from_raw(
            self.width * scale,
            self.height * scale,
            self.to_rgba_image(scale),
        )
        .ok_or_else(|| GenError::InvalidConfig("Failed to create image buffer".into()))?;
        img.save(path)?;
        Ok(())
    }
}
