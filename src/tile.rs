//! Клетки карты и сетка клеток

use crate::biome::Biome;
use serde::{Deserialize, Serialize};

/// Водное состояние клетки.
///
/// Числовой код (`id()`): `-1` — суша без воды, `0` — стоячая вода (океан или
/// озеро), `>0` — русло конкретной реки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Hydrology {
    #[default]
    Dry,
    StillWater,
    River(u32),
}

impl Hydrology {
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Hydrology::Dry => -1,
            Hydrology::StillWater => 0,
            Hydrology::River(id) => i64::from(id),
        }
    }

    pub fn is_water(self) -> bool {
        !matches!(self, Hydrology::Dry)
    }

    pub fn river_id(self) -> Option<u32> {
        match self {
            Hydrology::River(id) => Some(id),
            _ => None,
        }
    }
}

/// Одна клетка карты
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Tile {
    /// Высота в метрах (ниже уровня моря отрицательная).
    ///
    /// Диапазон `[0, max_elevation]` для суши гарантирован только сразу после
    /// разделения на сушу и океан. Размыв русел и итоговое усреднение 3×3
    /// могут опустить прибрежную сушу немного ниже нуля, `is_land` при этом
    /// не меняется.
    pub elevation: i32,
    /// Температура (°C) с поправкой на высоту
    pub temperature: f64,
    /// Влажность, 0..400 см/год
    pub moisture: f64,
    /// Клетка выше уровня моря на момент разделения
    pub is_land: bool,
    pub water: Hydrology,
    /// При чтении не принимается: биом задаёт только классификатор
    #[serde(skip_deserializing)]
    pub(crate) biome: Biome,
}

impl Tile {
    /// Биом клетки; назначается только классификатором.
    pub fn biome(&self) -> Biome {
        self.biome
    }
}

/// Прямоугольная сетка клеток, индексация построчная: `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::default(); width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> Tile) -> Self {
        let tiles = (0..width * height)
            .map(|i| f(i % width, i / width))
            .collect();
        Self {
            width,
            height,
            tiles,
        }
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> &Tile {
        &self.tiles[y * self.width + x]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Tile {
        let idx = self.index(x, y);
        &mut self.tiles[idx]
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Доля клеток океана/стоячей воды
    pub fn ocean_fraction(&self) -> f64 {
        let ocean = self.tiles.iter().filter(|t| !t.is_land).count();
        ocean as f64 / self.tiles.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hydrology_ids() {
        assert_eq!(Hydrology::Dry.id(), -1);
        assert_eq!(Hydrology::StillWater.id(), 0);
        assert_eq!(Hydrology::River(12).id(), 12);
        assert!(!Hydrology::Dry.is_water());
        assert_eq!(Hydrology::River(3).river_id(), Some(3));
        assert_eq!(Hydrology::StillWater.river_id(), None);
    }

    #[test]
    fn test_deserialized_tile_ignores_biome() {
        let tile = Tile {
            elevation: 4500,
            is_land: true,
            biome: Biome::Mountain,
            ..Tile::default()
        };
        let json = serde_json::to_string(&tile).unwrap();
        assert!(json.contains("Mountain"));

        let restored: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.elevation, 4500);
        assert_eq!(restored.biome(), Biome::default());
    }

    #[test]
    fn test_grid_bounds_and_indexing() {
        let grid = TileGrid::from_fn(3, 2, |x, y| Tile {
            elevation: (x + 10 * y) as i32,
            ..Tile::default()
        });
        assert_eq!(grid.get(2, 1).elevation, 12);
        assert_eq!(grid.index(2, 1), 5);
        assert!(grid.in_bounds(0, 0));
        assert!(!grid.in_bounds(3, 0));
        assert!(!grid.in_bounds(0, -1));
    }
}
