use crate::config::{HydrologySettings, LakeFill};
use crate::error::{GenError, Result};
use crate::tile::{Hydrology, TileGrid};
use rand::Rng;
use serde::Serialize;

/// Куда впала река
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outlet {
    /// Океан или озеро
    StillWater { x: usize, y: usize },
    /// Другая река
    River { id: u32, x: usize, y: usize },
}

/// Путь одной реки от истока до устья в порядке трассировки
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiverPath {
    pub id: u32,
    pub cells: Vec<(usize, usize)>,
    pub outlet: Outlet,
}

impl RiverPath {
    pub fn source(&self) -> (usize, usize) {
        self.cells[0]
    }
}

/// Соседи в порядке обхода: по `x`, затем по `y`.
/// При равном уклоне побеждает последний.
const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Есть ли река в окне `(2·spacing+1)²` вокруг клетки (без самой клетки)
fn nearby_river(grid: &TileGrid, x: usize, y: usize, spacing: i32) -> bool {
    for dx in -spacing..=spacing {
        for dy in -spacing..=spacing {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (x as i32 + dx, y as i32 + dy);
            if grid.in_bounds(nx, ny)
                && grid.get(nx as usize, ny as usize).water.river_id().is_some()
            {
                return true;
            }
        }
    }
    false
}

/// Клетки-кандидаты в истоки: высокая сухая суша без рек поблизости.
/// Каждая подходящая клетка принимается с вероятностью `source_probability`.
fn source_candidates(
    grid: &TileGrid,
    settings: &HydrologySettings,
    rng: &mut impl Rng,
) -> Vec<(usize, usize)> {
    let mut candidates = Vec::new();
    for x in 0..grid.width {
        for y in 0..grid.height {
            let tile = grid.get(x, y);
            if tile.elevation > settings.source_elevation
                && tile.water == Hydrology::Dry
                && !nearby_river(grid, x, y, settings.source_spacing)
                && rng.gen_bool(settings.source_probability)
            {
                candidates.push((x, y));
            }
        }
    }
    candidates
}

/// Закладывает реки, пока находятся кандидаты в истоки.
///
/// На каждом круге сетка просматривается заново, один исток выбирается
/// случайно и трассируется до воды. Идентификаторы рек идут с единицы.
pub fn generate_rivers(
    grid: &mut TileGrid,
    settings: &HydrologySettings,
    max_steps: usize,
    rng: &mut impl Rng,
) -> Result<Vec<RiverPath>> {
    let mut rivers = Vec::new();
    let mut id = 1;
    loop {
        let candidates = source_candidates(grid, settings, rng);
        if candidates.is_empty() {
            break;
        }
        let start = candidates[rng.gen_range(0..candidates.len())];
        let path = trace_river(grid, start, id, settings.erosion_drop, max_steps, rng)?;
        log::debug!(
            "River {id}: {} cells from {:?} to {:?}",
            path.cells.len(),
            start,
            path.outlet
        );
        rivers.push(path);
        id += 1;
    }
    log::info!("Rivers: {}", rivers.len());
    Ok(rivers)
}

/// Трассирует реку по наибольшему уклону от `start`.
///
/// Уклон к соседу делится на расстояние, чтобы диагонали не имели
/// преимущества. Если лучший сосед — вода, река заканчивается. Если он выше
/// текущей клетки, русло прорезается: сосед становится на `erosion_drop` ниже.
/// Клетка, окружённая только собственным руслом, перепрыгивает на две клетки
/// в случайном направлении.
pub fn trace_river(
    grid: &mut TileGrid,
    start: (usize, usize),
    id: u32,
    erosion_drop: i32,
    max_steps: usize,
    rng: &mut impl Rng,
) -> Result<RiverPath> {
    let river = Hydrology::River(id);
    let (mut x, mut y) = start;
    let mut cells = Vec::new();

    for _ in 0..max_steps {
        let idx = grid.index(x, y);
        grid.tiles[idx].water = river;
        // Прыжок на месте (нулевой сдвиг или упор в край) не добавляет клетку повторно
        if cells.last() != Some(&(x, y)) {
            cells.push((x, y));
        }
        let current = grid.tiles[idx].elevation;

        let mut best: Option<(usize, usize, f64)> = None;
        for &(dx, dy) in &NEIGHBORS {
            let (nx, ny) = (x as i32 + dx, y as i32 + dy);
            if !grid.in_bounds(nx, ny) {
                continue;
            }
            let neighbor = grid.get(nx as usize, ny as usize);
            if neighbor.water == river {
                continue;
            }
            let slope = f64::from(neighbor.elevation - current) / f64::from(dx * dx + dy * dy).sqrt();
            if best.is_none_or(|(_, _, min)| slope <= min) {
                best = Some((nx as usize, ny as usize, slope));
            }
        }

        match best {
            Some((nx, ny, slope)) => {
                let next = grid.get_mut(nx, ny);
                match next.water {
                    Hydrology::StillWater => {
                        return Ok(RiverPath {
                            id,
                            cells,
                            outlet: Outlet::StillWater { x: nx, y: ny },
                        });
                    }
                    Hydrology::River(other) => {
                        return Ok(RiverPath {
                            id,
                            cells,
                            outlet: Outlet::River { id: other, x: nx, y: ny },
                        });
                    }
                    Hydrology::Dry => {}
                }
                if slope > 0.0 {
                    next.elevation = current - erosion_drop;
                }
                (x, y) = (nx, ny);
            }
            None => {
                let jump = |v: usize, limit: usize, step: i32| {
                    (v as i32 + 2 * step).clamp(0, limit as i32 - 1) as usize
                };
                let nx = jump(x, grid.width, rng.gen_range(-1..=1));
                let ny = jump(y, grid.height, rng.gen_range(-1..=1));
                if let Some(outlet) = outlet_at(grid, nx, ny, id) {
                    return Ok(RiverPath { id, cells, outlet });
                }
                (x, y) = (nx, ny);
            }
        }
    }

    Err(GenError::RiverTraceDiverged {
        river_id: id,
        steps: max_steps,
    })
}

fn outlet_at(grid: &TileGrid, x: usize, y: usize, id: u32) -> Option<Outlet> {
    match grid.get(x, y).water {
        Hydrology::StillWater => Some(Outlet::StillWater { x, y }),
        Hydrology::River(other) if other != id => Some(Outlet::River { id: other, x, y }),
        _ => None,
    }
}

/// Завершающий проход по воде.
///
/// Высота каждой клетки заменяется средним по окну 3×3 (на месте, проход по
/// столбцам). Внутренняя сухая клетка, у которой все четыре стороны заняты
/// реками, заполняется согласно `lake_fill`.
pub fn water_pass(grid: &mut TileGrid, lake_fill: LakeFill) {
    let width = grid.width;
    let height = grid.height;

    for x in 0..width {
        for y in 0..height {
            let mut sum = 0;
            let mut count = 0;
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                    sum += grid.get(nx, ny).elevation;
                    count += 1;
                }
            }
            grid.get_mut(x, y).elevation = sum / count;

            let interior = x > 0 && y > 0 && x + 1 < width && y + 1 < height;
            if !interior || grid.get(x, y).water != Hydrology::Dry {
                continue;
            }
            let west = grid.get(x - 1, y).water;
            let enclosed = [west, grid.get(x + 1, y).water, grid.get(x, y - 1).water, grid.get(x, y + 1).water]
                .iter()
                .all(|w| w.river_id().is_some());
            if enclosed {
                grid.get_mut(x, y).water = match lake_fill {
                    LakeFill::AdoptWestRiver => west,
                    LakeFill::StillWater => Hydrology::StillWater,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Остров: кольцо океана по краю, внутри ровная суша
    fn island(size: usize, elevation: i32) -> TileGrid {
        TileGrid::from_fn(size, size, |x, y| {
            let border = x == 0 || y == 0 || x + 1 == size || y + 1 == size;
            Tile {
                elevation: if border { -100 } else { elevation },
                is_land: !border,
                water: if border { Hydrology::StillWater } else { Hydrology::Dry },
                ..Tile::default()
            }
        })
    }

    #[test]
    fn test_trace_descends_to_still_water() {
        let mut grid = island(11, 0);
        grid.get_mut(5, 5).elevation = 5000;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let path = trace_river(&mut grid, (5, 5), 1, 4, 100, &mut rng).unwrap();

        assert_eq!(path.source(), (5, 5));
        // Самый крутой спуск — по стороне; при равенстве берётся последний сосед (восток)
        assert_eq!(path.cells[1], (6, 5));
        assert!(matches!(path.outlet, Outlet::StillWater { .. }));
        for pair in path.cells.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(a.0.abs_diff(b.0) <= 1 && a.1.abs_diff(b.1) <= 1);
            assert!(grid.get(b.0, b.1).elevation <= grid.get(a.0, a.1).elevation);
        }
        for &(x, y) in &path.cells {
            assert_eq!(grid.get(x, y).water, Hydrology::River(1));
        }
    }

    #[test]
    fn test_trace_erodes_through_pit() {
        // Исток в яме: все соседи выше, русло прорезается
        let mut grid = island(9, 3000);
        grid.get_mut(4, 4).elevation = 2500;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let path = trace_river(&mut grid, (4, 4), 1, 4, 200, &mut rng).unwrap();

        let (nx, ny) = path.cells[1];
        assert_eq!(grid.get(nx, ny).elevation, 2496);
        assert!(matches!(path.outlet, Outlet::StillWater { .. }));
    }

    #[test]
    fn test_trace_joins_existing_river() {
        let mut grid = island(11, 1000);
        for y in 1..10 {
            let tile = grid.get_mut(7, y);
            tile.water = Hydrology::River(1);
            tile.elevation = 0;
        }
        grid.get_mut(5, 5).elevation = 3000;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let path = trace_river(&mut grid, (5, 5), 2, 4, 100, &mut rng).unwrap();
        assert!(matches!(path.outlet, Outlet::River { id: 1, .. }));
    }

    #[test]
    fn test_trace_is_bounded() {
        // Нет воды вовсе: трассировка обязана остановиться с ошибкой
        let mut grid = TileGrid::from_fn(6, 6, |_, _| Tile {
            elevation: 100,
            is_land: true,
            ..Tile::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let result = trace_river(&mut grid, (2, 2), 1, 4, 500, &mut rng);
        assert!(matches!(
            result,
            Err(GenError::RiverTraceDiverged { river_id: 1, steps: 500 })
        ));
    }

    #[test]
    fn test_no_sources_below_threshold() {
        let mut grid = island(12, 1500);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let rivers = generate_rivers(&mut grid, &HydrologySettings::default(), 1000, &mut rng).unwrap();
        assert!(rivers.is_empty());
        assert!(grid.tiles.iter().all(|t| t.water.river_id().is_none()));
    }

    #[test]
    fn test_sources_are_spaced_and_ids_increase() {
        let mut grid = island(40, 2500);
        let settings = HydrologySettings {
            source_probability: 1.0,
            ..HydrologySettings::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rivers = generate_rivers(&mut grid, &settings, 10_000, &mut rng).unwrap();

        assert!(!rivers.is_empty());
        for (i, river) in rivers.iter().enumerate() {
            assert_eq!(river.id as usize, i + 1);
        }
    }

    #[test]
    fn test_boxed_in_source_jumps_two_cells_and_continues() {
        // Все восемь соседей истока уже принадлежат этой же реке
        let mut grid = island(9, 100);
        for &(dx, dy) in &NEIGHBORS {
            grid.get_mut((4 + dx) as usize, (4 + dy) as usize).water = Hydrology::River(1);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let path = trace_river(&mut grid, (4, 4), 1, 4, 500, &mut rng).unwrap();

        assert_eq!(path.source(), (4, 4));
        let (jx, jy) = path.cells[1];
        assert_eq!(jx.abs_diff(4).max(jy.abs_diff(4)), 2);
        assert!(path.cells.len() > 2);
        assert!(path.cells.windows(2).all(|pair| pair[0] != pair[1]));
        assert!(matches!(path.outlet, Outlet::StillWater { .. }));
    }

    #[test]
    fn test_water_pass_can_sink_coastal_land_below_zero() {
        let mut grid = island(5, 90);
        water_pass(&mut grid, LakeFill::AdoptWestRiver);
        // Клетка остаётся сушей, хотя среднее по соседям с океаном отрицательное
        let tile = grid.get(3, 3);
        assert!(tile.is_land);
        assert_eq!(tile.elevation, -27);
        assert_eq!(grid.get(2, 2).elevation, 62);
    }

    #[test]
    fn test_water_pass_smooths_and_fills_enclosed_cell() {
        let mut grid = island(5, 90);
        grid.get_mut(1, 2).water = Hydrology::River(3);
        grid.get_mut(3, 2).water = Hydrology::River(4);
        grid.get_mut(2, 1).water = Hydrology::River(4);
        grid.get_mut(2, 3).water = Hydrology::River(4);

        let mut adopt = grid.clone();
        water_pass(&mut adopt, LakeFill::AdoptWestRiver);
        assert_eq!(adopt.get(2, 2).water, Hydrology::River(3));
        // Угол (0, 0): окно 2×2 из океана и суши; деление целочисленное
        assert_eq!(adopt.get(0, 0).elevation, (-100 * 3 + 90) / 4);

        water_pass(&mut grid, LakeFill::StillWater);
        assert_eq!(grid.get(2, 2).water, Hydrology::StillWater);
    }
}
