use crate::config::SeaSettings;
use crate::error::{GenError, Result};
use image::{ImageBuffer, Luma};
use rand::Rng;

/// Двумерное поле высот до разделения на сушу и океан.
///
/// Значения произвольного масштаба: положительные поднимают рельеф, отрицательные
/// опускают. Индексация построчная: `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Heightfield {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let data = (0..width * height)
            .map(|i| f(i % width, i / width))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.data[y * self.width + x] = value;
    }

    /// Прибавляет значение к клетке; координаты вне карты игнорируются.
    pub fn add(&mut self, x: i32, y: i32, value: f64) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.data[y as usize * self.width + x as usize] += value;
        }
    }

    /// Минимум и максимум поля
    pub fn range(&self) -> (f64, f64) {
        let min = self.data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = self.data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        (min, max)
    }

    /// Нормализует поле в `[0, 1]` по наблюдаемым минимуму и максимуму.
    ///
    /// Плоское поле (`max == min`) считается вырожденным, но допустимым миром:
    /// все клетки получают `0.0`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let (min, max) = self.range();
        let data = if max > min {
            self.data.iter().map(|&h| (h - min) / (max - min)).collect()
        } else {
            vec![0.0; self.data.len()]
        };
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Сглаживание средним по окну `(2r+1)×(2r+1)`.
    ///
    /// На краях окно обрезается до пересечения с картой: без зацикливания и
    /// отражения, делитель равен числу реально попавших в окно клеток.
    #[must_use]
    pub fn smoothed(&self, radius: usize) -> Self {
        let mut data = self.data.clone();
        smooth_heightmap(&mut data, self.width, self.height, radius);
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    pub fn to_grayscale_image(&self) -> Vec<u8> {
        self.normalized()
            .data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect()
    }

    pub fn save_as_png(&self, path: &str) -> Result<()> {
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(
            self.width as u32,
            self.height as u32,
            self.to_grayscale_image(),
        )
        .ok_or_else(|| GenError::InvalidConfig("Failed to create image buffer".into()))?;
        img.save(path)?;
        Ok(())
    }
}

/// Сглаживание через среднее (3×3, 5×5 и т.д.) с обрезанными краями.
///
/// Прямоугольное окно, обрезанное картой, остаётся прямоугольником, поэтому
/// среднее раскладывается на горизонтальный и вертикальный проходы.
pub fn smooth_heightmap(data: &mut [f64], width: usize, height: usize, radius: usize) {
    if radius == 0 || width == 0 || height == 0 {
        return;
    }

    let mut temp = vec![0.0; data.len()];

    // 1. Горизонтальный проход
    for y in 0..height {
        let row = &data[y * width..(y + 1) * width];
        let mut window_sum: f64 = row[..=radius.min(width - 1)].iter().sum();

        for x in 0..width {
            let left = x.saturating_sub(radius);
            let right = (x + radius).min(width - 1);
            temp[y * width + x] = window_sum / (right - left + 1) as f64;

            // Сдвигаем окно: убираем левый пиксель, добавляем правый
            if x >= radius {
                window_sum -= row[x - radius];
            }
            if x + radius + 1 < width {
                window_sum += row[x + radius + 1];
            }
        }
    }

    // 2. Вертикальный проход
    for x in 0..width {
        let mut window_sum = 0.0;
        for y in 0..=radius.min(height - 1) {
            window_sum += temp[y * width + x];
        }

        for y in 0..height {
            let top = y.saturating_sub(radius);
            let bottom = (y + radius).min(height - 1);
            data[y * width + x] = window_sum / (bottom - top + 1) as f64;

            if y >= radius {
                window_sum -= temp[(y - radius) * width + x];
            }
            if y + radius + 1 < height {
                window_sum += temp[(y + radius + 1) * width + x];
            }
        }
    }
}

/// Результат подбора уровня моря
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeaLevel {
    /// Порог в нормализованной высоте: всё, что ниже, — океан
    pub threshold: f64,
    /// Случайно выбранная целевая доля океана
    pub target_coverage: f64,
    /// Число клеток ниже порога
    pub ocean_cells: usize,
}

impl SeaLevel {
    /// Доля океана на карте
    pub fn coverage(&self, cells: usize) -> f64 {
        self.ocean_cells as f64 / cells as f64
    }
}

/// Подбирает уровень моря для нормализованного поля.
///
/// Целевая доля океана выбирается равномерно из
/// `[min_coverage, max_coverage]`. Порог растёт шагами `threshold_step`, начиная
/// с `0.05 + step`, пока доля клеток ниже порога не достигнет цели. Подбор грубый:
/// результат превышает цель не более чем на один шаг порога.
pub fn solve_sea_level(normalized: &Heightfield, sea: &SeaSettings, rng: &mut impl Rng) -> SeaLevel {
    let target_coverage = if sea.max_coverage > sea.min_coverage {
        rng.gen_range(sea.min_coverage..sea.max_coverage)
    } else {
        sea.min_coverage
    };

    let total = normalized.data.len();
    let mut marked = vec![false; total];
    let mut count = 0usize;
    let mut threshold = 0.05;

    // Нормализованные значения не превышают 1.0, так что цикл конечен
    while (count as f64) / (total as f64) < target_coverage && threshold <= 1.0 {
        threshold += sea.threshold_step;
        for (i, &h) in normalized.data.iter().enumerate() {
            if !marked[i] && h < threshold {
                marked[i] = true;
                count += 1;
            }
        }
    }

    log::info!(
        "Sea level: {threshold:.2} (target coverage {:.1}%, reached {:.1}%)",
        target_coverage * 100.0,
        count as f64 / total as f64 * 100.0
    );

    SeaLevel {
        threshold,
        target_coverage,
        ocean_cells: count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_smoothing_uses_clipped_windows() {
        // Одна ненулевая клетка в углу: окно 5×5 в углу содержит 3×3 клетки
        let mut field = Heightfield::new(6, 6);
        field.set(0, 0, 9.0);
        let smoothed = field.smoothed(2);

        assert_relative_eq!(smoothed.get(0, 0), 1.0, epsilon = 1e-12);
        // (2, 2): окно x∈[0,4], y∈[0,4] → 25 клеток
        assert_relative_eq!(smoothed.get(2, 2), 9.0 / 25.0, epsilon = 1e-12);
        // (3, 3): окно x∈[1,5] не содержит угла
        assert_relative_eq!(smoothed.get(3, 3), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smoothing_preserves_constant_field() {
        let field = Heightfield::from_fn(7, 4, |_, _| 2.5);
        let smoothed = field.smoothed(2);
        for &v in &smoothed.data {
            assert_relative_eq!(v, 2.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_flat_field_normalizes_to_zero() {
        let field = Heightfield::from_fn(4, 4, |_, _| -3.0);
        let normalized = field.normalized();
        assert!(normalized.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalized_range() {
        let field = Heightfield::from_fn(5, 3, |x, y| x as f64 * 2.0 - y as f64);
        let (min, max) = field.normalized().range();
        assert_relative_eq!(min, 0.0);
        assert_relative_eq!(max, 1.0);
    }

    #[test]
    fn test_sea_level_overshoots_by_at_most_one_step() {
        let sea = SeaSettings::default();
        let field = Heightfield::from_fn(40, 30, |x, y| {
            ((x as f64 * 12.9898 + y as f64 * 78.233).sin() * 43_758.545).fract()
        })
        .normalized();
        let total = field.data.len();

        for seed in 0..8 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let level = solve_sea_level(&field, &sea, &mut rng);

            let below = |t: f64| field.data.iter().filter(|&&h| h < t).count();
            assert_eq!(below(level.threshold), level.ocean_cells);
            assert!(level.coverage(total) >= level.target_coverage);
            // Порогом на шаг ниже цель ещё не достигалась
            let previous = level.threshold - sea.threshold_step;
            assert!((below(previous) as f64) / (total as f64) < level.target_coverage);
        }
    }

    #[test]
    fn test_flat_world_is_all_ocean() {
        let field = Heightfield::new(4, 4).normalized();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let level = solve_sea_level(&field, &SeaSettings::default(), &mut rng);
        assert_eq!(level.ocean_cells, 16);
        assert_relative_eq!(level.threshold, 0.1, epsilon = 1e-9);
    }
}
