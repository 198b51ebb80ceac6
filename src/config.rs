// src/config.rs
//! Конфигурация генерации карты
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией:
//! - Решётка тектонических плит
//! - Температура и поправка на высоту
//! - Уровень моря и шкала высот
//! - Реки, влажность и пороги биомов
//!
//! Все структуры поддерживают сериализацию в TOML/JSON. Значения по умолчанию
//! воспроизводят классический генератор 180×120.

use crate::error::{GenError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Параметры решётки тектонических плит
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TectonicSettings {
    /// Ширина карты в пикселях на один шестиугольник по горизонтали
    pub hex_span: u32,

    /// Вероятность того, что внутренняя плита окажется сушей
    pub land_probability: f64,

    /// Допуск при слиянии вершин и рёбер соседних шестиугольников.
    /// Точное сравнение ломает дедупликацию общих вершин.
    pub vertex_tolerance: f64,

    /// Делитель радиуса случайного сдвига вершин: `sqrt(w² + h²) / jitter_divisor`
    pub jitter_divisor: f64,

    /// Множитель напряжения на границе плит
    pub stress_scale: f64,

    /// Масштаб косинусного ядра хребта: `cos(dx / ridge_falloff)`
    pub ridge_falloff: f64,
}

impl Default for TectonicSettings {
    fn default() -> Self {
        Self {
            hex_span: 30,
            land_probability: 0.7,
            vertex_tolerance: 0.4,
            jitter_divisor: 3.5,
            stress_scale: 4.0,
            ridge_falloff: 2.6,
        }
    }
}

/// Температурное поле
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClimateSettings {
    /// Температура на экваторе (°C)
    pub equator_temperature: f64,

    /// Амплитуда шумовой добавки (°C)
    pub noise_amplitude: f64,

    /// Масштаб шума в клетках
    pub noise_zoom: f64,

    /// Растяжение широтного косинуса: `cos²(dy·π / (height · latitude_stretch))`
    pub latitude_stretch: f64,

    /// Метров высоты на один градус охлаждения
    pub lapse_rate: f64,
}

impl Default for ClimateSettings {
    fn default() -> Self {
        Self {
            equator_temperature: 26.0,
            noise_amplitude: 3.0,
            noise_zoom: 40.0,
            latitude_stretch: 1.1,
            lapse_rate: 2000.0,
        }
    }
}

/// Уровень моря и шкала высот
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeaSettings {
    /// Нижняя граница целевой доли океана
    pub min_coverage: f64,

    /// Верхняя граница целевой доли океана
    pub max_coverage: f64,

    /// Шаг подбора порога (в нормализованной высоте)
    pub threshold_step: f64,

    /// Высота самой высокой точки после масштабирования (м)
    pub max_elevation: f64,

    /// Радиус сглаживающего окна (2 → 5×5)
    pub smooth_radius: usize,
}

impl Default for SeaSettings {
    fn default() -> Self {
        Self {
            min_coverage: 0.5,
            max_coverage: 0.8,
            threshold_step: 0.05,
            max_elevation: 6000.0,
            smooth_radius: 2,
        }
    }
}

/// Что делать с клеткой суши, со всех четырёх сторон окружённой реками
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LakeFill {
    /// Клетка получает идентификатор реки западного соседа
    #[default]
    AdoptWestRiver,
    /// Клетка становится стоячей водой (идентификатор `0`)
    StillWater,
}

/// Параметры рек
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HydrologySettings {
    /// Минимальная высота истока (м)
    pub source_elevation: i32,

    /// Радиус окна, внутри которого не должно быть других рек
    pub source_spacing: i32,

    /// Вероятность того, что подходящая клетка попадёт в пул кандидатов
    pub source_probability: f64,

    /// На сколько метров новая клетка русла ниже текущей при размыве ямы
    pub erosion_drop: i32,

    /// Предел шагов одной трассировки (по умолчанию `4 · width · height`)
    pub max_trace_steps: Option<usize>,

    pub lake_fill: LakeFill,
}

impl Default for HydrologySettings {
    fn default() -> Self {
        Self {
            source_elevation: 2000,
            source_spacing: 5,
            source_probability: 0.5,
            erosion_drop: 4,
            max_trace_steps: None,
            lake_fill: LakeFill::AdoptWestRiver,
        }
    }
}

/// Диффузия влажности от воды
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MoistureSettings {
    /// Размер квадранта вокруг источника влаги
    pub radius: usize,

    /// Максимум шкалы (см/год)
    pub max_moisture: f64,
}

impl Default for MoistureSettings {
    fn default() -> Self {
        Self {
            radius: 10,
            max_moisture: 400.0,
        }
    }
}

/// Пороги таблицы биомов
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BiomeSettings {
    /// Ниже этой высоты: побережье или низина
    pub coast_elevation: i32,
    /// Порог пустыни по влажности
    pub desert_moisture: f64,
    /// Начиная с этой влажности — всегда лес
    pub forest_moisture: f64,
    /// При средней влажности теплее этого — лес, холоднее — луга
    pub warm_temperature: f64,
    /// Порог гор
    pub mountain_elevation: i32,
}

impl Default for BiomeSettings {
    fn default() -> Self {
        Self {
            coast_elevation: 400,
            desert_moisture: 50.0,
            forest_moisture: 150.0,
            warm_temperature: 24.0,
            mountain_elevation: 4000,
        }
    }
}

/// Основные параметры генерации карты
///
/// Полная конфигурация одного прохода генерации. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapConfig {
    /// Сид генератора случайных чисел (детерминированная генерация)
    #[serde(default)]
    pub seed: u64,

    /// Ширина карты в клетках (по умолчанию 180)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Высота карты в клетках (по умолчанию 120)
    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default)]
    pub tectonics: TectonicSettings,

    #[serde(default)]
    pub climate: ClimateSettings,

    #[serde(default)]
    pub sea: SeaSettings,

    #[serde(default)]
    pub hydrology: HydrologySettings,

    #[serde(default)]
    pub moisture: MoistureSettings,

    #[serde(default)]
    pub biomes: BiomeSettings,
}

fn default_width() -> u32 {
    180
}
fn default_height() -> u32 {
    120
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: default_width(),
            height: default_height(),
            tectonics: TectonicSettings::default(),
            climate: ClimateSettings::default(),
            sea: SeaSettings::default(),
            hydrology: HydrologySettings::default(),
            moisture: MoistureSettings::default(),
            biomes: BiomeSettings::default(),
        }
    }
}

impl MapConfig {
    /// Конфигурация по умолчанию с заданными размерами и сидом
    #[must_use]
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        Self {
            seed,
            width,
            height,
            ..Self::default()
        }
    }

    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// seed = 42
    /// width = 240
    /// height = 160
    ///
    /// [hydrology]
    /// lake_fill = "StillWater"
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Self = toml::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Проверяет размеры и диапазоны параметров
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GenError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.tectonics.hex_span == 0 {
            return Err(GenError::InvalidConfig("tectonics.hex_span must be positive".into()));
        }
        let tectonics = &self.tectonics;
        positive("tectonics.vertex_tolerance", tectonics.vertex_tolerance)?;
        positive("tectonics.ridge_falloff", tectonics.ridge_falloff)?;
        // Делитель меньше единицы сдвигает вершины дальше размера шестиугольника
        if !(tectonics.jitter_divisor.is_finite() && tectonics.jitter_divisor >= 1.0) {
            return Err(GenError::InvalidConfig(format!(
                "tectonics.jitter_divisor must be a finite number >= 1, got {}",
                tectonics.jitter_divisor
            )));
        }
        finite("tectonics.stress_scale", tectonics.stress_scale)?;
        probability("tectonics.land_probability", tectonics.land_probability)?;

        let climate = &self.climate;
        finite("climate.equator_temperature", climate.equator_temperature)?;
        finite("climate.noise_amplitude", climate.noise_amplitude)?;
        positive("climate.noise_zoom", climate.noise_zoom)?;
        positive("climate.latitude_stretch", climate.latitude_stretch)?;
        positive("climate.lapse_rate", climate.lapse_rate)?;

        let sea = &self.sea;
        probability("sea.min_coverage", sea.min_coverage)?;
        probability("sea.max_coverage", sea.max_coverage)?;
        if sea.min_coverage > sea.max_coverage {
            return Err(GenError::InvalidConfig(format!(
                "sea coverage range [{}, {}] is inverted",
                sea.min_coverage, sea.max_coverage
            )));
        }
        positive("sea.threshold_step", sea.threshold_step)?;
        positive("sea.max_elevation", sea.max_elevation)?;

        probability("hydrology.source_probability", self.hydrology.source_probability)?;
        if self.hydrology.max_trace_steps == Some(0) {
            return Err(GenError::InvalidConfig(
                "hydrology.max_trace_steps must be positive".into(),
            ));
        }

        positive("moisture.max_moisture", self.moisture.max_moisture)?;

        let biomes = &self.biomes;
        finite("biomes.desert_moisture", biomes.desert_moisture)?;
        finite("biomes.forest_moisture", biomes.forest_moisture)?;
        finite("biomes.warm_temperature", biomes.warm_temperature)?;
        Ok(())
    }

    /// Предел шагов трассировки одной реки
    #[must_use]
    pub fn max_trace_steps(&self) -> usize {
        self.hydrology
            .max_trace_steps
            .unwrap_or(4 * self.width as usize * self.height as usize)
    }
}

fn finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GenError::InvalidConfig(format!("{name} must be finite, got {value}")))
    }
}

/// Конечное и строго положительное; NaN не проходит
fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GenError::InvalidConfig(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

fn probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GenError::InvalidConfig(format!("{name} must be within [0, 1], got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let params: MapConfig = toml::from_str(
            r#"
            seed = 7
            width = 64

            [hydrology]
            lake_fill = "StillWater"
            source_probability = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(params.seed, 7);
        assert_eq!(params.width, 64);
        assert_eq!(params.height, 120);
        assert_eq!(params.hydrology.lake_fill, LakeFill::StillWater);
        assert_eq!(params.hydrology.source_elevation, 2000);
        assert_eq!(params.tectonics, TectonicSettings::default());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let params = MapConfig::new(0, 10, 1);
        assert!(matches!(
            params.validate(),
            Err(GenError::InvalidDimensions { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_inverted_coverage_rejected() {
        let mut params = MapConfig::default();
        params.sea.min_coverage = 0.9;
        params.sea.max_coverage = 0.6;
        assert!(matches!(params.validate(), Err(GenError::InvalidConfig(_))));
    }

    fn assert_rejected(params: &MapConfig) {
        assert!(
            matches!(params.validate(), Err(GenError::InvalidConfig(_))),
            "accepted {params:?}"
        );
    }

    #[test]
    fn test_zero_or_nan_jitter_divisor_rejected() {
        for divisor in [0.0, 0.5, f64::NAN, f64::INFINITY] {
            let mut params = MapConfig::default();
            params.tectonics.jitter_divisor = divisor;
            assert_rejected(&params);
        }
    }

    #[test]
    fn test_nan_threshold_step_rejected() {
        let mut params = MapConfig::default();
        params.sea.threshold_step = f64::NAN;
        assert_rejected(&params);
        params.sea.threshold_step = -0.05;
        assert_rejected(&params);
    }

    #[test]
    fn test_zero_lapse_rate_rejected() {
        let mut params = MapConfig::default();
        params.climate.lapse_rate = 0.0;
        assert_rejected(&params);
    }

    #[test]
    fn test_zero_ridge_falloff_rejected() {
        let mut params = MapConfig::default();
        params.tectonics.ridge_falloff = 0.0;
        assert_rejected(&params);
    }

    #[test]
    fn test_zero_noise_zoom_rejected() {
        let mut params = MapConfig::default();
        params.climate.noise_zoom = 0.0;
        assert_rejected(&params);
    }

    #[test]
    fn test_non_positive_vertex_tolerance_rejected() {
        for tolerance in [0.0, -0.4, f64::NAN] {
            let mut params = MapConfig::default();
            params.tectonics.vertex_tolerance = tolerance;
            assert_rejected(&params);
        }
    }

    #[test]
    fn test_zero_trace_steps_rejected() {
        let mut params = MapConfig::default();
        params.hydrology.max_trace_steps = Some(0);
        assert_rejected(&params);
        params.hydrology.max_trace_steps = Some(1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_nan_probability_and_moisture_rejected() {
        let mut params = MapConfig::default();
        params.tectonics.land_probability = f64::NAN;
        assert_rejected(&params);

        let mut params = MapConfig::default();
        params.moisture.max_moisture = f64::NAN;
        assert_rejected(&params);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.toml");
        fs::write(&path, "seed = 3\nwidth = 90\nheight = 60\n").unwrap();

        let params = MapConfig::from_toml_file(&path).unwrap();
        assert_eq!((params.width, params.height, params.seed), (90, 60, 3));
        assert_eq!(params.max_trace_steps(), 4 * 90 * 60);
    }
}
