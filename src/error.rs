//! Ошибки генерации карты

use thiserror::Error;

/// Ошибки, возникающие при генерации и чтении карты.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Invalid map dimensions: {width}x{height} (both must be positive)")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Coordinate ({x}, {y}) is outside of the {width}x{height} map")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Трассировка реки не завершилась за отведённое число шагов.
    #[error("River {river_id} did not reach water after {steps} steps")]
    RiverTraceDiverged { river_id: u32, steps: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GenError>;
