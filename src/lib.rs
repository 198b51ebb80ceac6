pub mod biome;
pub mod climate;
pub mod config;
pub mod error;
pub mod heightmap;
pub mod rivers;
pub mod tectonics;
pub mod tile;
pub mod world;

pub use biome::{Biome, BiomeMap};
pub use config::{LakeFill, MapConfig};
pub use error::{GenError, Result};
pub use heightmap::{Heightfield, SeaLevel};
pub use rivers::{Outlet, RiverPath};
pub use tile::{Hydrology, Tile, TileGrid};
pub use world::{MapGenerator, WorldMap, WorldSummary, generate, generate_with};
