//! Тектоническое поле высот.
//!
//! Порядок: решётка плит → напряжения и хребты вдоль общих границ →
//! внутренности плит.

pub mod lattice;
pub mod raster;

pub use lattice::{Boundary, Lattice, LatticeBuilder, Plate, Point};

use crate::config::TectonicSettings;
use crate::heightmap::Heightfield;
use rand::Rng;

/// Строит сырое поле высот из решётки тектонических плит
pub fn generate_plate_heightfield(
    width: usize,
    height: usize,
    settings: &TectonicSettings,
    rng: &mut impl Rng,
) -> Heightfield {
    let lattice = LatticeBuilder::new(width, height, settings).build(rng);
    rasterize(&lattice, width, height, settings, rng)
}

/// Растеризует готовую решётку: сначала границы, затем плиты
pub fn rasterize(
    lattice: &Lattice,
    width: usize,
    height: usize,
    settings: &TectonicSettings,
    rng: &mut impl Rng,
) -> Heightfield {
    let mut field = Heightfield::new(width, height);

    for boundary in &lattice.boundaries {
        let Some((a, b)) = boundary.plate_pair() else {
            continue;
        };
        let weight = raster::boundary_stress(
            &lattice.plates[a],
            &lattice.plates[b],
            boundary.direction(),
            settings.stress_scale,
        );
        let displacement = raster::midpoint_displacement(rng);
        raster::draw_boundary(
            &mut field,
            boundary,
            weight,
            &displacement,
            settings.ridge_falloff,
            rng,
        );
    }

    for plate in &lattice.plates {
        raster::draw_plate(&mut field, lattice, plate);
    }

    field
}
