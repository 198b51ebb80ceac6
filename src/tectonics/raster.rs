//! Растеризация границ и внутренностей плит в поле высот

use super::lattice::{Boundary, HEX_SIDES, Lattice, Plate, Point};
use crate::heightmap::Heightfield;
use rand::Rng;
use std::collections::HashSet;

/// Число отсчётов кривой смещения границы (2⁵ + 1)
pub const DISPLACEMENT_SAMPLES: usize = 33;

/// Полуширина ядра хребта (ядро 9×9)
const RIDGE_RADIUS: i32 = 4;

/// Округление к ближайшему целому; дробная часть ровно 0.5 и отрицательные
/// остатки уходят вниз.
fn snap(v: f64) -> f64 {
    if v % 1.0 < 0.5 { v.floor() } else { v.ceil() }
}

/// Одномерное смещение средней точки: концы закреплены в нуле, пять уровней
/// деления пополам.
pub fn midpoint_displacement(rng: &mut impl Rng) -> [f64; DISPLACEMENT_SAMPLES] {
    let mut curve = [0.0; DISPLACEMENT_SAMPLES];
    for level in (0..5).rev() {
        let dist = 1usize << level;
        for j in (dist..DISPLACEMENT_SAMPLES).step_by(dist * 2) {
            let noise = rng.gen_range(-1.0..1.0) * rng.gen_range(0.0..1.0);
            curve[j] = (curve[j - dist] + curve[j + dist]) / 2.0 + dist as f64 * noise;
        }
    }
    curve
}

/// Напряжение на границе двух плит.
///
/// Знак и величина двойного псевдоскалярного произведения различают
/// сходящиеся, расходящиеся и сдвиговые границы. Ориентация ребра на результат
/// не влияет: оба множителя меняют знак одновременно.
pub fn boundary_stress(a: &Plate, b: &Plate, edge_dir: Point, scale: f64) -> f64 {
    scale * a.direction().cross(edge_dir) * b.direction().cross(edge_dir)
}

/// Рисует границу как зашумлённую линию от `start` к `end`.
///
/// На каждом полушаге в поле добавляется косинусное пятно 9×9, умноженное на
/// `random() * weight`: положительный вес даёт хребты, отрицательный — рифты.
pub fn draw_boundary(
    field: &mut Heightfield,
    boundary: &Boundary,
    weight: f64,
    displacement: &[f64; DISPLACEMENT_SAMPLES],
    falloff: f64,
    rng: &mut impl Rng,
) {
    let distance = boundary.length();
    if distance <= 0.0 {
        return;
    }
    let unit = boundary.direction();
    let x_ini = boundary.start.x as i32;
    let y_ini = boundary.start.y as i32;

    let profile: Vec<f64> = (-RIDGE_RADIUS..=RIDGE_RADIUS)
        .map(|d| (f64::from(d) / falloff).cos())
        .collect();

    let mut i = 1;
    while f64::from(i) < distance * 2.0 {
        let h_add = rng.gen_range(0.0..1.0) * weight;
        let sample = ((f64::from(i) / distance * 16.0) as usize).min(DISPLACEMENT_SAMPLES - 1);
        let offset = displacement[sample];

        let x_new = unit.x * f64::from(i) / 2.0 + unit.y * offset;
        let y_new = unit.y * f64::from(i) / 2.0 - unit.x * offset;
        let cx = x_ini + snap(x_new) as i32;
        let cy = y_ini + snap(y_new) as i32;

        for (dx, wx) in (-RIDGE_RADIUS..=RIDGE_RADIUS).zip(&profile) {
            for (dy, wy) in (-RIDGE_RADIUS..=RIDGE_RADIUS).zip(&profile) {
                field.add(cx + dx, cy + dy, wx * wy * h_add);
            }
        }
        i += 1;
    }
}

/// Добавляет в `area` точки отрезка с единичным шагом, без повторов.
fn trace_line(area: &mut Vec<Point>, seen: &mut HashSet<(i64, i64)>, from: Point, to: Point) {
    let distance = to.sub(from).length();
    if distance <= 0.0 {
        return;
    }
    let unit = to.sub(from).unit();
    let mut i = 0;
    while f64::from(i) < distance {
        let p = Point::new(
            snap(from.x + unit.x * f64::from(i)),
            snap(from.y + unit.y * f64::from(i)),
        );
        if seen.insert((p.x as i64, p.y as i64)) {
            area.push(p);
        }
        i += 1;
    }
}

/// Наибольшее расстояние между вершинами
fn max_distance(outline: &[Point; HEX_SIDES]) -> f64 {
    let mut max = 0.0_f64;
    for i in 0..HEX_SIDES {
        for j in i..HEX_SIDES {
            max = max.max(outline[i].sub(outline[j]).length());
        }
    }
    max
}

/// Смещения клеток, покрываемых плитой, относительно её центра.
///
/// Контур плиты повторяется концентрическими уменьшенными копиями от
/// наибольшего размера до нуля с единичным шагом.
pub fn plate_footprint(lattice: &Lattice, plate: &Plate) -> Vec<Point> {
    let outline = lattice
        .plate_outline(plate)
        .map(|v| v.sub(plate.center));
    let max = max_distance(&outline);

    let mut area = Vec::new();
    let mut seen = HashSet::new();
    for ring in (0..=max.floor() as u32).rev() {
        let scale = f64::from(ring) / (max + 1.0);
        let scaled = outline.map(|v| Point::new(v.x * scale, v.y * scale));
        for k in 0..HEX_SIDES {
            trace_line(&mut area, &mut seen, scaled[k], scaled[(k + 1) % HEX_SIDES]);
        }
    }
    area
}

/// Равномерно добавляет вес плиты во все клетки её отпечатка
pub fn draw_plate(field: &mut Heightfield, lattice: &Lattice, plate: &Plate) {
    let weight = plate.interior_weight();
    for offset in plate_footprint(lattice, plate) {
        let x = (plate.center.x + offset.x) as i32;
        let y = (plate.center.y + offset.y) as i32;
        field.add(x, y, weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plate(velocity: Point, ocean: bool) -> Plate {
        Plate {
            id: 0,
            center: Point::default(),
            velocity,
            ocean,
            vertices: [0, 1, 2, 3, 4, 5],
            opposite_borders: 0,
        }
    }

    #[test]
    fn test_snap() {
        assert_eq!(snap(2.3), 2.0);
        assert_eq!(snap(2.5), 3.0);
        assert_eq!(snap(2.7), 3.0);
        assert_eq!(snap(-0.3), -1.0);
        assert_eq!(snap(-1.0), -1.0);
    }

    #[test]
    fn test_midpoint_displacement_endpoints_fixed_and_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let curve = midpoint_displacement(&mut rng);
        assert_eq!(curve[0], 0.0);
        assert_eq!(curve[DISPLACEMENT_SAMPLES - 1], 0.0);
        // Сумма амплитуд по уровням: 16 + 8 + 4 + 2 + 1
        assert!(curve.iter().all(|v| v.abs() < 31.0));
        assert!(curve.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_stress_sign_models_boundary_type() {
        let edge = Point::new(0.0, 1.0);
        // Обе плиты движутся поперёк ребра в одну сторону: положительное напряжение
        let same = boundary_stress(
            &plate(Point::new(1.0, 0.0), false),
            &plate(Point::new(0.5, 0.0), false),
            edge,
            4.0,
        );
        assert_relative_eq!(same, 4.0, epsilon = 1e-12);
        // Навстречу друг другу: отрицательное
        let opposite = boundary_stress(
            &plate(Point::new(1.0, 0.0), false),
            &plate(Point::new(-1.0, 0.0), false),
            edge,
            4.0,
        );
        assert_relative_eq!(opposite, -4.0, epsilon = 1e-12);
        // Сдвиг вдоль ребра: ноль
        let transform = boundary_stress(
            &plate(Point::new(0.0, 1.0), false),
            &plate(Point::new(1.0, 0.0), false),
            edge,
            4.0,
        );
        assert_relative_eq!(transform, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_draw_boundary_deposits_along_edge() {
        let mut field = Heightfield::new(40, 40);
        let boundary = Boundary {
            start: Point::new(10.0, 20.0),
            end: Point::new(30.0, 20.0),
            first: 0,
            second: Some(1),
        };
        let flat = [0.0; DISPLACEMENT_SAMPLES];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        draw_boundary(&mut field, &boundary, 2.0, &flat, 2.6, &mut rng);

        assert!(field.get(20, 20) > 0.0);
        // Вне ядра 9×9 вокруг линии ничего не меняется
        assert_eq!(field.get(20, 10), 0.0);
        assert_eq!(field.get(2, 20), 0.0);
        assert!(field.data.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_plate_footprint_covers_center_and_is_unique() {
        let lattice = Lattice {
            hex_width: 10.0,
            hex_height: 11.547,
            columns: 1,
            rows: 1,
            plates: vec![plate(Point::new(1.0, 0.0), false)],
            vertices: vec![
                Point::new(0.0, 7.7),
                Point::new(5.0, 3.85),
                Point::new(5.0, -3.85),
                Point::new(0.0, -7.7),
                Point::new(-5.0, -3.85),
                Point::new(-5.0, 3.85),
            ],
            boundaries: Vec::new(),
        };
        let footprint = plate_footprint(&lattice, &lattice.plates[0]);
        assert!(footprint.contains(&Point::new(0.0, 0.0)) || footprint.contains(&Point::new(-1.0, 0.0)));
        let unique: HashSet<(i64, i64)> = footprint.iter().map(|p| (p.x as i64, p.y as i64)).collect();
        assert_eq!(unique.len(), footprint.len());
        assert!(footprint.iter().all(|p| p.x.abs() <= 6.0 && p.y.abs() <= 9.0));
    }
}
