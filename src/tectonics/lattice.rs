//! Шестиугольная решётка тектонических плит.
//!
//! Решётка строится одним владельцем ([`LatticeBuilder`]): плиты, общий список
//! вершин и список границ. Готовая [`Lattice`] дальше только читается.

use crate::config::TectonicSettings;
use rand::Rng;
use std::collections::HashMap;
use std::f64::consts::TAU;

/// Наибольшее число границ у шестиугольника; `7 - opposite_borders` остаётся положительным.
pub const HEX_SIDES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Совпадение с допуском по каждой оси
    pub fn near(self, other: Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance && (self.y - other.y).abs() < tolerance
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Единичный вектор того же направления; нулевой вектор остаётся нулевым.
    pub fn unit(self) -> Point {
        let len = self.length();
        if len > 0.0 {
            Point::new(self.x / len, self.y / len)
        } else {
            Point::default()
        }
    }

    /// Псевдоскалярное произведение `self × other`
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Тектоническая плита, одна ячейка решётки
#[derive(Debug, Clone, PartialEq)]
pub struct Plate {
    pub id: usize,
    pub center: Point,
    /// Скорость: случайное направление, модуль в `[0, 1)`
    pub velocity: Point,
    pub ocean: bool,
    /// Индексы вершин в общем списке решётки, по кругу
    pub vertices: [usize; HEX_SIDES],
    /// Число границ с соседями противоположного типа (суша/океан)
    pub opposite_borders: u32,
}

impl Plate {
    /// Направление движения плиты
    pub fn direction(&self) -> Point {
        self.velocity.unit()
    }

    /// Вклад внутренности плиты в поле высот.
    ///
    /// Знак задаётся типом плиты, а нестабильные плиты с множеством границ
    /// суша/океан ослабляются.
    pub fn interior_weight(&self) -> f64 {
        let sign = if self.ocean { -1.0 } else { 1.0 };
        sign * (HEX_SIDES as f64 + 1.0 - f64::from(self.opposite_borders)) / 3.0
    }
}

/// Граница между двумя плитами (или плитой и краем решётки)
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub start: Point,
    pub end: Point,
    pub first: usize,
    pub second: Option<usize>,
}

impl Boundary {
    /// Равенство отрезков с допуском, в любом порядке концов
    pub fn matches(&self, start: Point, end: Point, tolerance: f64) -> bool {
        (self.start.near(start, tolerance) && self.end.near(end, tolerance))
            || (self.start.near(end, tolerance) && self.end.near(start, tolerance))
    }

    pub fn plate_pair(&self) -> Option<(usize, usize)> {
        self.second.map(|second| (self.first, second))
    }

    pub fn length(&self) -> f64 {
        self.end.sub(self.start).length()
    }

    /// Единичный вектор от `start` к `end`
    pub fn direction(&self) -> Point {
        self.end.sub(self.start).unit()
    }

    fn midpoint(start: Point, end: Point) -> Point {
        Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0)
    }
}

/// Готовая решётка плит
#[derive(Debug, Clone)]
pub struct Lattice {
    pub hex_width: f64,
    pub hex_height: f64,
    pub columns: usize,
    pub rows: usize,
    pub plates: Vec<Plate>,
    pub vertices: Vec<Point>,
    pub boundaries: Vec<Boundary>,
}

impl Lattice {
    /// Вершины плиты в мировых координатах
    pub fn plate_outline(&self, plate: &Plate) -> [Point; HEX_SIDES] {
        plate.vertices.map(|v| self.vertices[v])
    }
}

/// Поиск точки с допуском через корзины размером `tolerance`.
///
/// Возвращает наименьший подходящий индекс, как при линейном просмотре списка.
#[derive(Debug)]
struct PointIndex {
    tolerance: f64,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl PointIndex {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            buckets: HashMap::new(),
        }
    }

    fn key(&self, p: Point) -> (i64, i64) {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
        )
    }

    fn candidates(&self, p: Point) -> impl Iterator<Item = usize> + '_ {
        let (kx, ky) = self.key(p);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (kx + dx, ky + dy)))
            .filter_map(move |k| self.buckets.get(&k))
            .flatten()
            .copied()
    }

    fn insert(&mut self, p: Point, idx: usize) {
        let key = self.key(p);
        self.buckets.entry(key).or_default().push(idx);
    }
}

/// Строитель решётки: единственный владелец плит, вершин и границ
#[derive(Debug)]
pub struct LatticeBuilder<'a> {
    settings: &'a TectonicSettings,
    hex_width: f64,
    hex_height: f64,
    columns: usize,
    rows: usize,
    plates: Vec<Plate>,
    vertices: Vec<Point>,
    vertex_index: PointIndex,
}

impl<'a> LatticeBuilder<'a> {
    /// Размер шестиугольника подбирается так, чтобы по ширине карты помещалось
    /// `width / hex_span` ячеек.
    pub fn new(width: usize, height: usize, settings: &'a TectonicSettings) -> Self {
        let columns = (width / settings.hex_span.max(1) as usize).max(1);
        let hex_width = (width / columns) as f64;
        let hex_height = hex_width * 2.0 / 3f64.sqrt();
        let rows = (height as f64 / hex_height + 1.0) as usize;

        Self {
            settings,
            hex_width,
            hex_height,
            columns,
            rows,
            plates: Vec::new(),
            vertices: Vec::new(),
            vertex_index: PointIndex::new(settings.vertex_tolerance),
        }
    }

    pub fn build(mut self, rng: &mut impl Rng) -> Lattice {
        self.place_plates(rng);
        self.jitter_vertices(rng);
        let boundaries = self.link_boundaries();
        count_opposite_borders(&mut self.plates, &boundaries);

        log::debug!(
            "Lattice: {}x{} hexes, {} plates, {} vertices, {} boundaries",
            self.columns + 1,
            self.rows,
            self.plates.len(),
            self.vertices.len(),
            boundaries.len()
        );

        Lattice {
            hex_width: self.hex_width,
            hex_height: self.hex_height,
            columns: self.columns,
            rows: self.rows,
            plates: self.plates,
            vertices: self.vertices,
            boundaries,
        }
    }

    fn on_rim(&self, column: usize, row: usize) -> bool {
        column == 0
            || row == 0
            || (row % 2 == 0 && column + 1 == self.columns)
            || column == self.columns
            || row + 1 == self.rows
    }

    fn place_plates(&mut self, rng: &mut impl Rng) {
        for row in 0..self.rows {
            for column in 0..=self.columns {
                let angle = rng.gen_range(0.0..TAU);
                let speed = rng.gen_range(0.0..1.0);
                let rolled_ocean = !rng.gen_bool(self.settings.land_probability);
                // Внешнее кольцо всегда океан: карта окружена водой
                let ocean = rolled_ocean || self.on_rim(column, row);

                let shift = if row % 2 == 0 { 0.0 } else { self.hex_width / 2.0 };
                let center = Point::new(
                    column as f64 * self.hex_width + shift,
                    row as f64 * self.hex_height,
                );

                let vertices = self
                    .hex_corners(center)
                    .map(|corner| self.intern_vertex(corner));

                self.plates.push(Plate {
                    id: self.plates.len(),
                    center,
                    velocity: Point::new(speed * angle.cos(), speed * angle.sin()),
                    ocean,
                    vertices,
                    opposite_borders: 0,
                });
            }
        }
    }

    fn hex_corners(&self, c: Point) -> [Point; HEX_SIDES] {
        let (hw, hh) = (self.hex_width / 2.0, self.hex_height);
        [
            Point::new(c.x, c.y + hh * 2.0 / 3.0),
            Point::new(c.x + hw, c.y + hh / 3.0),
            Point::new(c.x + hw, c.y - hh / 3.0),
            Point::new(c.x, c.y - hh * 2.0 / 3.0),
            Point::new(c.x - hw, c.y - hh / 3.0),
            Point::new(c.x - hw, c.y + hh / 3.0),
        ]
    }

    /// Возвращает индекс существующей вершины в пределах допуска или добавляет новую
    fn intern_vertex(&mut self, p: Point) -> usize {
        let tolerance = self.settings.vertex_tolerance;
        let existing = self
            .vertex_index
            .candidates(p)
            .filter(|&i| self.vertices[i].near(p, tolerance))
            .min();
        if let Some(idx) = existing {
            return idx;
        }
        let idx = self.vertices.len();
        self.vertices.push(p);
        self.vertex_index.insert(p, idx);
        idx
    }

    /// Один случайный сдвиг каждой различной вершины после построения всей решётки
    fn jitter_vertices(&mut self, rng: &mut impl Rng) {
        let base = self.hex_width.hypot(self.hex_height) / self.settings.jitter_divisor;
        for v in &mut self.vertices {
            let displacement = base * rng.gen_range(0.0..1.0);
            let angle = rng.gen_range(0.0..TAU);
            v.x += angle.cos() * displacement;
            v.y += angle.sin() * displacement;
        }
    }

    fn link_boundaries(&self) -> Vec<Boundary> {
        let tolerance = self.settings.vertex_tolerance;
        let mut boundaries: Vec<Boundary> = Vec::new();
        let mut index = PointIndex::new(tolerance);

        for plate in &self.plates {
            for k in 0..HEX_SIDES {
                let start = self.vertices[plate.vertices[k]];
                let end = self.vertices[plate.vertices[(k + 1) % HEX_SIDES]];
                let mid = Boundary::midpoint(start, end);

                let existing = index
                    .candidates(mid)
                    .filter(|&i| boundaries[i].matches(start, end, tolerance))
                    .min();

                match existing {
                    Some(i) => {
                        let boundary = &mut boundaries[i];
                        if boundary.second.is_none() {
                            boundary.second = Some(plate.id);
                        } else {
                            log::warn!(
                                "Boundary {i} already separates plates {} and {:?}; ignoring plate {}",
                                boundary.first,
                                boundary.second,
                                plate.id
                            );
                        }
                    }
                    None => {
                        index.insert(mid, boundaries.len());
                        boundaries.push(Boundary {
                            start,
                            end,
                            first: plate.id,
                            second: None,
                        });
                    }
                }
            }
        }
        boundaries
    }
}

/// Увеличивает счётчик у обеих плит каждой границы суша/океан
fn count_opposite_borders(plates: &mut [Plate], boundaries: &[Boundary]) {
    for (a, b) in boundaries.iter().filter_map(Boundary::plate_pair) {
        if plates[a].ocean != plates[b].ocean {
            plates[a].opposite_borders += 1;
            plates[b].opposite_borders += 1;
        }
    }
}
