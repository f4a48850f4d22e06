//! Uniform cell partition of the map and the static layout tables it is built from.

use castle_siege_core::{Bounds, CellCoord, CellKind};
use glam::Vec2;

/// Static description of a map's topology.
///
/// Walls and castle cells are listed per row, mirroring how maps are authored.
/// A column listed as both wall and castle is classified as castle.
#[derive(Clone, Debug, PartialEq)]
pub struct MapLayout {
    width: u32,
    height: u32,
    cell_width: u32,
    cell_height: u32,
    walls: Vec<(u32, Vec<u32>)>,
    castle: Vec<(u32, Vec<u32>)>,
}

impl MapLayout {
    /// Creates an open layout covering `width` × `height` pixels.
    ///
    /// Zero cell dimensions are clamped to one pixel.
    #[must_use]
    pub fn new(width: u32, height: u32, cell_width: u32, cell_height: u32) -> Self {
        Self {
            width,
            height,
            cell_width: cell_width.max(1),
            cell_height: cell_height.max(1),
            walls: Vec::new(),
            castle: Vec::new(),
        }
    }

    /// Adds wall columns to the provided row.
    #[must_use]
    pub fn with_walls(mut self, row: u32, columns: &[u32]) -> Self {
        self.walls.push((row, columns.to_vec()));
        self
    }

    /// Adds castle columns to the provided row.
    #[must_use]
    pub fn with_castle(mut self, row: u32, columns: &[u32]) -> Self {
        self.castle.push((row, columns.to_vec()));
        self
    }

    /// Parses a layout from text rows: `.` open, `#` wall, `C` castle.
    ///
    /// Unknown characters are treated as open ground. The width of the widest
    /// row determines the column count.
    #[must_use]
    pub fn from_ascii(rows: &[&str], cell_width: u32, cell_height: u32) -> Self {
        let columns = rows
            .iter()
            .map(|row| row.chars().count())
            .max()
            .unwrap_or(0);
        let columns = u32::try_from(columns).unwrap_or(u32::MAX);
        let row_count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let mut layout = Self::new(
            columns.saturating_mul(cell_width.max(1)),
            row_count.saturating_mul(cell_height.max(1)),
            cell_width,
            cell_height,
        );

        for (row_index, row) in (0u32..).zip(rows.iter()) {
            let mut walls = Vec::new();
            let mut castle = Vec::new();
            for (column, symbol) in (0u32..).zip(row.chars()) {
                match symbol {
                    '#' => walls.push(column),
                    'C' => castle.push(column),
                    _ => {}
                }
            }
            if !walls.is_empty() {
                layout = layout.with_walls(row_index, &walls);
            }
            if !castle.is_empty() {
                layout = layout.with_castle(row_index, &castle);
            }
        }

        layout
    }

    /// The shipped fortress map: two long walls, a gap to squeeze through,
    /// and a castle tucked against the western edge.
    #[must_use]
    pub fn fortress() -> Self {
        let mut layout = Self::new(2000, 2000, 32, 32);
        let walls: [(u32, &[u32]); 19] = [
            (0, &[17]),
            (1, &[17]),
            (2, &[10, 17]),
            (3, &[10, 17]),
            (4, &[10, 17]),
            (5, &[10, 17]),
            (6, &[10, 17]),
            (7, &[10, 17]),
            (8, &[10]),
            (9, &[10]),
            (10, &[10]),
            (11, &[10, 17]),
            (12, &[10, 17]),
            (13, &[10, 17]),
            (14, &[10, 17]),
            (15, &[10, 13, 14, 15, 16, 17]),
            (16, &[10, 17]),
            (17, &[10, 17]),
            (18, &[10, 17]),
        ];
        for (row, columns) in walls {
            layout = layout.with_walls(row, columns);
        }
        for row in 7..=11 {
            layout = layout.with_castle(row, &[0, 1, 2, 3]);
        }
        layout
    }

    /// Number of cell columns covering the map width.
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.cell_width)
    }

    /// Number of cell rows covering the map height.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.cell_height)
    }

    /// Map width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Classifies a cell according to the layout tables.
    #[must_use]
    pub fn classify(&self, cell: CellCoord) -> CellKind {
        let listed = |table: &[(u32, Vec<u32>)]| {
            table
                .iter()
                .any(|(row, columns)| *row == cell.row() && columns.contains(&cell.column()))
        };

        if listed(&self.castle) {
            CellKind::CastleWall
        } else if listed(&self.walls) {
            CellKind::Wall
        } else {
            CellKind::Open
        }
    }
}

/// A single cell of the grid as seen by callers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridCell {
    /// Coordinate of the cell.
    pub coord: CellCoord,
    /// Static classification of the cell.
    pub kind: CellKind,
    /// Hitbox of the cell in world coordinates.
    pub bounds: Bounds,
}

/// Immutable partition of map space into fixed-size cells.
///
/// Only the world-space origin changes after construction, when the map
/// scrolls; row and column identity never does.
#[derive(Clone, Debug)]
pub struct Grid {
    columns: u32,
    rows: u32,
    map_size: Vec2,
    cell_size: Vec2,
    origin: Vec2,
    kinds: Vec<CellKind>,
    walls: Vec<CellCoord>,
    wall_bounds: Vec<Bounds>,
    castle: Vec<CellCoord>,
}

impl Grid {
    /// Builds the grid described by the layout with its origin at `(0, 0)`.
    #[must_use]
    pub fn from_layout(layout: &MapLayout) -> Self {
        let columns = layout.columns();
        let rows = layout.rows();
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);

        let mut kinds = Vec::with_capacity(capacity);
        let mut walls = Vec::new();
        let mut castle = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                let cell = CellCoord::new(column, row);
                let kind = layout.classify(cell);
                if kind.is_wall() {
                    walls.push(cell);
                }
                if kind.is_castle() {
                    castle.push(cell);
                }
                kinds.push(kind);
            }
        }

        let mut grid = Self {
            columns,
            rows,
            map_size: Vec2::new(layout.width() as f32, layout.height() as f32),
            cell_size: Vec2::new(layout.cell_width as f32, layout.cell_height as f32),
            origin: Vec2::ZERO,
            kinds,
            walls,
            wall_bounds: Vec::new(),
            castle,
        };
        grid.refresh_wall_bounds();
        grid
    }

    /// Number of cell columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cell rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Width and height of a single cell.
    #[must_use]
    pub const fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// World position of the map's upper-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Map rectangle in world coordinates.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.origin, self.map_size)
    }

    /// Classifies the provided cell, or `None` when it lies outside the grid.
    #[must_use]
    pub fn classify(&self, cell: CellCoord) -> Option<CellKind> {
        self.index(cell).map(|index| self.kinds[index])
    }

    /// Bounds-checked cell lookup.
    #[must_use]
    pub fn cell_at(&self, cell: CellCoord) -> Option<GridCell> {
        let kind = self.classify(cell)?;
        Some(GridCell {
            coord: cell,
            kind,
            bounds: self.cell_bounds_unchecked(cell),
        })
    }

    /// Hitbox of the provided cell in world coordinates.
    #[must_use]
    pub fn cell_bounds(&self, cell: CellCoord) -> Option<Bounds> {
        self.index(cell).map(|_| self.cell_bounds_unchecked(cell))
    }

    /// Cell containing the provided world point, found by integer division.
    #[must_use]
    pub fn cell_containing(&self, point: Vec2) -> Option<CellCoord> {
        let local = (point - self.origin) / self.cell_size;
        if !local.x.is_finite() || !local.y.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }

        let column = local.x.floor() as u32;
        let row = local.y.floor() as u32;
        let cell = CellCoord::new(column, row);
        self.index(cell).map(|_| cell)
    }

    /// Every wall cell, castle cells included, in row-major order.
    #[must_use]
    pub fn wall_cells(&self) -> &[CellCoord] {
        &self.walls
    }

    /// Hitboxes of [`Grid::wall_cells`], index-aligned with it.
    #[must_use]
    pub fn wall_bounds(&self) -> &[Bounds] {
        &self.wall_bounds
    }

    /// Cells forming the castle footprint in row-major order.
    #[must_use]
    pub fn castle_cells(&self) -> &[CellCoord] {
        &self.castle
    }

    /// Bounding box of the castle footprint, if the map has one.
    #[must_use]
    pub fn castle_bounds(&self) -> Option<Bounds> {
        self.castle
            .iter()
            .map(|cell| self.cell_bounds_unchecked(*cell))
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    /// Iterates every coordinate in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> {
        let columns = self.columns;
        (0..self.rows)
            .flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
    }

    /// Dense row-major index of the provided cell.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    /// Number of cells in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Reports whether the grid has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub(crate) fn scroll(&mut self, delta: Vec2) {
        self.origin += delta;
        self.refresh_wall_bounds();
    }

    fn refresh_wall_bounds(&mut self) {
        let bounds: Vec<Bounds> = self
            .walls
            .iter()
            .map(|cell| self.cell_bounds_unchecked(*cell))
            .collect();
        self.wall_bounds = bounds;
    }

    fn cell_bounds_unchecked(&self, cell: CellCoord) -> Bounds {
        let offset = Vec2::new(cell.column() as f32, cell.row() as f32) * self.cell_size;
        Bounds::new(self.origin + offset, self.cell_size)
    }
}
