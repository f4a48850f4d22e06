//! Flow fields and the breadth-first propagation engine that fills them.

use std::collections::VecDeque;

use castle_siege_core::{CellCoord, Direction, FieldKind};
use glam::Vec2;
use thiserror::Error;
use tracing::{debug, error};

use crate::grid::Grid;

const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (1, -1), (1, 1), (-1, 1)];

/// Failures raised while deriving flow directions.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// A forced cell had no forced neighbour to flow toward.
    #[error(
        "cell ({}, {}) in {kind:?} has force but no eligible neighbour",
        cell.column(),
        cell.row()
    )]
    IsolatedCell {
        /// Cell whose direction could not be resolved.
        cell: CellCoord,
        /// Field being regenerated.
        kind: FieldKind,
    },
}

/// Force and direction stored for a single cell of a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldCell {
    /// Breadth-first distance to the nearest target, if the cell was reached.
    pub force: Option<u32>,
    /// Direction toward the lowest-force neighbour, if the cell was reached.
    pub direction: Option<Direction>,
}

/// Grid-shaped layer of forces and directions toward one target set.
#[derive(Clone, Debug)]
pub struct Field {
    kind: FieldKind,
    columns: u32,
    rows: u32,
    cells: Vec<FieldCell>,
    targets: Vec<CellCoord>,
}

impl Field {
    /// Creates an empty field shaped like the provided grid.
    #[must_use]
    pub fn new(kind: FieldKind, grid: &Grid) -> Self {
        Self {
            kind,
            columns: grid.columns(),
            rows: grid.rows(),
            cells: vec![FieldCell::default(); grid.len()],
            targets: Vec::new(),
        }
    }

    /// Kind of the field.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Targets that seeded the most recent regeneration.
    #[must_use]
    pub fn targets(&self) -> &[CellCoord] {
        &self.targets
    }

    /// Force and direction stored for the provided cell.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<FieldCell> {
        self.index(cell).map(|index| self.cells[index])
    }

    /// Breadth-first distance stored for the provided cell.
    #[must_use]
    pub fn force(&self, cell: CellCoord) -> Option<u32> {
        self.cell(cell).and_then(|entry| entry.force)
    }

    /// Direction stored for the provided cell.
    #[must_use]
    pub fn direction(&self, cell: CellCoord) -> Option<Direction> {
        self.cell(cell).and_then(|entry| entry.direction)
    }

    /// Velocity multiplier for the provided cell; `None` means "do not move".
    #[must_use]
    pub fn velocity(&self, cell: CellCoord) -> Option<Vec2> {
        self.direction(cell).map(Direction::velocity)
    }

    /// Dense row-major cell storage.
    #[must_use]
    pub fn cells(&self) -> &[FieldCell] {
        &self.cells
    }

    /// Number of cells that received a force.
    #[must_use]
    pub fn forced_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.force.is_some()).count()
    }

    /// Recomputes every force and direction from scratch.
    ///
    /// Targets outside the grid or ineligible for this field are ignored.
    /// Cells unreachable from every seeded target keep no force and no
    /// direction. The raw field is only reset.
    pub fn regenerate(&mut self, grid: &Grid, targets: &[CellCoord]) -> Result<(), TopologyError> {
        self.reset(grid);
        if self.kind == FieldKind::Raw {
            return Ok(());
        }

        let mut queue = VecDeque::with_capacity(targets.len());
        for &target in targets {
            if !self.eligible(grid, target) {
                continue;
            }
            let Some(index) = self.index(target) else {
                continue;
            };
            if self.cells[index].force.is_some() {
                continue;
            }
            self.cells[index].force = Some(0);
            self.targets.push(target);
            queue.push_back(target);
        }

        self.propagate(grid, queue);
        let result = self.derive_directions(grid);

        debug!(
            kind = ?self.kind,
            targets = self.targets.len(),
            forced = self.forced_count(),
            "regenerated flow field"
        );
        result
    }

    fn reset(&mut self, grid: &Grid) {
        self.columns = grid.columns();
        self.rows = grid.rows();
        self.cells.clear();
        self.cells.resize(grid.len(), FieldCell::default());
        self.targets.clear();
    }

    fn propagate(&mut self, grid: &Grid, mut queue: VecDeque<CellCoord>) {
        while let Some(cell) = queue.pop_front() {
            let Some(force) = self.force(cell) else {
                continue;
            };
            let next_force = force.saturating_add(1);

            for (columns, rows) in ORTHOGONAL {
                let Some(neighbor) = cell.offset(columns, rows) else {
                    continue;
                };
                if !self.eligible(grid, neighbor) {
                    continue;
                }
                let Some(index) = self.index(neighbor) else {
                    continue;
                };
                if self.cells[index].force.is_some() {
                    continue;
                }

                self.cells[index].force = Some(next_force);
                queue.push_back(neighbor);
            }
        }
    }

    fn derive_directions(&mut self, grid: &Grid) -> Result<(), TopologyError> {
        for cell in grid.coords() {
            let Some(index) = self.index(cell) else {
                continue;
            };
            let direction = match self.cells[index].force {
                None => continue,
                Some(0) => Direction::Stationary,
                Some(_) => self.resolve_direction(grid, cell)?,
            };
            self.cells[index].direction = Some(direction);
        }
        Ok(())
    }

    /// Picks the lowest-force neighbour; diagonals win only on strictly lower force.
    fn resolve_direction(&self, grid: &Grid, cell: CellCoord) -> Result<Direction, TopologyError> {
        let orthogonal = self.lowest_neighbor(grid, cell, &ORTHOGONAL);
        let diagonal = self.lowest_neighbor(grid, cell, &DIAGONAL);

        let chosen = match (orthogonal, diagonal) {
            (Some(straight), Some(corner)) if corner.0 < straight.0 => Some(corner),
            (Some(straight), _) => Some(straight),
            (None, corner) => corner,
        };

        let isolated = TopologyError::IsolatedCell {
            cell,
            kind: self.kind,
        };
        let Some((_, neighbor)) = chosen else {
            error!(%isolated, "flow direction resolution failed");
            return Err(isolated);
        };
        Direction::between(cell, neighbor).ok_or(isolated)
    }

    fn lowest_neighbor(
        &self,
        grid: &Grid,
        cell: CellCoord,
        offsets: &[(i32, i32)],
    ) -> Option<(u32, CellCoord)> {
        let mut best: Option<(u32, CellCoord)> = None;
        for &(columns, rows) in offsets {
            let Some(neighbor) = cell.offset(columns, rows) else {
                continue;
            };
            if !self.eligible(grid, neighbor) {
                continue;
            }
            let Some(force) = self.force(neighbor) else {
                continue;
            };
            if best.map_or(true, |(lowest, _)| force < lowest) {
                best = Some((force, neighbor));
            }
        }
        best
    }

    fn eligible(&self, grid: &Grid, cell: CellCoord) -> bool {
        grid.classify(cell)
            .is_some_and(|kind| self.kind.admits(kind))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// The fields owned by the map, one per [`FieldKind`].
#[derive(Clone, Debug)]
pub struct FieldSet {
    raw: Field,
    player: Field,
    castle: Field,
}

impl FieldSet {
    /// Creates empty fields shaped like the provided grid.
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self {
            raw: Field::new(FieldKind::Raw, grid),
            player: Field::new(FieldKind::FlowToPlayer, grid),
            castle: Field::new(FieldKind::FlowToCastle, grid),
        }
    }

    /// Field of the provided kind.
    #[must_use]
    pub fn get(&self, kind: FieldKind) -> &Field {
        match kind {
            FieldKind::Raw => &self.raw,
            FieldKind::FlowToPlayer => &self.player,
            FieldKind::FlowToCastle => &self.castle,
        }
    }

    /// Regenerates the flow fields from the current targets.
    pub fn regenerate(
        &mut self,
        grid: &Grid,
        player_cell: Option<CellCoord>,
    ) -> Result<(), TopologyError> {
        self.raw.regenerate(grid, &[])?;
        let player_targets: Vec<CellCoord> = player_cell.into_iter().collect();
        self.player.regenerate(grid, &player_targets)?;
        self.castle.regenerate(grid, grid.castle_cells())
    }
}
