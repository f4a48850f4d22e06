//! Plain-text rendering of a flow field, one character per cell.

use castle_siege_core::{CellCoord, CellKind, Direction};
use castle_siege_world::{Field, Grid};

/// Renders the field's directions row by row.
///
/// Cells without a direction fall back to their map classification so that
/// walls read as `#`, castle cells as `C` and unreachable ground as `?`.
pub(crate) fn render(grid: &Grid, field: &Field) -> String {
    let mut out = String::with_capacity(grid.len() + grid.rows() as usize);
    for row in 0..grid.rows() {
        if row > 0 {
            out.push('\n');
        }
        for column in 0..grid.columns() {
            let cell = CellCoord::new(column, row);
            let glyph = match field.direction(cell) {
                Some(direction) => arrow(direction),
                None => match grid.classify(cell) {
                    Some(CellKind::Wall) => '#',
                    Some(CellKind::CastleWall) => 'C',
                    Some(CellKind::Open) | None => '?',
                },
            };
            out.push(glyph);
        }
    }
    out
}

fn arrow(direction: Direction) -> char {
    match direction {
        Direction::North => '^',
        Direction::South => 'v',
        Direction::East => '>',
        Direction::West => '<',
        Direction::NorthEast | Direction::SouthWest => '/',
        Direction::NorthWest | Direction::SouthEast => '\\',
        Direction::Stationary => '*',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_siege_core::FieldKind;
    use castle_siege_world::MapLayout;

    #[test]
    fn renders_player_field_around_a_wall() {
        let grid = Grid::from_layout(&MapLayout::from_ascii(&["...", ".#.", "..."], 32, 32));
        let mut field = Field::new(FieldKind::FlowToPlayer, &grid);
        field
            .regenerate(&grid, &[CellCoord::new(0, 0)])
            .expect("connected map");

        assert_eq!(render(&grid, &field), "*<<\n^#\\\n^\\^");
    }

    #[test]
    fn unreached_cells_show_their_kind() {
        let grid = Grid::from_layout(&MapLayout::from_ascii(&["C.#"], 32, 32));
        let field = Field::new(FieldKind::Raw, &grid);
        assert_eq!(render(&grid, &field), "C?#");
    }
}
