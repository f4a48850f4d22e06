use castle_siege_core::{CellCoord, Direction, FieldKind};
use castle_siege_world::{Field, Grid, MapLayout};
use proptest::prelude::*;

fn layout_rows(columns: usize, walls: &[bool]) -> Vec<String> {
    walls
        .chunks(columns)
        .map(|row| row.iter().map(|&wall| if wall { '#' } else { '.' }).collect())
        .collect()
}

fn grid_from(columns: usize, walls: &[bool]) -> Grid {
    let rows = layout_rows(columns, walls);
    let borrowed: Vec<&str> = rows.iter().map(String::as_str).collect();
    Grid::from_layout(&MapLayout::from_ascii(&borrowed, 16, 16))
}

/// Shortest 4-connected distances by repeated relaxation until a fixed point.
fn relaxed_distances(grid: &Grid, targets: &[CellCoord]) -> Vec<Option<u32>> {
    let cells: Vec<CellCoord> = grid.coords().collect();
    let open = |cell: CellCoord| grid.classify(cell).is_some_and(|kind| !kind.is_wall());
    let mut distances: Vec<Option<u32>> = cells
        .iter()
        .map(|cell| (open(*cell) && targets.contains(cell)).then_some(0))
        .collect();

    loop {
        let mut changed = false;
        for (index, cell) in cells.iter().enumerate() {
            if !open(*cell) {
                continue;
            }
            for (columns, rows) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                let Some(neighbor) = cell.offset(columns, rows) else {
                    continue;
                };
                let Some(neighbor_index) = grid.index(neighbor) else {
                    continue;
                };
                let Some(distance) = distances[neighbor_index] else {
                    continue;
                };
                let candidate = distance + 1;
                if distances[index].map_or(true, |current| candidate < current) {
                    distances[index] = Some(candidate);
                    changed = true;
                }
            }
        }
        if !changed {
            return distances;
        }
    }
}

fn step(cell: CellCoord, direction: Direction) -> Option<CellCoord> {
    (-1..=1)
        .flat_map(|rows| (-1..=1).map(move |columns| (columns, rows)))
        .filter_map(|(columns, rows)| cell.offset(columns, rows))
        .find(|neighbor| Direction::between(cell, *neighbor) == Some(direction))
}

fn random_map() -> impl Strategy<Value = (usize, Vec<bool>, Vec<(u32, u32)>)> {
    (2usize..9, 2usize..9).prop_flat_map(|(columns, rows)| {
        (
            Just(columns),
            prop::collection::vec(prop::bool::weighted(0.3), columns * rows),
            prop::collection::vec((0..columns as u32, 0..rows as u32), 1..4),
        )
    })
}

proptest! {
    #[test]
    fn forces_match_shortest_paths((columns, walls, seeds) in random_map()) {
        let grid = grid_from(columns, &walls);
        let targets: Vec<CellCoord> = seeds
            .iter()
            .map(|&(column, row)| CellCoord::new(column, row))
            .collect();

        let mut field = Field::new(FieldKind::FlowToPlayer, &grid);
        prop_assert!(field.regenerate(&grid, &targets).is_ok());

        let expected = relaxed_distances(&grid, &targets);
        let actual: Vec<Option<u32>> = grid.coords().map(|cell| field.force(cell)).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn directions_descend_toward_targets((columns, walls, seeds) in random_map()) {
        let grid = grid_from(columns, &walls);
        let targets: Vec<CellCoord> = seeds
            .iter()
            .map(|&(column, row)| CellCoord::new(column, row))
            .collect();

        let mut field = Field::new(FieldKind::FlowToPlayer, &grid);
        prop_assert!(field.regenerate(&grid, &targets).is_ok());

        for cell in grid.coords() {
            match (field.force(cell), field.direction(cell)) {
                (None, direction) => prop_assert_eq!(direction, None),
                (Some(0), direction) => prop_assert_eq!(direction, Some(Direction::Stationary)),
                (Some(force), Some(direction)) => {
                    let neighbor = step(cell, direction).expect("direction stays on the grid");
                    let neighbor_force = field.force(neighbor).expect("direction targets a forced cell");
                    prop_assert!(neighbor_force < force);
                }
                (Some(_), None) => prop_assert!(false, "forced cell {cell:?} has no direction"),
            }
        }
    }

    #[test]
    fn regeneration_is_repeatable((columns, walls, seeds) in random_map()) {
        let grid = grid_from(columns, &walls);
        let targets: Vec<CellCoord> = seeds
            .iter()
            .map(|&(column, row)| CellCoord::new(column, row))
            .collect();

        let mut field = Field::new(FieldKind::FlowToCastle, &grid);
        prop_assert!(field.regenerate(&grid, &targets).is_ok());
        let first = field.cells().to_vec();
        prop_assert!(field.regenerate(&grid, &targets).is_ok());
        prop_assert_eq!(field.cells(), first.as_slice());
    }
}

#[test]
fn scenario_routes_around_central_wall() {
    let mut walls = vec![false; 25];
    walls[2 * 5 + 2] = true;
    let grid = grid_from(5, &walls);
    let mut field = Field::new(FieldKind::FlowToPlayer, &grid);

    field
        .regenerate(&grid, &[CellCoord::new(0, 0)])
        .expect("connected grid");

    assert_eq!(field.force(CellCoord::new(4, 4)), Some(8));
    assert_eq!(field.force(CellCoord::new(2, 2)), None);
}

#[test]
fn fortress_fields_cover_the_open_map() {
    let grid = Grid::from_layout(&MapLayout::fortress());
    let mut castle = Field::new(FieldKind::FlowToCastle, &grid);
    castle
        .regenerate(&grid, grid.castle_cells())
        .expect("fortress is connected");

    let eligible = grid
        .coords()
        .filter(|cell| {
            grid.classify(*cell)
                .is_some_and(|kind| FieldKind::FlowToCastle.admits(kind))
        })
        .count();
    assert_eq!(castle.forced_count(), eligible);
    assert_eq!(castle.force(CellCoord::new(0, 9)), Some(0));
}
