use serde::Serialize;
use tsify::Tsify;

use crate::board::{Board, CELL_COUNT, HEIGHT, REGION_SIZE, WIDTH};
use crate::catalog::Shape;
use crate::placement::can_place;

/// Top-left cell of one of the nine fixed 3x3 blocks.
#[derive(Clone, Copy, Debug, Serialize, Tsify, PartialEq, Eq, PartialOrd, Ord)]
pub struct Region {
    pub x: usize,
    pub y: usize,
}

impl Region {
    pub fn all() -> impl Iterator<Item = Region> {
        (0..HEIGHT / REGION_SIZE).flat_map(|ry| {
            (0..WIDTH / REGION_SIZE).map(move |rx| Region {
                x: rx * REGION_SIZE,
                y: ry * REGION_SIZE,
            })
        })
    }

    pub fn cells(self) -> impl Iterator<Item = (usize, usize)> {
        (self.y..self.y + REGION_SIZE)
            .flat_map(move |y| (self.x..self.x + REGION_SIZE).map(move |x| (x, y)))
    }
}

/// Full rows, columns and regions found on a board, each sorted ascending.
#[derive(Clone, Debug, Default, Serialize, Tsify, PartialEq, Eq)]
pub struct ClearResult {
    pub rows: Vec<usize>,
    pub columns: Vec<usize>,
    pub regions: Vec<Region>,
}

impl ClearResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty() && self.regions.is_empty()
    }

    /// Each full row, column or region counts once, however much they overlap.
    pub fn line_count(&self) -> u32 {
        (self.rows.len() + self.columns.len() + self.regions.len()) as u32
    }

    /// Distinct cells covered by any reported line, row-major.
    pub fn cells(&self) -> Vec<(usize, usize)> {
        let mut mask = [false; CELL_COUNT];
        for &y in &self.rows {
            for x in 0..WIDTH {
                mask[y * WIDTH + x] = true;
            }
        }
        for &x in &self.columns {
            for y in 0..HEIGHT {
                mask[y * WIDTH + x] = true;
            }
        }
        for region in &self.regions {
            for (x, y) in region.cells() {
                mask[y * WIDTH + x] = true;
            }
        }
        mask.iter()
            .enumerate()
            .filter(|(_, hit)| **hit)
            .map(|(i, _)| (i % WIDTH, i / WIDTH))
            .collect()
    }
}

pub fn detect_clears(board: &Board) -> ClearResult {
    let rows = (0..HEIGHT)
        .filter(|&y| (0..WIDTH).all(|x| board.is_occupied(x, y)))
        .collect();
    let columns = (0..WIDTH)
        .filter(|&x| (0..HEIGHT).all(|y| board.is_occupied(x, y)))
        .collect();
    let regions = Region::all()
        .filter(|r| r.cells().all(|(x, y)| board.is_occupied(x, y)))
        .collect();
    ClearResult {
        rows,
        columns,
        regions,
    }
}

pub fn apply_clears(board: &mut Board, result: &ClearResult) {
    if result.is_empty() {
        return;
    }
    board.clear_cells(result.cells());
}

/// What committing `shape` at the anchor would clear, computed on a copy.
/// An anchor where the shape does not fit previews as nothing.
pub fn preview_clear(board: &Board, shape: &Shape, x: i32, y: i32) -> ClearResult {
    if !can_place(board, shape, x, y) {
        return ClearResult::default();
    }
    let mut simulated = *board;
    if simulated.place(shape, 1, x, y).is_err() {
        return ClearResult::default();
    }
    detect_clears(&simulated)
}
