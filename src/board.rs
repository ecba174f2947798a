use serde::Serialize;
use thiserror::Error;
use tsify::Tsify;

use crate::catalog::Shape;

pub const WIDTH: usize = 9;
pub const HEIGHT: usize = 9;
pub const CELL_COUNT: usize = WIDTH * HEIGHT;
pub const REGION_SIZE: usize = 3;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("shape does not fit at ({x}, {y})")]
pub struct PlacementRejected {
    pub x: i32,
    pub y: i32,
}

/// 9x9 grid stored flat at `y * WIDTH + x`.
///
/// A cell holds 0 when empty and the color tag of the piece that filled it
/// otherwise, so occupancy and color can never disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [u8; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [0; CELL_COUNT],
        }
    }

    pub fn in_bounds(x: i32, y: i32) -> bool {
        x >= 0 && x < WIDTH as i32 && y >= 0 && y < HEIGHT as i32
    }

    fn index(x: usize, y: usize) -> usize {
        y * WIDTH + x
    }

    /// Out-of-bounds coordinates are never empty.
    pub fn is_empty(&self, x: i32, y: i32) -> bool {
        Self::in_bounds(x, y) && self.cells[Self::index(x as usize, y as usize)] == 0
    }

    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && self.cells[Self::index(x, y)] != 0
    }

    pub fn color(&self, x: usize, y: usize) -> Option<u8> {
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        match self.cells[Self::index(x, y)] {
            0 => None,
            c => Some(c),
        }
    }

    /// The grid in row-major order, one byte per cell.
    pub fn cells(&self) -> &[u8; CELL_COUNT] {
        &self.cells
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    pub fn is_clear(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Writes `color` into every cell the shape covers at the anchor.
    ///
    /// Re-checks the fit first and leaves the board untouched when any cell
    /// would land out of bounds or on an occupied cell.
    pub fn place(&mut self, shape: &Shape, color: u8, x: i32, y: i32) -> Result<(), PlacementRejected> {
        if !shape.cells().all(|(px, py)| self.is_empty(x + px, y + py)) {
            return Err(PlacementRejected { x, y });
        }
        let tag = color.max(1);
        for (px, py) in shape.cells() {
            let (bx, by) = ((x + px) as usize, (y + py) as usize);
            self.cells[Self::index(bx, by)] = tag;
        }
        Ok(())
    }

    /// Empties the given cells; coordinates outside the grid are ignored.
    pub fn clear_cells<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        for (x, y) in cells {
            if x < WIDTH && y < HEIGHT {
                self.cells[Self::index(x, y)] = 0;
            }
        }
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            width: WIDTH,
            height: HEIGHT,
            cells: self.cells().to_vec(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: [&str; HEIGHT]) -> Self {
        let mut board = Self::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().take(WIDTH).enumerate() {
                if let Some(d) = ch.to_digit(10) {
                    board.cells[Self::index(x, y)] = d as u8;
                }
            }
        }
        board
    }
}

#[derive(Clone, Debug, Serialize, Tsify, PartialEq, Eq)]
pub struct BoardView {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: Shape = Shape::new(&[&[1, 1], &[1, 1]]);

    #[test]
    fn bounds_cover_exactly_nine_by_nine() {
        assert!(Board::in_bounds(0, 0));
        assert!(Board::in_bounds(8, 8));
        assert!(!Board::in_bounds(-1, 0));
        assert!(!Board::in_bounds(0, 9));
        assert!(!Board::in_bounds(9, 3));
    }

    #[test]
    fn place_writes_color_into_covered_cells() {
        let mut board = Board::new();
        board.place(&SQUARE, 5, 3, 4).unwrap();
        assert_eq!(board.filled_count(), 4);
        for (x, y) in [(3, 4), (4, 4), (3, 5), (4, 5)] {
            assert_eq!(board.color(x, y), Some(5));
            assert!(!board.is_empty(x as i32, y as i32));
        }
        assert_eq!(board.color(5, 5), None);
    }

    #[test]
    fn rejected_place_leaves_board_untouched() {
        let mut board = Board::new();
        board.place(&SQUARE, 5, 0, 0).unwrap();
        let before = board;
        assert_eq!(
            board.place(&SQUARE, 2, 1, 1),
            Err(PlacementRejected { x: 1, y: 1 })
        );
        assert_eq!(board.place(&SQUARE, 2, 8, 0), Err(PlacementRejected { x: 8, y: 0 }));
        assert_eq!(board.place(&SQUARE, 2, -1, 3), Err(PlacementRejected { x: -1, y: 3 }));
        assert_eq!(board, before);
    }

    #[test]
    fn clear_cells_empties_only_listed_cells() {
        let mut board = Board::from_rows([
            "111111111",
            "2........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
        ]);
        board.clear_cells((0..WIDTH).map(|x| (x, 0)).chain([(20, 20)]));
        assert_eq!(board.filled_count(), 1);
        assert_eq!(board.color(0, 1), Some(2));
    }

    #[test]
    fn view_is_the_row_major_grid() {
        let mut board = Board::new();
        board.place(&SQUARE, 7, 7, 7).unwrap();
        let view = board.view();
        assert_eq!((view.width, view.height), (WIDTH, HEIGHT));
        assert_eq!(view.cells.as_slice(), board.cells().as_slice());
        assert_eq!(view.cells[7 * WIDTH + 8], 7);
        assert_eq!(view.cells[8 * WIDTH + 7], 7);
        assert_eq!(view.cells.iter().filter(|&&c| c != 0).count(), 4);
    }
}
