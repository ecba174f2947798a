use crate::board::{Board, HEIGHT, WIDTH};
use crate::catalog::Shape;

/// True when every occupied cell of `shape`, offset by the anchor, lands on an
/// in-bounds empty board cell. Safe for any anchor, including negative ones.
pub fn can_place(board: &Board, shape: &Shape, x: i32, y: i32) -> bool {
    shape.cells().all(|(px, py)| board.is_empty(x + px, y + py))
}

/// Every anchor on the grid where the shape fits, scanned row by row.
pub fn placements<'a>(board: &'a Board, shape: &'a Shape) -> impl Iterator<Item = (i32, i32)> + 'a {
    (0..HEIGHT as i32)
        .flat_map(|y| (0..WIDTH as i32).map(move |x| (x, y)))
        .filter(move |&(x, y)| can_place(board, shape, x, y))
}

pub fn fits_anywhere(board: &Board, shape: &Shape) -> bool {
    placements(board, shape).next().is_some()
}

/// True when none of the shapes fits at any of the 81 anchors.
///
/// An empty slice is never stuck: a drained set is refilled before the check.
pub fn is_stuck<'a, I>(board: &Board, shapes: I) -> bool
where
    I: IntoIterator<Item = &'a Shape>,
{
    let mut any = false;
    for shape in shapes {
        any = true;
        if fits_anywhere(board, shape) {
            return false;
        }
    }
    any
}
