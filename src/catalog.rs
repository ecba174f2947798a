use serde::Serialize;
use tsify::Tsify;

/// Rectangular 0/1 matrix describing which cells a piece occupies.
///
/// Row-major, `rows[py][px]`. Shapes in the catalog never have an empty row
/// or column on their boundary, so the top-left matrix cell is the anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    rows: &'static [&'static [u8]],
}

impl Shape {
    pub const fn new(rows: &'static [&'static [u8]]) -> Self {
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &'static [&'static [u8]] {
        self.rows
    }

    /// Offsets `(px, py)` of every occupied cell, in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(py, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, c)| **c != 0)
                .map(move |(px, _)| (px as i32, py as i32))
        })
    }

    /// True when the matrix is non-empty and no boundary row or column is blank.
    pub fn is_trimmed(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        if w == 0 || h == 0 {
            return false;
        }
        let filled = |px: usize, py: usize| self.rows[py].get(px).is_some_and(|c| *c != 0);
        let row_used = |py: usize| (0..w).any(|px| filled(px, py));
        let col_used = |px: usize| (0..h).any(|py| filled(px, py));
        row_used(0) && row_used(h - 1) && col_used(0) && col_used(w - 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PieceDef {
    pub name: &'static str,
    pub shape: Shape,
    /// Non-zero color tag written into every board cell the piece fills.
    pub color: u8,
}

pub const CATALOG: &[PieceDef] = &[
    PieceDef {
        name: "dot",
        shape: Shape::new(&[&[1]]),
        color: 1,
    },
    PieceDef {
        name: "domino-h",
        shape: Shape::new(&[&[1, 1]]),
        color: 2,
    },
    PieceDef {
        name: "domino-v",
        shape: Shape::new(&[&[1], &[1]]),
        color: 2,
    },
    PieceDef {
        name: "tri-h",
        shape: Shape::new(&[&[1, 1, 1]]),
        color: 3,
    },
    PieceDef {
        name: "tri-v",
        shape: Shape::new(&[&[1], &[1], &[1]]),
        color: 3,
    },
    PieceDef {
        name: "corner",
        shape: Shape::new(&[&[1, 0], &[1, 1]]),
        color: 4,
    },
    PieceDef {
        name: "square",
        shape: Shape::new(&[&[1, 1], &[1, 1]]),
        color: 5,
    },
    PieceDef {
        name: "line4-h",
        shape: Shape::new(&[&[1, 1, 1, 1]]),
        color: 6,
    },
    PieceDef {
        name: "line4-v",
        shape: Shape::new(&[&[1], &[1], &[1], &[1]]),
        color: 6,
    },
    PieceDef {
        name: "ell",
        shape: Shape::new(&[&[1, 0, 0], &[1, 1, 1]]),
        color: 7,
    },
    PieceDef {
        name: "tee",
        shape: Shape::new(&[&[1, 1, 1], &[0, 1, 0]]),
        color: 8,
    },
    PieceDef {
        name: "big-square",
        shape: Shape::new(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]),
        color: 9,
    },
];

/// Hex colors indexed by color tag; index 0 is the empty cell.
static PALETTE: [&str; 10] = [
    "#00000000", "#f6c177", "#eb6f92", "#9ccfd8", "#c4a7e7", "#f4a261", "#31748f", "#e9c46a",
    "#8ab17d", "#d3869b",
];

pub fn palette() -> &'static [&'static str] {
    &PALETTE
}

pub fn piece_by_name(name: &str) -> Option<&'static PieceDef> {
    let trimmed = name.trim();
    CATALOG
        .iter()
        .find(|def| def.name.eq_ignore_ascii_case(trimmed))
}

/// Shape as an owned matrix for the renderer.
#[derive(Clone, Debug, Serialize, Tsify, PartialEq, Eq)]
pub struct ShapeView {
    pub width: usize,
    pub height: usize,
    pub rows: Vec<Vec<u8>>,
}

impl From<&Shape> for ShapeView {
    fn from(shape: &Shape) -> Self {
        let width = shape.width();
        Self {
            width,
            height: shape.height(),
            rows: shape
                .rows()
                .iter()
                .map(|row| {
                    let mut owned = row.to_vec();
                    owned.resize(width, 0);
                    owned
                })
                .collect(),
        }
    }
}
