//! Mapping between board squares and on-screen cells.
//!
//! Rendering and input handling both go through this module so that a click
//! always lands on the square that is drawn under it.

use crate::types::{Color, File, Rank, Square};

/// Which way up the board is drawn.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Orientation {
    /// Rank 1 at the bottom, file a on the left.
    WhiteBottom,
    /// Rank 1 at the top, file a on the right.
    BlackBottom,
}

impl Orientation {
    /// The human's own pieces are drawn at the bottom.
    pub const fn for_player(color: Color) -> Self {
        match color {
            Color::White => Orientation::WhiteBottom,
            Color::Black => Orientation::BlackBottom,
        }
    }

    /// Returns the `(column, row)` cell of `square`, row 0 being the top.
    pub const fn square_to_cell(self, square: Square) -> (u8, u8) {
        let file = square.file().index();
        let rank = square.rank().index();
        match self {
            Orientation::WhiteBottom => (file, 7 - rank),
            Orientation::BlackBottom => (7 - file, rank),
        }
    }

    /// Inverse of [`Orientation::square_to_cell`]. Returns `None` for cells
    /// off the 8x8 grid.
    pub fn cell_to_square(self, column: u8, row: u8) -> Option<Square> {
        if column >= 8 || row >= 8 {
            return None;
        }
        let (file, rank) = match self {
            Orientation::WhiteBottom => (column, 7 - row),
            Orientation::BlackBottom => (7 - column, row),
        };
        Some(Square::new(File::new(file)?, Rank::new(rank)?))
    }
}

/// Placement of the board on a device measured in arbitrary units
/// (pixels, terminal cells).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BoardGeometry {
    pub origin_x: u32,
    pub origin_y: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub orientation: Orientation,
}

impl BoardGeometry {
    pub const fn new(
        origin_x: u32,
        origin_y: u32,
        cell_width: u32,
        cell_height: u32,
        orientation: Orientation,
    ) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
            orientation,
        }
    }

    pub const fn width(&self) -> u32 {
        self.cell_width * 8
    }

    pub const fn height(&self) -> u32 {
        self.cell_height * 8
    }

    /// Top-left device coordinate of `square`.
    pub const fn square_origin(&self, square: Square) -> (u32, u32) {
        let (column, row) = self.orientation.square_to_cell(square);
        (
            self.origin_x + column as u32 * self.cell_width,
            self.origin_y + row as u32 * self.cell_height,
        )
    }

    /// Square under the device coordinate, or `None` when the point is
    /// outside the board (for example on the move history panel).
    pub fn device_to_square(&self, x: u32, y: u32) -> Option<Square> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return None;
        }
        if x < self.origin_x || y < self.origin_y {
            return None;
        }
        let column = (x - self.origin_x) / self.cell_width;
        let row = (y - self.origin_y) / self.cell_height;
        if column >= 8 || row >= 8 {
            return None;
        }
        self.orientation.cell_to_square(column as u8, row as u8)
    }
}
