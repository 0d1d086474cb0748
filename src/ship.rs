//! Ship placement geometry.

use core::fmt;

use rand::Rng;

use crate::common::BoardError;

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// A ship of `length` segments anchored at (`row`, `col`) and extending
/// right (horizontal) or down (vertical).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    row: usize,
    col: usize,
    orientation: Orientation,
    length: usize,
}

impl Placement {
    /// Build a placement that fits inside an `board_size`x`board_size` grid.
    pub fn new(
        row: usize,
        col: usize,
        orientation: Orientation,
        length: usize,
        board_size: usize,
    ) -> Result<Self, BoardError> {
        if length == 0 || row >= board_size || col >= board_size {
            return Err(BoardError::OutOfBounds);
        }
        let end = match orientation {
            Orientation::Horizontal => col + length,
            Orientation::Vertical => row + length,
        };
        if end > board_size {
            return Err(BoardError::OutOfBounds);
        }
        Ok(Self {
            row,
            col,
            orientation,
            length,
        })
    }

    /// Pick a uniformly random origin and orientation. The result may still
    /// overlap other ships; the caller checks occupancy.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        length: usize,
        board_size: usize,
    ) -> Result<Self, BoardError> {
        let orientation = Orientation::random(rng);
        let row = rng.random_range(0..board_size);
        let col = rng.random_range(0..board_size);
        Self::new(row, col, orientation, length, board_size)
    }

    /// Cells covered by the ship, from the origin outward.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.length).map(move |i| match self.orientation {
            Orientation::Horizontal => (self.row, self.col + i),
            Orientation::Vertical => (self.row + i, self.col),
        })
    }

    pub fn origin(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Placement {{ origin: ({}, {}), orientation: {:?}, length: {} }}",
            self.row, self.col, self.orientation, self.length
        )
    }
}
