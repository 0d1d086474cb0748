//! Game board: a square grid of cells, ship placement and attack resolution.

use core::fmt;

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::{AttackOutcome, BoardError, MoveError};
use crate::config::GameRules;
use crate::ship::{Orientation, Placement};

/// Random origins tried for one ship before the fleet is restarted.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 100;
/// Whole-fleet restarts before falling back to the deterministic layout.
pub const MAX_FLEET_ATTEMPTS: usize = 64;

/// State of a single grid cell. Serialized as the one-character symbols
/// clients render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[serde(rename = "~")]
    Water,
    #[serde(rename = "S")]
    Ship,
    #[serde(rename = "X")]
    Hit,
    #[serde(rename = "O")]
    Miss,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Water => '~',
            Cell::Ship => 'S',
            Cell::Hit => 'X',
            Cell::Miss => 'O',
        }
    }

    /// `true` once the cell has been targeted.
    pub fn is_resolved(self) -> bool {
        matches!(self, Cell::Hit | Cell::Miss)
    }
}

/// Square grid of cells with the placements that produced its `Ship` cells.
///
/// Cells only ever move `Water -> Miss` or `Ship -> Hit`; resolved cells are
/// never changed again.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
    placements: Vec<Placement>,
}

impl Board {
    /// Create an all-water board.
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![Cell::Water; size * size],
            placements: Vec::new(),
        }
    }

    /// Build a board from explicit placements, rejecting overlaps.
    pub fn from_placements<I>(size: usize, placements: I) -> Result<Self, BoardError>
    where
        I: IntoIterator<Item = Placement>,
    {
        let mut board = Board::new(size);
        for placement in placements {
            board.place(placement)?;
        }
        Ok(board)
    }

    /// Generate a board with every ship of `rules` placed at random.
    ///
    /// Each ship gets [`MAX_PLACEMENT_ATTEMPTS`] random tries; if one runs out
    /// the fleet starts over, up to [`MAX_FLEET_ATTEMPTS`] times, after which
    /// the deterministic [`Board::fallback_fleet`] layout is used.
    pub fn random_fleet<R: Rng + ?Sized>(rules: &GameRules, rng: &mut R) -> Result<Self, BoardError> {
        rules.validate()?;
        for _ in 0..MAX_FLEET_ATTEMPTS {
            match Self::try_random_fleet(rules, rng) {
                Ok(board) => return Ok(board),
                Err(BoardError::UnableToPlaceShip) => continue,
                Err(e) => return Err(e),
            }
        }
        warn!(
            "random placement failed {} times ({} tries per ship); using fallback layout",
            MAX_FLEET_ATTEMPTS, MAX_PLACEMENT_ATTEMPTS
        );
        Self::fallback_fleet(rules)
    }

    /// One attempt at a random fleet.
    pub fn try_random_fleet<R: Rng + ?Sized>(
        rules: &GameRules,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        let mut board = Board::new(rules.board_size);
        for &length in &rules.ship_lengths {
            let placement = board.random_placement(rng, length)?;
            board.place(placement)?;
        }
        Ok(board)
    }

    /// Returns a random in-bounds placement of `length` that only covers water.
    pub fn random_placement<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        length: usize,
    ) -> Result<Placement, BoardError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let placement = match Placement::random(rng, length, self.size) {
                Ok(p) => p,
                Err(BoardError::OutOfBounds) => continue,
                Err(e) => return Err(e),
            };
            if self.is_clear(&placement) {
                return Ok(placement);
            }
        }
        Err(BoardError::UnableToPlaceShip)
    }

    /// First-fit layout: each ship goes to the first position, scanning rows
    /// then columns, horizontal before vertical, where it fits on water.
    pub fn fallback_fleet(rules: &GameRules) -> Result<Self, BoardError> {
        rules.validate()?;
        let size = rules.board_size;
        let mut board = Board::new(size);
        for &length in &rules.ship_lengths {
            let placement = (0..size * size)
                .flat_map(|i| {
                    [Orientation::Horizontal, Orientation::Vertical]
                        .into_iter()
                        .map(move |o| (i / size, i % size, o))
                })
                .filter_map(|(r, c, o)| Placement::new(r, c, o, length, size).ok())
                .find(|p| board.is_clear(p))
                .ok_or(BoardError::UnableToPlaceShip)?;
            board.place(placement)?;
        }
        Ok(board)
    }

    /// Place a single ship. All its cells must currently be water.
    pub fn place(&mut self, placement: Placement) -> Result<(), BoardError> {
        if placement.cells().any(|(r, c)| r >= self.size || c >= self.size) {
            return Err(BoardError::OutOfBounds);
        }
        if !self.is_clear(&placement) {
            return Err(BoardError::Overlaps);
        }
        for (r, c) in placement.cells() {
            let idx = self.index(r, c);
            self.cells[idx] = Cell::Ship;
        }
        self.placements.push(placement);
        Ok(())
    }

    fn is_clear(&self, placement: &Placement) -> bool {
        placement
            .cells()
            .all(|(r, c)| self.get(r, c) == Some(Cell::Water))
    }

    /// Resolve an attack at (row, col).
    pub fn attack(&mut self, row: usize, col: usize) -> Result<AttackOutcome, MoveError> {
        let cell = self.get(row, col).ok_or(MoveError::OutOfBounds {
            row: row as i64,
            col: col as i64,
        })?;
        let idx = self.index(row, col);
        match cell {
            Cell::Ship => {
                self.cells[idx] = Cell::Hit;
                Ok(AttackOutcome::Hit)
            }
            Cell::Water => {
                self.cells[idx] = Cell::Miss;
                Ok(AttackOutcome::Miss)
            }
            Cell::Hit | Cell::Miss => Err(MoveError::AlreadyAttacked { row, col }),
        }
    }

    /// Record an attack result on a view of someone else's board. The view
    /// never holds `Ship` cells.
    pub fn reveal(&mut self, row: usize, col: usize, outcome: AttackOutcome) -> Result<(), MoveError> {
        let cell = self.get(row, col).ok_or(MoveError::OutOfBounds {
            row: row as i64,
            col: col as i64,
        })?;
        if cell.is_resolved() {
            return Err(MoveError::AlreadyAttacked { row, col });
        }
        let idx = self.index(row, col);
        self.cells[idx] = match outcome {
            AttackOutcome::Hit => Cell::Hit,
            AttackOutcome::Miss => Cell::Miss,
        };
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row < self.size && col < self.size {
            Some(self.cells[self.index(row, col)])
        } else {
            None
        }
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Number of ship segments not yet hit.
    pub fn remaining_ship_cells(&self) -> usize {
        self.count(Cell::Ship)
    }

    /// Returns `true` when no `Ship` cell remains.
    pub fn all_sunk(&self) -> bool {
        self.remaining_ship_cells() == 0
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Rows top-to-bottom, as sent on the wire.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.cells.chunks(self.size.max(1)).map(<[Cell]>::to_vec).collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Grid(&self.rows()), f)
    }
}

/// Text rendering of a grid of rows: a header of column letters, then one
/// line per row numbered from 1.
pub struct Grid<'a>(pub &'a [Vec<Cell>]);

impl fmt::Display for Grid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.0.first().map_or(0, Vec::len);
        write!(f, "  ")?;
        for c in 0..width {
            write!(f, " {}", column_letter(c))?;
        }
        writeln!(f)?;
        for (r, row) in self.0.iter().enumerate() {
            write!(f, "{:2}", r + 1)?;
            for cell in row {
                write!(f, " {}", cell.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Column label used by [`Grid`] and move input: `A` for column 0.
pub fn column_letter(col: usize) -> char {
    u8::try_from(col)
        .ok()
        .and_then(|c| b'A'.checked_add(c))
        .map_or('?', char::from)
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Board {{ size: {}, ships: {}, hits: {}, misses: {} }}",
            self.size,
            self.count(Cell::Ship),
            self.count(Cell::Hit),
            self.count(Cell::Miss)
        )
    }
}
