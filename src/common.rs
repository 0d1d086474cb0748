//! Common types for Broadside: board errors, move errors and attack outcomes.

use core::fmt;

/// Outcome of resolving an attack against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// The cell held a ship segment and is now `Hit`.
    Hit,
    /// The cell was open water and is now `Miss`.
    Miss,
}

impl AttackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackOutcome::Hit => "hit",
            AttackOutcome::Miss => "miss",
        }
    }
}

/// Errors returned by board construction and ship placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Coordinates or ship extent fall outside the grid.
    OutOfBounds,
    /// Ship placement overlaps another ship.
    Overlaps,
    /// Random placement gave up after exhausting its attempts.
    UnableToPlaceShip,
    /// Board size or fleet composition cannot produce a playable board.
    InvalidRules(String),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::OutOfBounds => write!(f, "Ship placement is out of bounds"),
            BoardError::Overlaps => write!(f, "Ship placement overlaps with another ship"),
            BoardError::UnableToPlaceShip => write!(f, "Unable to place ship"),
            BoardError::InvalidRules(reason) => write!(f, "Invalid game rules: {}", reason),
        }
    }
}

impl std::error::Error for BoardError {}

/// Recoverable input errors. The session replies to the sender and
/// re-prompts without consuming the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// Coordinates outside `0..board_size`.
    OutOfBounds { row: i64, col: i64 },
    /// The target cell was already resolved to `Hit` or `Miss`.
    AlreadyAttacked { row: usize, col: usize },
    /// Something other than a move arrived while a move was awaited.
    UnexpectedMessage(&'static str),
    /// The session is no longer accepting moves.
    GameOver,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::OutOfBounds { row, col } => {
                write!(f, "Move ({}, {}) is outside the board", row, col)
            }
            MoveError::AlreadyAttacked { row, col } => {
                write!(f, "Cell ({}, {}) was already attacked", row, col)
            }
            MoveError::UnexpectedMessage(kind) => {
                write!(f, "Expected a move, got {}", kind)
            }
            MoveError::GameOver => write!(f, "The game is already over"),
        }
    }
}

impl std::error::Error for MoveError {}
