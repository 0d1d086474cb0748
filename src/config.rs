//! Game rules and server settings.

use std::time::Duration;

use crate::common::BoardError;

pub const BOARD_SIZE: usize = 10;
pub const SHIP_LENGTHS: [usize; 5] = [5, 4, 3, 3, 2];

/// Total number of ship segments used in the standard configuration.
pub const TOTAL_SHIP_CELLS: usize = 5 + 4 + 3 + 3 + 2;

/// Largest board the protocol supports (columns are lettered A..Z by clients).
pub const MAX_BOARD_SIZE: usize = 26;

pub const DEFAULT_BIND: &str = "127.0.0.1:5555";

/// Maximum frame payload (1 MiB). A 26x26 board update is a few kilobytes.
pub const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Board dimensions and fleet composition shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    pub board_size: usize,
    pub ship_lengths: Vec<usize>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE,
            ship_lengths: SHIP_LENGTHS.to_vec(),
        }
    }
}

impl GameRules {
    /// Sum of all ship lengths, i.e. the number of `Ship` cells on a fresh board.
    pub fn total_ship_cells(&self) -> usize {
        self.ship_lengths.iter().sum()
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.board_size == 0 || self.board_size > MAX_BOARD_SIZE {
            return Err(BoardError::InvalidRules(format!(
                "board size must be between 1 and {MAX_BOARD_SIZE}, got {}",
                self.board_size
            )));
        }
        if self.ship_lengths.is_empty() {
            return Err(BoardError::InvalidRules("fleet has no ships".into()));
        }
        if let Some(&len) = self
            .ship_lengths
            .iter()
            .find(|&&len| len == 0 || len > self.board_size)
        {
            return Err(BoardError::InvalidRules(format!(
                "ship length {len} does not fit a {0}x{0} board",
                self.board_size
            )));
        }
        if self.total_ship_cells() > self.board_size * self.board_size {
            return Err(BoardError::InvalidRules(format!(
                "fleet needs {} cells but the board has {}",
                self.total_ship_cells(),
                self.board_size * self.board_size
            )));
        }
        Ok(())
    }
}

/// Runtime settings for the matchmaking server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub rules: GameRules,
    /// How long the player on turn may stay silent before being treated as
    /// disconnected. `None` waits forever.
    pub move_timeout: Option<Duration>,
    pub max_frame_len: u32,
    /// Fixed RNG seed for reproducible fleets.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            rules: GameRules::default(),
            move_timeout: None,
            max_frame_len: MAX_FRAME_LEN,
            seed: None,
        }
    }
}
