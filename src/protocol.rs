//! Messages exchanged between the server and its clients.
//!
//! Every message travels as one frame (see [`frame`]): a 4-byte big-endian
//! length followed by a JSON object of the form `{"type": ..., "data": ...}`.

pub mod frame;

use core::fmt;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};

use crate::board::{Board, Cell};

pub use frame::{decode_frame, encode_frame, read_frame, write_frame, ProtocolError};

/// Why a `StatusUpdate` was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Queued, waiting for an opponent.
    Waiting,
    /// Paired with an opponent; the game is starting.
    Paired,
    /// The recipient must send a `Move` now.
    YourTurn,
    /// The last move targeted a cell that was already resolved.
    AlreadyAttacked,
    /// The opponent left; the session is over.
    OpponentDisconnected,
}

/// Discriminated union of everything that can appear in a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// First message from a client after connecting.
    Identify { display_name: String },
    /// Attack the opponent's board. Any JSON integer decodes, saturating at
    /// the `i64` range, so bad coordinates are rejected by move validation
    /// rather than by the decoder.
    Move {
        #[serde(deserialize_with = "saturating_coord")]
        row: i64,
        #[serde(deserialize_with = "saturating_coord")]
        col: i64,
    },
    StatusUpdate { kind: StatusKind, text: String },
    /// The recipient's own board and its view of the opponent's board.
    BoardUpdate {
        own_board: Vec<Vec<Cell>>,
        opponent_board: Vec<Vec<Cell>>,
        text: String,
    },
    /// Terminal message of a finished session.
    #[serde(rename = "result")]
    GameResult { winner_name: String, text: String },
    Error { text: String },
}

impl Message {
    pub fn status(kind: StatusKind, text: impl Into<String>) -> Self {
        Message::StatusUpdate {
            kind,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Message::Error { text: text.into() }
    }

    pub fn board_update(own: &Board, view: &Board, text: impl Into<String>) -> Self {
        Message::BoardUpdate {
            own_board: own.rows(),
            opponent_board: view.rows(),
            text: text.into(),
        }
    }

    /// Wire name of the message kind, for logs and error replies.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Identify { .. } => "identify",
            Message::Move { .. } => "move",
            Message::StatusUpdate { .. } => "status_update",
            Message::BoardUpdate { .. } => "board_update",
            Message::GameResult { .. } => "result",
            Message::Error { .. } => "error",
        }
    }
}

/// Accepts any integer, including ones past the `i64` range that serde_json
/// hands over as floats, and clamps it to `i64`.
fn saturating_coord<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CoordVisitor;

    impl<'de> Visitor<'de> for CoordVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer coordinate")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            Ok(i64::try_from(v).unwrap_or(i64::MAX))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.is_finite() && v.fract() == 0.0 {
                // Float to int `as` casts saturate.
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }
    }

    deserializer.deserialize_i64(CoordVisitor)
}
