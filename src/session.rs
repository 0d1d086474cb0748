//! One match between two paired players.
//!
//! A session owns both players (and so both connections), their boards and
//! the turn pointer. It is driven by exactly one task, which only ever reads
//! from the connection of the player whose turn it is.

use core::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::{timeout, Duration};

use crate::board::Board;
use crate::common::{AttackOutcome, MoveError};
use crate::lobby::Lobby;
use crate::player::{Player, PlayerId};
use crate::protocol::{Message, ProtocolError, StatusKind};
use crate::registry::{MatchRecord, SessionId};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
    Aborted,
}

/// Why a session ended early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The player closed the connection (or could no longer be written to).
    Disconnected { player: String },
    /// The player sent something that could not be framed or decoded.
    Protocol { player: String, error: String },
    /// The player on turn stayed silent past the configured move timeout.
    IdleTimeout { player: String },
}

impl AbortReason {
    pub fn player(&self) -> &str {
        match self {
            AbortReason::Disconnected { player }
            | AbortReason::Protocol { player, .. }
            | AbortReason::IdleTimeout { player } => player,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Disconnected { player } => write!(f, "{} disconnected", player),
            AbortReason::Protocol { player, error } => {
                write!(f, "protocol error from {}: {}", player, error)
            }
            AbortReason::IdleTimeout { player } => write!(f, "{} timed out", player),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { winner: String },
    Aborted(AbortReason),
}

/// Result of one accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnResult {
    pub row: usize,
    pub col: usize,
    pub outcome: AttackOutcome,
    /// The move sank the last ship; the acting player has won.
    pub game_over: bool,
}

/// Which seat failed and why. Internal to the turn loop.
struct Abort {
    seat: usize,
    reason: AbortReason,
}

struct Seat {
    player: Player,
    /// Ground truth: this player's ships and the opponent's shots.
    own: Board,
    /// What this player knows of the opponent's board.
    view: Board,
}

pub struct GameSession {
    id: SessionId,
    seats: [Seat; 2],
    current: usize,
    status: SessionStatus,
    move_timeout: Option<Duration>,
}

impl GameSession {
    /// Seat two players with the given boards. `first` moves first.
    pub fn new(first: Player, second: Player, first_board: Board, second_board: Board) -> Self {
        let seat = |player, own: Board, opponent_size| Seat {
            player,
            own,
            view: Board::new(opponent_size),
        };
        let (first_size, second_size) = (first_board.size(), second_board.size());
        Self {
            id: SessionId::next(),
            seats: [
                seat(first, first_board, second_size),
                seat(second, second_board, first_size),
            ],
            current: 0,
            status: SessionStatus::Active,
            move_timeout: None,
        }
    }

    /// Treat the player on turn as disconnected after `limit` of silence.
    pub fn with_move_timeout(mut self, limit: Option<Duration>) -> Self {
        self.move_timeout = limit;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn player_ids(&self) -> [PlayerId; 2] {
        [self.seats[0].player.id(), self.seats[1].player.id()]
    }

    pub fn player_names(&self) -> [String; 2] {
        [
            self.seats[0].player.name().to_string(),
            self.seats[1].player.name().to_string(),
        ]
    }

    pub fn record(&self) -> MatchRecord {
        MatchRecord {
            players: self.player_ids(),
            names: self.player_names(),
        }
    }

    /// The player expected to move, or `None` once the session has ended.
    pub fn current_turn(&self) -> Option<PlayerId> {
        match self.status {
            SessionStatus::Active => Some(self.seats[self.current].player.id()),
            _ => None,
        }
    }

    fn seat_of(&self, id: PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player.id() == id)
    }

    /// A player's own board.
    pub fn own_board(&self, id: PlayerId) -> Option<&Board> {
        self.seat_of(id).map(|s| &s.own)
    }

    /// A player's view of its opponent's board.
    pub fn opponent_view(&self, id: PlayerId) -> Option<&Board> {
        self.seat_of(id).map(|s| &s.view)
    }

    /// Apply a move by the player on turn, without any I/O.
    ///
    /// A hit or miss is mirrored onto the mover's view; the turn passes to
    /// the opponent unless the move sank the last ship, in which case the
    /// session becomes `Completed`. Errors leave the session untouched.
    pub fn apply_move(&mut self, row: i64, col: i64) -> Result<TurnResult, MoveError> {
        if self.status != SessionStatus::Active {
            return Err(MoveError::GameOver);
        }
        let actor = self.current;
        let target = 1 - actor;
        let size = self.seats[target].own.size();
        let (r, c) = match (usize::try_from(row), usize::try_from(col)) {
            (Ok(r), Ok(c)) if r < size && c < size => (r, c),
            _ => return Err(MoveError::OutOfBounds { row, col }),
        };

        let outcome = self.seats[target].own.attack(r, c)?;
        self.seats[actor].view.reveal(r, c, outcome)?;

        let game_over = self.seats[target].own.all_sunk();
        if game_over {
            self.status = SessionStatus::Completed;
        } else {
            self.current = target;
        }
        Ok(TurnResult {
            row: r,
            col: c,
            outcome,
            game_over,
        })
    }

    /// Play the match to the end, then close both connections.
    pub async fn run(mut self) -> SessionOutcome {
        let outcome = match self.play().await {
            Ok(winner) => {
                let winner = self.seats[winner].player.name().to_string();
                info!("{} completed, winner {}", self.id, winner);
                SessionOutcome::Completed { winner }
            }
            Err(Abort { seat, reason }) => {
                self.status = SessionStatus::Aborted;
                warn!("{} aborted: {}", self.id, reason);
                self.notify_abort(seat, &reason).await;
                SessionOutcome::Aborted(reason)
            }
        };
        for seat in &mut self.seats {
            seat.player.close().await;
        }
        outcome
    }

    /// Turn loop. Returns the winning seat.
    async fn play(&mut self) -> Result<usize, Abort> {
        self.start().await?;
        loop {
            let seat = self.current;
            self.send(seat, &Message::status(StatusKind::YourTurn, "It's your turn."))
                .await?;

            let (row, col) = match self.await_move(seat).await? {
                Message::Move { row, col } => (row, col),
                other => {
                    debug!(
                        "{}: {}: {}",
                        self.id,
                        self.seats[seat].player.name(),
                        MoveError::UnexpectedMessage(other.kind())
                    );
                    self.send(seat, &Message::error("Invalid message type.")).await?;
                    continue;
                }
            };

            match self.apply_move(row, col) {
                Ok(turn) => {
                    debug!(
                        "{}: {} attacked ({}, {}): {}",
                        self.id,
                        self.seats[seat].player.name(),
                        turn.row,
                        turn.col,
                        turn.outcome.as_str()
                    );
                    if turn.game_over {
                        self.finish(seat, &turn).await;
                        return Ok(seat);
                    }
                    self.broadcast_turn(seat, &turn).await?;
                }
                Err(MoveError::AlreadyAttacked { .. }) => {
                    let notice = Message::status(
                        StatusKind::AlreadyAttacked,
                        "You already attacked that position.",
                    );
                    self.send(seat, &notice).await?;
                }
                Err(MoveError::OutOfBounds { .. }) => {
                    self.send(seat, &Message::error("Invalid move coordinates.")).await?;
                }
                Err(e) => {
                    self.send(seat, &Message::error(e.to_string())).await?;
                }
            }
        }
    }

    /// Announce the pairing and send each player its starting boards.
    async fn start(&mut self) -> Result<(), Abort> {
        for seat in 0..2 {
            let opponent = self.seats[1 - seat].player.name().to_string();
            let paired = Message::status(
                StatusKind::Paired,
                format!("You have been paired with {}. Game starting!", opponent),
            );
            self.send(seat, &paired).await?;
        }
        for seat in 0..2 {
            let boards = self.board_update(seat, "Game started. Here are your boards.");
            self.send(seat, &boards).await?;
        }
        Ok(())
    }

    async fn await_move(&mut self, seat: usize) -> Result<Message, Abort> {
        let limit = self.move_timeout;
        let player = &mut self.seats[seat].player;
        let received = match limit {
            Some(limit) => match timeout(limit, player.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    return Err(Abort {
                        seat,
                        reason: AbortReason::IdleTimeout {
                            player: player.name().to_string(),
                        },
                    })
                }
            },
            None => player.recv().await,
        };
        match received {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(Abort {
                seat,
                reason: AbortReason::Disconnected {
                    player: player.name().to_string(),
                },
            }),
            Err(e) => Err(self.protocol_abort(seat, e)),
        }
    }

    fn protocol_abort(&self, seat: usize, error: ProtocolError) -> Abort {
        let player = self.seats[seat].player.name().to_string();
        let reason = match error {
            ProtocolError::Closed => AbortReason::Disconnected { player },
            other => AbortReason::Protocol {
                player,
                error: other.to_string(),
            },
        };
        Abort { seat, reason }
    }

    async fn send(&mut self, seat: usize, msg: &Message) -> Result<(), Abort> {
        match self.seats[seat].player.send(msg).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.protocol_abort(seat, e)),
        }
    }

    fn board_update(&self, seat: usize, text: impl Into<String>) -> Message {
        let s = &self.seats[seat];
        Message::board_update(&s.own, &s.view, text)
    }

    fn turn_updates(&self, actor: usize, turn: &TurnResult) -> [Message; 2] {
        let actor_text = match turn.outcome {
            AttackOutcome::Hit => "You hit a ship!",
            AttackOutcome::Miss => "You missed.",
        };
        let target_text = format!(
            "The opponent attacked ({}, {}) and it was a {}.",
            turn.row,
            turn.col,
            turn.outcome.as_str()
        );
        [
            self.board_update(actor, actor_text),
            self.board_update(1 - actor, target_text),
        ]
    }

    async fn broadcast_turn(&mut self, actor: usize, turn: &TurnResult) -> Result<(), Abort> {
        let [to_actor, to_target] = self.turn_updates(actor, turn);
        self.send(actor, &to_actor).await?;
        self.send(1 - actor, &to_target).await
    }

    /// Final board updates and the result. The game is decided, so delivery
    /// failures are only logged.
    async fn finish(&mut self, winner: usize, turn: &TurnResult) {
        let [to_winner, to_loser] = self.turn_updates(winner, turn);
        let winner_name = self.seats[winner].player.name().to_string();
        let messages = [
            (winner, to_winner),
            (1 - winner, to_loser),
            (
                winner,
                Message::GameResult {
                    winner_name: winner_name.clone(),
                    text: "You win!".into(),
                },
            ),
            (
                1 - winner,
                Message::GameResult {
                    winner_name,
                    text: "You lose.".into(),
                },
            ),
        ];
        for (seat, msg) in messages {
            if let Err(e) = self.seats[seat].player.send(&msg).await {
                warn!(
                    "{}: could not deliver {} to {}: {}",
                    self.id,
                    msg.kind(),
                    self.seats[seat].player.name(),
                    e
                );
            }
        }
    }

    /// Tell the surviving player the match is over. The failed player gets a
    /// best-effort error if it broke the protocol.
    async fn notify_abort(&mut self, failed: usize, reason: &AbortReason) {
        if let AbortReason::Protocol { error, .. } = reason {
            let _ = self.seats[failed]
                .player
                .send(&Message::error(format!("Protocol error: {}", error)))
                .await;
        }
        let survivor = 1 - failed;
        let notice = Message::status(
            StatusKind::OpponentDisconnected,
            format!("{} left the game. The match is over.", reason.player()),
        );
        if let Err(e) = self.seats[survivor].player.send(&notice).await {
            debug!(
                "{}: {} is gone too: {}",
                self.id,
                self.seats[survivor].player.name(),
                e
            );
        }
    }
}

/// Removes a session from the lobby and deregisters both players when
/// dropped, whichever way the session task ends.
pub struct SessionGuard {
    lobby: Arc<Lobby>,
    session: SessionId,
    players: [PlayerId; 2],
}

impl SessionGuard {
    /// Register `session` as active and arm the cleanup.
    pub fn register(lobby: Arc<Lobby>, session: &GameSession) -> Self {
        lobby.begin_session(session.id(), session.record());
        Self {
            lobby,
            session: session.id(),
            players: session.player_ids(),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.lobby.end_session(self.session) {
            warn!("{} was already removed from the registry", self.session);
        }
        for player in self.players {
            self.lobby.deregister(player);
        }
    }
}
