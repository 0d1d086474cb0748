//! The coordinator: pairs queued players and starts their sessions.

use std::sync::Arc;

use log::{error, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::board::Board;
use crate::common::BoardError;
use crate::config::{GameRules, ServerConfig};
use crate::lobby::Lobby;
use crate::player::Player;
use crate::protocol::Message;
use crate::session::{GameSession, SessionGuard, SessionOutcome};

pub struct Matchmaker {
    lobby: Arc<Lobby>,
    rules: GameRules,
    move_timeout: Option<Duration>,
    rng: SmallRng,
}

impl Matchmaker {
    pub fn new(lobby: Arc<Lobby>, config: &ServerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self {
            lobby,
            rules: config.rules.clone(),
            move_timeout: config.move_timeout,
            rng,
        }
    }

    /// Pair players for the lifetime of the process.
    pub async fn run(mut self) {
        info!("matchmaker started");
        loop {
            // The session runs detached; its supervisor logs how it ended.
            let _ = self.match_next().await;
        }
    }

    /// Wait for one pair and try to start a session for it.
    ///
    /// Returns the supervised session task, or `None` if the pair was broken
    /// up (a dead player, or the boards could not be generated).
    pub async fn match_next(&mut self) -> Option<JoinHandle<Option<SessionOutcome>>> {
        let (mut first, mut second) = self.lobby.dequeue_pair().await;
        let first_alive = first.is_open().await;
        let second_alive = second.is_open().await;
        match (first_alive, second_alive) {
            (true, true) => self.start_session(first, second).await,
            (true, false) => {
                self.discard(second, "disconnected while queued").await;
                self.lobby.requeue_front(first);
                None
            }
            (false, true) => {
                self.discard(first, "disconnected while queued").await;
                self.lobby.requeue_front(second);
                None
            }
            (false, false) => {
                self.discard(first, "disconnected while queued").await;
                self.discard(second, "disconnected while queued").await;
                None
            }
        }
    }

    async fn discard(&self, mut player: Player, why: &str) {
        info!("dropping {} ({}): {}", player.name(), player.id(), why);
        player.close().await;
        self.lobby.deregister(player.id());
    }

    fn generate_boards(&mut self) -> Result<(Board, Board), BoardError> {
        let first = Board::random_fleet(&self.rules, &mut self.rng)?;
        let second = Board::random_fleet(&self.rules, &mut self.rng)?;
        Ok((first, second))
    }

    async fn start_session(
        &mut self,
        mut first: Player,
        mut second: Player,
    ) -> Option<JoinHandle<Option<SessionOutcome>>> {
        let (first_board, second_board) = match self.generate_boards() {
            Ok(boards) => boards,
            Err(e) => {
                error!(
                    "could not start a match for {} and {}: {}",
                    first.name(),
                    second.name(),
                    e
                );
                for player in [&mut first, &mut second] {
                    let _ = player
                        .send(&Message::error("The server could not start your match."))
                        .await;
                }
                self.discard(first, "match setup failed").await;
                self.discard(second, "match setup failed").await;
                return None;
            }
        };

        let session = GameSession::new(first, second, first_board, second_board)
            .with_move_timeout(self.move_timeout);
        let id = session.id();
        let guard = SessionGuard::register(self.lobby.clone(), &session);
        let game = tokio::spawn(async move {
            let _guard = guard;
            session.run().await
        });

        Some(tokio::spawn(async move {
            match game.await {
                Ok(outcome) => Some(outcome),
                Err(e) if e.is_panic() => {
                    error!("{} panicked; its players were cleaned up", id);
                    None
                }
                Err(e) => {
                    warn!("{} was cancelled: {}", id, e);
                    None
                }
            }
        }))
    }
}
