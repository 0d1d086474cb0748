//! The shared matchmaking state, owned by one service object.

use log::{debug, info, log_enabled, Level};

use crate::player::{LifecycleState, Player, PlayerId};
use crate::queue::WaitingQueue;
use crate::registry::{MatchRecord, PlayerRecord, PlayerRegistry, SessionId, SessionRegistry};

/// Connected players, the waiting queue and the active-match registry.
///
/// Shared as `Arc<Lobby>` between the accept loop, the matchmaker and every
/// session. Callers only see synchronized operations; the collections
/// themselves are never handed out.
#[derive(Debug, Default)]
pub struct Lobby {
    players: PlayerRegistry,
    queue: WaitingQueue<Player>,
    sessions: SessionRegistry,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly accepted connection.
    pub fn register(&self, player: &Player) {
        self.players
            .register(player.id(), player.name(), &player.peer_label());
        debug!("registered {} from {}", player.id(), player.peer_label());
        self.log_status();
    }

    pub fn rename(&self, id: PlayerId, name: &str) {
        self.players.rename(id, name);
    }

    /// Put an identified player at the back of the line.
    pub fn enqueue(&self, player: Player) {
        self.players.set_state(player.id(), LifecycleState::Queued);
        info!("{} ({}) queued", player.name(), player.id());
        self.queue.enqueue(player);
        self.log_status();
    }

    /// Return a player to the front of the line after its partner dropped.
    pub fn requeue_front(&self, player: Player) {
        self.players.set_state(player.id(), LifecycleState::Queued);
        info!("{} ({}) returned to the head of the queue", player.name(), player.id());
        self.queue.push_front(player);
    }

    /// Wait for the two longest-waiting players and mark them paired.
    pub async fn dequeue_pair(&self) -> (Player, Player) {
        let (first, second) = self.queue.dequeue_pair().await;
        self.players.set_state(first.id(), LifecycleState::Paired);
        self.players.set_state(second.id(), LifecycleState::Paired);
        (first, second)
    }

    /// Forget a player. Returns `true` only for the call that removed it.
    pub fn deregister(&self, id: PlayerId) -> bool {
        self.players.set_state(id, LifecycleState::Disconnected);
        let removed = self.players.deregister(id);
        if removed {
            debug!("deregistered {}", id);
            self.log_status();
        }
        removed
    }

    pub fn begin_session(&self, id: SessionId, record: MatchRecord) {
        for player in record.players {
            self.players.set_state(player, LifecycleState::InGame);
        }
        info!("{} started: {} vs {}", id, record.names[0], record.names[1]);
        self.sessions.insert(id, record);
        self.log_status();
    }

    /// Remove a finished session. Returns `true` only for the call that
    /// removed it.
    pub fn end_session(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(id);
        if removed {
            self.log_status();
        }
        removed
    }

    pub fn connected_players(&self) -> usize {
        self.players.len()
    }

    pub fn queued_players(&self) -> usize {
        self.queue.len()
    }

    pub fn active_matches(&self) -> usize {
        self.sessions.len()
    }

    pub fn has_session(&self, id: SessionId) -> bool {
        self.sessions.contains(id)
    }

    pub fn player(&self, id: PlayerId) -> Option<PlayerRecord> {
        self.players.get(id)
    }

    pub fn player_state(&self, id: PlayerId) -> Option<LifecycleState> {
        self.players.state(id)
    }

    fn log_status(&self) {
        info!(
            "status: {} connected, {} queued, {} active matches",
            self.players.len(),
            self.queue.len(),
            self.sessions.len()
        );
        if log_enabled!(Level::Debug) {
            for (id, record) in self.players.snapshot() {
                debug!("  {} {} ({:?}) from {}", id, record.name, record.state, record.peer);
            }
        }
    }
}
