//! Connected peers.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::protocol::{Message, ProtocolError};
use crate::transport::Transport;

static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique player identifier, assigned on accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(u64);

impl PlayerId {
    pub fn next() -> Self {
        PlayerId(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Where a player is in its lifetime on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Connecting,
    Queued,
    Paired,
    InGame,
    Disconnected,
}

/// A connected peer. Owns its connection exclusively; whoever holds the
/// `Player` (the connection handler, the waiting queue or one session) is
/// the only one that can talk to it.
pub struct Player {
    id: PlayerId,
    name: String,
    transport: Box<dyn Transport>,
}

impl Player {
    /// Wrap a fresh connection. The display name defaults to the peer address
    /// until the client identifies itself.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        let name = transport.peer_label();
        Self {
            id: PlayerId::next(),
            name,
            transport,
        }
    }

    pub fn with_name(transport: Box<dyn Transport>, name: impl Into<String>) -> Self {
        let mut player = Self::new(transport);
        player.name = name.into();
        player
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn peer_label(&self) -> String {
        self.transport.peer_label()
    }

    pub async fn send(&mut self, msg: &Message) -> Result<(), ProtocolError> {
        self.transport.send(msg).await
    }

    pub async fn recv(&mut self) -> Result<Option<Message>, ProtocolError> {
        self.transport.recv().await
    }

    pub async fn is_open(&mut self) -> bool {
        self.transport.is_open().await
    }

    pub async fn close(&mut self) {
        self.transport.close().await
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("peer", &self.transport.peer_label())
            .finish()
    }
}
