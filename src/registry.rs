//! Mutex-guarded bookkeeping of connected players and running sessions.
//!
//! Neither registry takes part in pairing; they exist for status reporting
//! and to make cleanup observable.

use core::fmt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::player::{LifecycleState, PlayerId};

/// What the registry knows about a connected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub peer: String,
    pub state: LifecycleState,
}

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Mutex<HashMap<PlayerId, PlayerRecord>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every operation leaves the map consistent, so a poisoned lock is safe
    // to keep using.
    fn lock(&self) -> MutexGuard<'_, HashMap<PlayerId, PlayerRecord>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, id: PlayerId, name: &str, peer: &str) {
        self.lock().insert(
            id,
            PlayerRecord {
                name: name.to_string(),
                peer: peer.to_string(),
                state: LifecycleState::Connecting,
            },
        );
    }

    pub fn rename(&self, id: PlayerId, name: &str) -> bool {
        match self.lock().get_mut(&id) {
            Some(record) => {
                record.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_state(&self, id: PlayerId, state: LifecycleState) -> bool {
        match self.lock().get_mut(&id) {
            Some(record) => {
                record.state = state;
                true
            }
            None => false,
        }
    }

    /// Remove a player. Returns `true` only for the call that removed it.
    pub fn deregister(&self, id: PlayerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn get(&self, id: PlayerId) -> Option<PlayerRecord> {
        self.lock().get(&id).cloned()
    }

    pub fn state(&self, id: PlayerId) -> Option<LifecycleState> {
        self.lock().get(&id).map(|r| r.state)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<(PlayerId, PlayerRecord)> {
        let mut all: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match#{}", self.0)
    }
}

/// A running match as seen from outside the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub players: [PlayerId; 2],
    pub names: [String; 2],
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, MatchRecord>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, MatchRecord>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, id: SessionId, record: MatchRecord) {
        self.lock().insert(id, record);
    }

    /// Remove a session. Returns `true` only for the call that removed it.
    pub fn remove(&self, id: SessionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
