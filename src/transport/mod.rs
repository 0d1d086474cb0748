//! Abstract bidirectional message channel used by sessions, plus its TCP and
//! in-memory implementations.

use crate::protocol::{Message, ProtocolError};

/// A connection to one peer that carries whole [`Message`]s.
///
/// Game sessions only ever talk to players through this trait, so the turn
/// logic is independent of the wire format underneath.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: &Message) -> Result<(), ProtocolError>;

    /// Next message from the peer, or `Ok(None)` once the peer has closed the
    /// connection cleanly.
    async fn recv(&mut self) -> Result<Option<Message>, ProtocolError>;

    /// Cheap, non-blocking liveness probe. Never consumes a message.
    async fn is_open(&mut self) -> bool;

    /// Close the connection. Further sends fail with `ProtocolError::Closed`.
    async fn close(&mut self);

    /// Human-readable peer description for logs.
    fn peer_label(&self) -> String;
}

pub mod in_memory;
pub mod tcp;
