use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::protocol::{Message, ProtocolError};
use crate::transport::Transport;

/// One end of an in-process message pipe. Closing or dropping either end
/// looks like a clean disconnect to the other.
pub struct InMemoryTransport {
    label: String,
    tx: Option<UnboundedSender<Message>>,
    rx: UnboundedReceiver<Message>,
}

impl InMemoryTransport {
    pub fn pair() -> (Self, Self) {
        Self::labelled_pair("left", "right")
    }

    pub fn labelled_pair(left: &str, right: &str) -> (Self, Self) {
        let (tx1, rx1) = unbounded_channel();
        let (tx2, rx2) = unbounded_channel();
        (
            Self {
                label: left.to_string(),
                tx: Some(tx1),
                rx: rx2,
            },
            Self {
                label: right.to_string(),
                tx: Some(tx2),
                rx: rx1,
            },
        )
    }

    /// Non-blocking receive, for tests that assert nothing is pending.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, msg: &Message) -> Result<(), ProtocolError> {
        let tx = self.tx.as_ref().ok_or(ProtocolError::Closed)?;
        tx.send(msg.clone()).map_err(|_| ProtocolError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<Message>, ProtocolError> {
        Ok(self.rx.recv().await)
    }

    async fn is_open(&mut self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    async fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }

    fn peer_label(&self) -> String {
        self.label.clone()
    }
}
