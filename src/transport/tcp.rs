use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::config::MAX_FRAME_LEN;
use crate::protocol::{read_frame, write_frame, Message, ProtocolError};
use crate::transport::Transport;

/// Default timeout for writing one frame (30 seconds). Reads are not bounded
/// here; the session applies its own move-timeout policy.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
    send_timeout: Duration,
    max_frame_len: u32,
    closed: bool,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_config(stream, DEFAULT_SEND_TIMEOUT, MAX_FRAME_LEN)
    }

    pub fn with_config(stream: TcpStream, send_timeout: Duration, max_frame_len: u32) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown peer".to_string());
        Self {
            stream,
            peer,
            send_timeout,
            max_frame_len,
            closed: false,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, msg: &Message) -> Result<(), ProtocolError> {
        if self.closed {
            return Err(ProtocolError::Closed);
        }
        match timeout(self.send_timeout, write_frame(&mut self.stream, msg)).await {
            Ok(result) => result,
            Err(_) => Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("send timeout after {:?}", self.send_timeout),
            ))),
        }
    }

    async fn recv(&mut self) -> Result<Option<Message>, ProtocolError> {
        if self.closed {
            return Ok(None);
        }
        read_frame(&mut self.stream, self.max_frame_len).await
    }

    async fn is_open(&mut self) -> bool {
        if self.closed {
            return false;
        }
        // Zero-wait peek: pending data or nothing to read both mean the peer
        // is still there; EOF or a socket error means it is gone.
        let mut probe = [0u8; 1];
        match timeout(Duration::ZERO, self.stream.peek(&mut probe)).await {
            Ok(Ok(0)) | Ok(Err(_)) => false,
            Ok(Ok(_)) | Err(_) => true,
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.stream.shutdown().await;
        }
    }

    fn peer_label(&self) -> String {
        self.peer.clone()
    }
}
