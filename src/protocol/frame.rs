//! Length-prefixed framing: a 4-byte big-endian payload length, then a JSON
//! encoded [`Message`]. The codec is stateless between calls.

use core::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::MAX_FRAME_LEN;
use crate::protocol::Message;

/// Fatal wire-level failures. Any of these ends the connection.
#[derive(Debug)]
pub enum ProtocolError {
    /// The peer closed the stream part-way through a frame.
    Truncated { expected: usize, received: usize },
    /// The length prefix exceeds the configured cap.
    TooLarge { len: u32, max: u32 },
    /// The payload is not a valid message.
    Malformed(String),
    /// The peer is gone; nothing more can be sent.
    Closed,
    Io(io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated { expected, received } => write!(
                f,
                "Connection closed mid-frame: expected {} bytes, received {}",
                expected, received
            ),
            ProtocolError::TooLarge { len, max } => {
                write!(f, "Frame too large: {} bytes (max: {})", len, max)
            }
            ProtocolError::Malformed(reason) => write!(f, "Malformed frame: {}", reason),
            ProtocolError::Closed => write!(f, "Connection closed by peer"),
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => ProtocolError::Closed,
            _ => ProtocolError::Io(e),
        }
    }
}

/// Serialize `msg` and prepend its length.
pub fn encode_frame(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(msg).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    if payload.len() > MAX_FRAME_LEN as usize {
        return Err(ProtocolError::TooLarge {
            len: u32::try_from(payload.len()).unwrap_or(u32::MAX),
            max: MAX_FRAME_LEN,
        });
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Parse a frame payload (without its length prefix).
pub fn decode_frame(payload: &[u8]) -> Result<Message, ProtocolError> {
    serde_json::from_slice(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Read one frame. Returns `Ok(None)` when the stream ends cleanly on a
/// frame boundary; an end inside the prefix or payload is `Truncated`.
pub async fn read_frame<R>(reader: &mut R, max_len: u32) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = match reader.read(&mut len_buf[filled..]).await {
            Ok(n) => n,
            // A reset before any byte of a new frame is just a disconnect.
            Err(e) if filled == 0 && e.kind() == io::ErrorKind::ConnectionReset => 0,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProtocolError::Truncated {
                expected: len_buf.len(),
                received: filled,
            });
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf);
    if len == 0 {
        return Err(ProtocolError::Malformed("empty frame".into()));
    }
    if len > max_len {
        return Err(ProtocolError::TooLarge { len, max: max_len });
    }

    let mut buf = vec![0u8; len as usize];
    let mut received = 0;
    while received < buf.len() {
        let n = match reader.read(&mut buf[received..]).await {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => 0,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Err(ProtocolError::Truncated {
                expected: buf.len(),
                received,
            });
        }
        received += n;
    }
    decode_frame(&buf).map(Some)
}

/// Encode `msg`, write it and flush.
pub async fn write_frame<W>(writer: &mut W, msg: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_frame(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
