//! Async frame reader and delivery encoding

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::constants::{DELIVERY_PREFIX_LEN, MAX_PAYLOAD_LIMIT, READ_BUFFER_SIZE};
use super::error::ProtocolError;
use super::frame::{parse_frame, Frame};
use crate::error::{Error, Result};

/// How payloads are written to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryFraming {
    /// Payload bytes only
    #[default]
    Raw,
    /// 4-byte big-endian length, then the payload
    LengthPrefixed,
}

/// Encode one delivery for the wire
///
/// `Raw` returns the payload itself without copying.
pub fn encode_delivery(framing: DeliveryFraming, payload: &Bytes) -> Bytes {
    match framing {
        DeliveryFraming::Raw => payload.clone(),
        DeliveryFraming::LengthPrefixed => {
            let mut buf = BytesMut::with_capacity(DELIVERY_PREFIX_LEN + payload.len());
            // Payloads are bounded by MAX_PAYLOAD_LIMIT when read
            buf.put_u32(payload.len() as u32);
            buf.put_slice(payload);
            buf.freeze()
        }
    }
}

/// Reads frames from a byte stream
///
/// `read_frame` is cancel safe: bytes already read stay in the internal
/// buffer, so it can be used as a `tokio::select!` branch.
pub struct FrameReader<R> {
    inner: R,
    buffer: BytesMut,
    max_payload: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a reader, accepting payloads up to `max_payload` bytes
    ///
    /// The limit is capped at `MAX_PAYLOAD_LIMIT` so every accepted payload
    /// fits a length-prefixed delivery.
    pub fn new(inner: R, max_payload: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            max_payload: max_payload.min(MAX_PAYLOAD_LIMIT),
        }
    }

    /// Read the next frame
    ///
    /// Returns `Ok(None)` on a clean EOF between frames. EOF inside a frame
    /// is `ProtocolError::Truncated`; read failures are `ConnectionLost`.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = parse_frame(&mut self.buffer, self.max_payload)? {
                return Ok(Some(frame));
            }

            if self.buffer.capacity() == self.buffer.len() {
                self.buffer.reserve(READ_BUFFER_SIZE);
            }

            let n = self
                .inner
                .read_buf(&mut self.buffer)
                .await
                .map_err(Error::ConnectionLost)?;

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ProtocolError::Truncated {
                    buffered: self.buffer.len(),
                }
                .into());
            }
        }
    }
}
