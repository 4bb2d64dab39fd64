//! Subscriber client

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{Error, Result};
use crate::protocol::constants::{DELIVERY_PREFIX_LEN, READ_BUFFER_SIZE};
use crate::protocol::{DeliveryFraming, Frame};
use crate::registry::validate_topic_name;

/// Connection to a broker's subscriber port
///
/// The framing must match the broker's `delivery_framing` setting. Raw
/// deliveries carry no boundaries, so `read_exact_bytes` is the usual way to
/// consume them when the expected size is known.
pub struct SubscriberClient {
    stream: TcpStream,
    framing: DeliveryFraming,
    buffer: BytesMut,
}

impl SubscriberClient {
    /// Connect to the subscriber port and join `topic` (raw deliveries)
    pub async fn connect(addr: impl ToSocketAddrs, topic: &str) -> Result<Self> {
        Self::connect_with_framing(addr, topic, DeliveryFraming::Raw).await
    }

    /// Connect and join `topic`, expecting the given delivery framing
    pub async fn connect_with_framing(
        addr: impl ToSocketAddrs,
        topic: &str,
        framing: DeliveryFraming,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let mut client = Self {
            stream,
            framing,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        };
        client.subscribe(topic).await?;
        Ok(client)
    }

    /// Join another topic on the same connection
    pub async fn subscribe(&mut self, topic: &str) -> Result<()> {
        validate_topic_name(topic)?;
        self.stream
            .write_all(&Frame::subscribe(topic).encode())
            .await?;
        Ok(())
    }

    /// Read exactly `len` delivered bytes
    pub async fn read_exact_bytes(&mut self, len: usize) -> Result<Bytes> {
        while self.buffer.len() < len {
            self.fill().await?;
        }
        Ok(self.buffer.split_to(len).freeze())
    }

    /// Receive the next delivery
    ///
    /// With `LengthPrefixed` framing this is exactly one published message.
    /// With `Raw` framing it is whatever delivered bytes are available, which
    /// may split or join messages. Returns `Ok(None)` when the broker closes
    /// the connection between messages.
    pub async fn recv_message(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(message) = self.take_message() {
                return Ok(Some(message));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(Error::ConnectionLost(io::Error::from(
                    io::ErrorKind::UnexpectedEof,
                )));
            }
        }
    }

    /// Wait until the broker closes the connection, discarding any data
    ///
    /// Returns the number of bytes discarded.
    pub async fn wait_closed(&mut self) -> Result<usize> {
        let mut discarded = self.buffer.len();
        self.buffer.clear();
        loop {
            match self.stream.read_buf(&mut self.buffer).await {
                Ok(0) => return Ok(discarded),
                Ok(n) => {
                    discarded += n;
                    self.buffer.clear();
                }
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => return Ok(discarded),
                Err(e) => return Err(Error::ConnectionLost(e)),
            }
        }
    }

    fn take_message(&mut self) -> Option<Bytes> {
        match self.framing {
            DeliveryFraming::Raw if self.buffer.is_empty() => None,
            DeliveryFraming::Raw => Some(self.buffer.split().freeze()),
            DeliveryFraming::LengthPrefixed => {
                if self.buffer.len() < DELIVERY_PREFIX_LEN {
                    return None;
                }
                let len = u32::from_be_bytes([
                    self.buffer[0],
                    self.buffer[1],
                    self.buffer[2],
                    self.buffer[3],
                ]) as usize;

                if self.buffer.len() < DELIVERY_PREFIX_LEN + len {
                    return None;
                }
                self.buffer.advance(DELIVERY_PREFIX_LEN);
                Some(self.buffer.split_to(len).freeze())
            }
        }
    }

    async fn fill(&mut self) -> Result<()> {
        if self.buffer.capacity() == self.buffer.len() {
            self.buffer.reserve(READ_BUFFER_SIZE);
        }
        let n = self.stream.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(Error::ConnectionLost(io::Error::from(
                io::ErrorKind::UnexpectedEof,
            )));
        }
        Ok(())
    }
}
