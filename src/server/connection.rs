//! Per-connection handlers
//!
//! One `Connection` per accepted socket. Publisher connections loop reading
//! `PUB` frames and routing them through the registry. Subscriber connections
//! join topics, then write queued deliveries while reading only to notice
//! disconnects or further `SUB` frames.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::protocol::{encode_delivery, Frame, FrameReader, ProtocolError};
use crate::registry::{SubscriberHandle, TopicRegistry};
use crate::server::config::BrokerConfig;
use crate::server::Role;
use crate::session::SessionState;

/// A single accepted connection and its session state
pub struct Connection {
    state: SessionState,
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    config: BrokerConfig,
    registry: Arc<TopicRegistry>,
    shutdown: watch::Receiver<bool>,
}

impl Connection {
    /// Create a connection handler for an accepted socket
    pub fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        role: Role,
        config: BrokerConfig,
        registry: Arc<TopicRegistry>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (read_half, write_half) = socket.into_split();

        Self {
            state: SessionState::new(session_id, peer_addr, role),
            reader: FrameReader::new(read_half, config.max_payload_size),
            writer: write_half,
            config,
            registry,
            shutdown,
        }
    }

    /// Session state (phase, topics, counters)
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drive the connection until the peer leaves, breaks protocol, or the
    /// broker shuts down
    pub async fn run(&mut self) -> Result<()> {
        let result = match self.state.role {
            Role::Publisher => self.run_publisher().await,
            Role::Subscriber => self.run_subscriber().await,
        };
        self.state.close();
        result
    }

    async fn run_publisher(&mut self) -> Result<()> {
        loop {
            self.state.begin_read();

            let frame = tokio::select! {
                frame = self.reader.read_frame() => frame?,
                _ = shutdown_signal(&mut self.shutdown) => return Ok(()),
            };

            match frame {
                None => return Ok(()),
                Some(Frame::Publish { topic, payload }) => {
                    self.state.begin_publish(payload.len());
                    let delivered = self.registry.publish(&topic, payload).await?;

                    tracing::trace!(
                        session_id = self.state.id,
                        topic = %topic,
                        delivered = delivered,
                        "Publish routed"
                    );
                }
                Some(frame) => return Err(unexpected(&frame, Role::Publisher)),
            }
        }
    }

    async fn run_subscriber(&mut self) -> Result<()> {
        let (handle, mut queue) =
            SubscriberHandle::channel(self.state.id, self.config.subscriber_queue_capacity);

        let result = self.serve_subscriber(&handle, &mut queue).await;

        // Teardown runs exactly once, whatever ended the session
        handle.close();
        let removed = self.registry.unsubscribe_all(&handle).await;

        tracing::debug!(
            session_id = self.state.id,
            topics = removed,
            delivered = self.state.messages_delivered,
            "Subscriber removed from registry"
        );

        result
    }

    async fn serve_subscriber(
        &mut self,
        handle: &SubscriberHandle,
        queue: &mut mpsc::Receiver<Bytes>,
    ) -> Result<()> {
        self.state.await_topic();

        let subscribe_timeout = self.config.subscribe_timeout;
        let first = tokio::select! {
            frame = timeout(subscribe_timeout, self.reader.read_frame()) => {
                frame.map_err(|_| ProtocolError::SubscribeTimeout(subscribe_timeout))??
            }
            _ = shutdown_signal(&mut self.shutdown) => return Ok(()),
        };

        match first {
            None => return Ok(()),
            Some(Frame::Subscribe { topic }) => self.join(&topic, handle).await?,
            Some(frame) => return Err(unexpected(&frame, Role::Subscriber)),
        }

        loop {
            tokio::select! {
                payload = queue.recv() => match payload {
                    Some(payload) => self.deliver(payload).await?,
                    None => return Err(Error::SlowSubscriber),
                },
                frame = self.reader.read_frame() => match frame? {
                    None => return Ok(()),
                    Some(Frame::Subscribe { topic }) => self.join(&topic, handle).await?,
                    Some(frame) => return Err(unexpected(&frame, Role::Subscriber)),
                },
                _ = handle.closed() => return Err(Error::SlowSubscriber),
                _ = shutdown_signal(&mut self.shutdown) => return Ok(()),
            }
        }
    }

    async fn join(&mut self, topic: &str, handle: &SubscriberHandle) -> Result<()> {
        self.registry.subscribe(topic, handle).await?;
        self.state.on_subscribed(topic);
        Ok(())
    }

    async fn deliver(&mut self, payload: Bytes) -> Result<()> {
        let data = encode_delivery(self.config.delivery_framing, &payload);

        match timeout(self.config.send_timeout, self.writer.write_all(&data)).await {
            Ok(Ok(())) => {
                self.state.on_delivered(payload.len());
                Ok(())
            }
            Ok(Err(e)) => Err(Error::ConnectionLost(e)),
            Err(_) => Err(Error::ConnectionLost(io::Error::new(
                io::ErrorKind::TimedOut,
                "delivery write timed out",
            ))),
        }
    }
}

fn unexpected(frame: &Frame, role: Role) -> Error {
    ProtocolError::UnexpectedFrame {
        frame: frame.kind(),
        role: role.as_str(),
    }
    .into()
}

/// Resolves when the broker signals shutdown or is dropped
async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}
