//! Session state machine
//!
//! Tracks a connection from accept to close.
//!
//! ```text
//! subscriber: Connected ─► AwaitingTopic ─► Subscribed ─► Closed
//! publisher:  Connected ─► ReadingFrame ⇄ Publishing
//!                                │
//!                                └──────► Closed
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::server::Role;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP connection accepted
    Connected,
    /// Subscriber waiting for its `SUB` frame
    AwaitingTopic,
    /// Subscriber joined at least one topic
    Subscribed,
    /// Publisher waiting for the next frame
    ReadingFrame,
    /// Publisher routing a frame through the registry
    Publishing,
    /// Session closed
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Which listener accepted the connection
    pub role: Role,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Topics joined (subscriber sessions only)
    pub topics: Vec<String>,

    /// Frames read from the peer (`PUB` for publishers, `SUB` for subscribers)
    pub frames_received: u64,

    /// Payloads written to the peer
    pub messages_delivered: u64,

    /// Payload bytes read or written
    pub payload_bytes: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr, role: Role) -> Self {
        Self {
            id,
            peer_addr,
            role,
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            topics: Vec::new(),
            frames_received: 0,
            messages_delivered: 0,
            payload_bytes: 0,
        }
    }

    /// Subscriber: start waiting for the subscribe frame
    pub fn await_topic(&mut self) {
        if self.role == Role::Subscriber && self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::AwaitingTopic;
        }
    }

    /// Subscriber: a subscribe frame was accepted
    ///
    /// Only valid from `AwaitingTopic` or `Subscribed`.
    pub fn on_subscribed(&mut self, topic: &str) {
        if matches!(
            self.phase,
            SessionPhase::AwaitingTopic | SessionPhase::Subscribed
        ) {
            self.phase = SessionPhase::Subscribed;
            self.frames_received += 1;
            if !self.topics.iter().any(|t| t == topic) {
                self.topics.push(topic.to_string());
            }
        }
    }

    /// Publisher: wait for the next frame
    pub fn begin_read(&mut self) {
        if self.role == Role::Publisher
            && matches!(
                self.phase,
                SessionPhase::Connected | SessionPhase::Publishing
            )
        {
            self.phase = SessionPhase::ReadingFrame;
        }
    }

    /// Publisher: a publish frame was read
    pub fn begin_publish(&mut self, payload_len: usize) {
        if self.phase == SessionPhase::ReadingFrame {
            self.phase = SessionPhase::Publishing;
            self.frames_received += 1;
            self.payload_bytes += payload_len as u64;
        }
    }

    /// Subscriber: a payload was written to the socket
    pub fn on_delivered(&mut self, payload_len: usize) {
        self.messages_delivered += 1;
        self.payload_bytes += payload_len as u64;
    }

    /// Close the session
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Check if the subscriber has joined a topic
    pub fn is_subscribed(&self) -> bool {
        self.phase == SessionPhase::Subscribed
    }

    /// Check if the session is closed
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
