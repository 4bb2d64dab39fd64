//! Subscriber handles
//!
//! A handle is the registry's view of one subscriber connection: an id, the
//! sending side of the connection's bounded delivery queue, and a liveness
//! flag shared with the connection task. Clones are cheap and all refer to
//! the same connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};

/// Outcome of offering a payload to a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Payload queued for the connection's writer
    Queued,
    /// Queue full: the subscriber is not keeping up
    Full,
    /// Handle closed or connection task gone
    Closed,
}

#[derive(Debug)]
struct HandleState {
    alive: AtomicBool,
    closed: Notify,
}

/// Write-capable endpoint for one subscriber connection
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: u64,
    tx: mpsc::Sender<Bytes>,
    state: Arc<HandleState>,
}

impl SubscriberHandle {
    /// Create a handle and the receiving end of its delivery queue
    ///
    /// `capacity` is clamped to at least 1.
    pub fn channel(id: u64, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id,
            tx,
            state: Arc::new(HandleState {
                alive: AtomicBool::new(true),
                closed: Notify::new(),
            }),
        };
        (handle, rx)
    }

    /// Unique id (the connection's session id)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection can still take deliveries
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Queue a payload without waiting
    pub fn offer(&self, payload: Bytes) -> Offer {
        if !self.state.alive.load(Ordering::Acquire) {
            return Offer::Closed;
        }
        match self.tx.try_send(payload) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(_)) => Offer::Full,
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Mark the handle dead and wake the connection task
    ///
    /// Returns true for the call that actually closed it.
    pub fn close(&self) -> bool {
        let was_alive = self.state.alive.swap(false, Ordering::AcqRel);
        if was_alive {
            self.state.closed.notify_one();
        }
        was_alive
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        if !self.state.alive.load(Ordering::Acquire) {
            return;
        }
        self.state.closed.notified().await;
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriberHandle {}
