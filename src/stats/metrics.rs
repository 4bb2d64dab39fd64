//! Counters for broker activity
//!
//! All counters are monotonic `AtomicU64`s updated with relaxed ordering;
//! a snapshot is not a consistent cut across counters.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::server::Role;

/// Shared broker-wide counters
#[derive(Debug, Default)]
pub struct BrokerStats {
    publisher_connections: AtomicU64,
    subscriber_connections: AtomicU64,
    rejected_connections: AtomicU64,
    messages_published: AtomicU64,
    messages_delivered: AtomicU64,
    subscribers_pruned: AtomicU64,
    protocol_errors: AtomicU64,
}

impl BrokerStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connection_accepted(&self, role: Role) {
        let counter = match role {
            Role::Publisher => &self.publisher_connections,
            Role::Subscriber => &self.subscriber_connections,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn message_published(&self, delivered: usize) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.messages_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub(crate) fn subscriber_pruned(&self) {
        self.subscribers_pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            publisher_connections: self.publisher_connections.load(Ordering::Relaxed),
            subscriber_connections: self.subscriber_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            subscribers_pruned: self.subscribers_pruned.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `BrokerStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Publisher connections accepted
    pub publisher_connections: u64,
    /// Subscriber connections accepted
    pub subscriber_connections: u64,
    /// Connections dropped at accept because of the connection limit
    pub rejected_connections: u64,
    /// Publish frames routed (including those with no subscribers)
    pub messages_published: u64,
    /// Payloads queued to subscribers
    pub messages_delivered: u64,
    /// Subscribers dropped for being closed or too slow
    pub subscribers_pruned: u64,
    /// Connections closed for protocol violations
    pub protocol_errors: u64,
}

impl StatsSnapshot {
    /// Average fan-out per published message
    pub fn fan_out(&self) -> f64 {
        if self.messages_published > 0 {
            self.messages_delivered as f64 / self.messages_published as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = BrokerStats::new();

        stats.connection_accepted(Role::Publisher);
        stats.connection_accepted(Role::Subscriber);
        stats.connection_accepted(Role::Subscriber);
        stats.connection_rejected();
        stats.message_published(3);
        stats.message_published(0);
        stats.subscriber_pruned();
        stats.protocol_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.publisher_connections, 1);
        assert_eq!(snapshot.subscriber_connections, 2);
        assert_eq!(snapshot.rejected_connections, 1);
        assert_eq!(snapshot.messages_published, 2);
        assert_eq!(snapshot.messages_delivered, 3);
        assert_eq!(snapshot.subscribers_pruned, 1);
        assert_eq!(snapshot.protocol_errors, 1);
        assert_eq!(snapshot.fan_out(), 1.5);
    }

    #[test]
    fn test_fan_out_without_messages() {
        assert_eq!(StatsSnapshot::default().fan_out(), 0.0);
    }
}
