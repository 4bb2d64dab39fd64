//! Broker configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::{DEFAULT_MAX_PAYLOAD_SIZE, MAX_PAYLOAD_LIMIT};
use crate::protocol::DeliveryFraming;

/// Broker configuration options
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Address of the publisher-facing listener (used by the bootstrap binary)
    pub publisher_addr: SocketAddr,

    /// Address of the subscriber-facing listener (used by the bootstrap binary)
    pub subscriber_addr: SocketAddr,

    /// Maximum concurrent connections across both ports (0 = unlimited)
    pub max_connections: usize,

    /// Largest accepted publish payload in bytes
    pub max_payload_size: usize,

    /// Bound on each write of a delivery to a subscriber socket
    pub send_timeout: Duration,

    /// Time a subscriber has to send its `SUB` frame
    pub subscribe_timeout: Duration,

    /// Deliveries buffered per subscriber before it counts as slow
    pub subscriber_queue_capacity: usize,

    /// Framing of payloads written to subscribers
    pub delivery_framing: DeliveryFraming,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            publisher_addr: SocketAddr::from(([0, 0, 0, 0], 7070)),
            subscriber_addr: SocketAddr::from(([0, 0, 0, 0], 7071)),
            max_connections: 0, // Unlimited
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            send_timeout: Duration::from_secs(2),
            subscribe_timeout: Duration::from_secs(10),
            subscriber_queue_capacity: 64,
            delivery_framing: DeliveryFraming::Raw,
            tcp_nodelay: true,
        }
    }
}

impl BrokerConfig {
    /// Create a new config with custom listener addresses
    pub fn with_addrs(publisher_addr: SocketAddr, subscriber_addr: SocketAddr) -> Self {
        Self {
            publisher_addr,
            subscriber_addr,
            ..Default::default()
        }
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set maximum payload size, capped at `MAX_PAYLOAD_LIMIT`
    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size.min(MAX_PAYLOAD_LIMIT);
        self
    }

    /// Set per-write delivery timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set subscribe timeout
    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    /// Set per-subscriber queue capacity (minimum 1)
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity.max(1);
        self
    }

    /// Set delivery framing
    pub fn delivery_framing(mut self, framing: DeliveryFraming) -> Self {
        self.delivery_framing = framing;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();

        assert_eq!(config.publisher_addr.port(), 7070);
        assert_eq!(config.subscriber_addr.port(), 7071);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.max_payload_size, 64 * 1024);
        assert_eq!(config.send_timeout, Duration::from_secs(2));
        assert_eq!(config.subscriber_queue_capacity, 64);
        assert_eq!(config.delivery_framing, DeliveryFraming::Raw);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addrs() {
        let publisher: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let subscriber: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let config = BrokerConfig::with_addrs(publisher, subscriber);

        assert_eq!(config.publisher_addr, publisher);
        assert_eq!(config.subscriber_addr, subscriber);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_builder_queue_capacity_floor() {
        let config = BrokerConfig::default().subscriber_queue_capacity(0);

        assert_eq!(config.subscriber_queue_capacity, 1);
    }

    #[test]
    fn test_builder_payload_size_cap() {
        let config = BrokerConfig::default().max_payload_size(usize::MAX);

        assert_eq!(config.max_payload_size, MAX_PAYLOAD_LIMIT);
    }

    #[test]
    fn test_builder_chaining() {
        let config = BrokerConfig::default()
            .max_connections(50)
            .max_payload_size(1024)
            .send_timeout(Duration::from_millis(250))
            .subscribe_timeout(Duration::from_secs(1))
            .delivery_framing(DeliveryFraming::LengthPrefixed)
            .tcp_nodelay(false);

        assert_eq!(config.max_connections, 50);
        assert_eq!(config.max_payload_size, 1024);
        assert_eq!(config.send_timeout, Duration::from_millis(250));
        assert_eq!(config.subscribe_timeout, Duration::from_secs(1));
        assert_eq!(config.delivery_framing, DeliveryFraming::LengthPrefixed);
        assert!(!config.tcp_nodelay);
    }
}
