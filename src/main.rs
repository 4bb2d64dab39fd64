//! pobesob broker binary
//!
//! Binds the publisher and subscriber listeners and runs the broker until
//! Ctrl-C.
//!
//! ```text
//! pobesob --publisher-addr 0.0.0.0:7070 --subscriber-addr 0.0.0.0:7071
//! printf 'SUB weather\n' | nc -q -1 localhost 7071
//! printf 'PUB weather 5\nhello' | nc -q 0 localhost 7070
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pobesob::protocol::constants::DEFAULT_MAX_PAYLOAD_SIZE;
use pobesob::{Broker, BrokerConfig, DeliveryFraming};

#[derive(Debug, Parser)]
#[command(name = "pobesob", version, about = "Two-port TCP publish/subscribe broker")]
struct Args {
    /// Address publishers connect to
    #[arg(long, env = "POBESOB_PUBLISHER_ADDR", default_value = "0.0.0.0:7070")]
    publisher_addr: SocketAddr,

    /// Address subscribers connect to
    #[arg(long, env = "POBESOB_SUBSCRIBER_ADDR", default_value = "0.0.0.0:7071")]
    subscriber_addr: SocketAddr,

    /// Maximum concurrent connections across both ports (0 = unlimited)
    #[arg(long, env = "POBESOB_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Largest accepted publish payload in bytes
    #[arg(long, env = "POBESOB_MAX_PAYLOAD_SIZE", default_value_t = DEFAULT_MAX_PAYLOAD_SIZE)]
    max_payload_size: usize,

    /// Per-write delivery timeout before a subscriber is dropped
    #[arg(long, env = "POBESOB_SEND_TIMEOUT_MS", default_value_t = 2000)]
    send_timeout_ms: u64,

    /// Time a subscriber has to send its SUB frame
    #[arg(long, env = "POBESOB_SUBSCRIBE_TIMEOUT_MS", default_value_t = 10_000)]
    subscribe_timeout_ms: u64,

    /// Deliveries buffered per subscriber before it counts as slow
    #[arg(long, env = "POBESOB_QUEUE_CAPACITY", default_value_t = 64)]
    queue_capacity: usize,

    /// Prefix each delivery with a 4-byte big-endian length
    #[arg(long, env = "POBESOB_LENGTH_PREFIXED")]
    length_prefixed: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "POBESOB_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn broker_config(&self) -> BrokerConfig {
        let framing = if self.length_prefixed {
            DeliveryFraming::LengthPrefixed
        } else {
            DeliveryFraming::Raw
        };

        BrokerConfig::with_addrs(self.publisher_addr, self.subscriber_addr)
            .max_connections(self.max_connections)
            .max_payload_size(self.max_payload_size)
            .send_timeout(Duration::from_millis(self.send_timeout_ms))
            .subscribe_timeout(Duration::from_millis(self.subscribe_timeout_ms))
            .subscriber_queue_capacity(self.queue_capacity)
            .delivery_framing(framing)
    }
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    if let Err(e) = run(args.broker_config()).await {
        error!(error = %e, "Broker failed");
        std::process::exit(1);
    }
}

async fn run(config: BrokerConfig) -> pobesob::Result<()> {
    let publishers = TcpListener::bind(config.publisher_addr).await?;
    let subscribers = TcpListener::bind(config.subscriber_addr).await?;

    let broker = Broker::new(config);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let result = broker.run_until(publishers, subscribers, shutdown).await;

    let stats = broker.stats().snapshot();
    info!(
        publishers = stats.publisher_connections,
        subscribers = stats.subscriber_connections,
        rejected = stats.rejected_connections,
        published = stats.messages_published,
        delivered = stats.messages_delivered,
        pruned = stats.subscribers_pruned,
        protocol_errors = stats.protocol_errors,
        topics = broker.registry().topic_count().await,
        "Broker stopped"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["pobesob"]).unwrap();
        let config = args.broker_config();

        assert_eq!(config.publisher_addr.port(), 7070);
        assert_eq!(config.subscriber_addr.port(), 7071);
        assert_eq!(config.delivery_framing, DeliveryFraming::Raw);
        assert_eq!(config.send_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_args_override() {
        let args = Args::try_parse_from([
            "pobesob",
            "--publisher-addr",
            "127.0.0.1:9000",
            "--queue-capacity",
            "8",
            "--length-prefixed",
            "--send-timeout-ms",
            "250",
        ])
        .unwrap();
        let config = args.broker_config();

        assert_eq!(config.publisher_addr.port(), 9000);
        assert_eq!(config.subscriber_queue_capacity, 8);
        assert_eq!(config.delivery_framing, DeliveryFraming::LengthPrefixed);
        assert_eq!(config.send_timeout, Duration::from_millis(250));
    }
}
