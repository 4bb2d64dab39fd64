//! # pobesob
//!
//! A minimal publish/subscribe broker over TCP.
//!
//! Publishers connect to one port and send `PUB <topic> <len>\n<payload>`
//! frames. Subscribers connect to another port, send `SUB <topic>\n`, and
//! receive the payload of every later publish to that topic.
//!
//! ```no_run
//! use pobesob::{Broker, BrokerConfig};
//! use tokio::net::TcpListener;
//!
//! # async fn example() -> pobesob::Result<()> {
//! let config = BrokerConfig::default();
//! let publishers = TcpListener::bind(config.publisher_addr).await?;
//! let subscribers = TcpListener::bind(config.subscriber_addr).await?;
//!
//! let broker = Broker::new(config);
//! broker.start(publishers, subscribers).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Modules:
//! - `protocol`: frame parser, async frame reader, delivery framing
//! - `registry`: topics, subscriber handles, fan-out
//! - `server`: broker accept loops and connection handlers
//! - `session`: per-connection state machine
//! - `stats`: broker counters
//! - `client`: publisher and subscriber helpers

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::DeliveryFraming;
pub use registry::{RegistryError, SubscriberHandle, TopicRegistry};
pub use server::{Broker, BrokerConfig, Role};
pub use stats::StatsSnapshot;
