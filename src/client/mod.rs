//! Client helpers
//!
//! Small async clients for the two broker ports:
//! - `PublisherClient` sends `PUB` frames
//! - `SubscriberClient` joins topics and reads deliveries

pub mod publisher;
pub mod subscriber;

pub use publisher::PublisherClient;
pub use subscriber::SubscriberClient;
