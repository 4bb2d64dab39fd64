//! Topic registry for pub/sub routing
//!
//! The registry maps topic names to topics and fans payloads out from
//! publishers to subscriber handles.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<TopicRegistry>
//!                     ┌──────────────────────────┐
//!                     │ topics: HashMap<String,  │
//!                     │   Arc<RwLock<Topic {     │
//!                     │     subscribers,         │
//!                     │   }>>                    │
//!                     │ >                        │
//!                     └────────────┬─────────────┘
//!                                  │
//!         ┌────────────────────────┼───────────────────────┐
//!         │                        │                       │
//!         ▼                        ▼                       ▼
//!    [Publisher]             [Subscriber]            [Subscriber]
//!    read_frame()            queue.recv()            queue.recv()
//!         │                        │                       │
//!         └──► registry.publish() ─► try_send() ──► write ──► TCP
//! ```
//!
//! # Backpressure
//!
//! `publish` never waits on a subscriber. Each handle owns a bounded queue;
//! a full or closed queue gets the subscriber closed and pruned
//! (drop-slow-subscriber). Payloads are `bytes::Bytes`, so every queue shares
//! the publisher's allocation.

pub mod error;
pub mod handle;
pub mod store;
pub mod topic;

pub use error::RegistryError;
pub use handle::{Offer, SubscriberHandle};
pub use store::TopicRegistry;
pub use topic::{validate_topic_name, Topic};
