//! Broker server
//!
//! Two accept loops, one per port. The listener a connection arrived on
//! decides its role for the life of the connection.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::BrokerConfig;
pub use listener::Broker;

use std::fmt;

/// Connection role, fixed by the accepting listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends `PUB` frames, never receives
    Publisher,
    /// Sends `SUB` frames, receives deliveries
    Subscriber,
}

impl Role {
    /// Lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publisher => "publisher",
            Role::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
