//! Registry error types
//!
//! The registry only fails on caller misuse. Remote peer failures never
//! surface here; dead subscribers are pruned silently.

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Topic name is empty, too long, or contains whitespace/control characters
    #[error("invalid topic name {name:?}: {reason}")]
    InvalidTopicName { name: String, reason: &'static str },
}
