//! Topic state and name validation

use std::collections::HashMap;

use super::error::RegistryError;
use super::handle::SubscriberHandle;
use crate::protocol::constants::MAX_TOPIC_LEN;

/// Check that `name` can be used as a topic
///
/// Names are case-sensitive, non-empty, at most `MAX_TOPIC_LEN` bytes and
/// free of whitespace and control characters (the wire format is space and
/// newline delimited).
pub fn validate_topic_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        "empty"
    } else if name.len() > MAX_TOPIC_LEN {
        "too long"
    } else if name.chars().any(char::is_whitespace) {
        "contains whitespace"
    } else if name.chars().any(char::is_control) {
        "contains control characters"
    } else {
        return Ok(());
    };

    Err(RegistryError::InvalidTopicName {
        name: name.to_string(),
        reason,
    })
}

/// A named topic and its current subscribers
///
/// Subscribers are keyed by handle id, so the set never holds the same
/// connection twice.
#[derive(Debug)]
pub struct Topic {
    name: String,
    subscribers: HashMap<u64, SubscriberHandle>,
}

impl Topic {
    pub(super) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: HashMap::new(),
        }
    }

    /// Topic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of subscribers currently in the set
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Add a subscriber; returns false if it was already present
    pub(super) fn add(&mut self, handle: &SubscriberHandle) -> bool {
        if self.subscribers.contains_key(&handle.id()) {
            return false;
        }
        self.subscribers.insert(handle.id(), handle.clone());
        true
    }

    /// Remove a subscriber; returns false if it was not present
    pub(super) fn remove(&mut self, id: u64) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub(super) fn subscribers(&self) -> impl Iterator<Item = &SubscriberHandle> {
        self.subscribers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["weather", "Weather", "a", "sensors/kitchen/temp", "ünïcode"] {
            assert!(validate_topic_name(name).is_ok(), "{name} should be valid");
        }
        assert!(validate_topic_name(&"x".repeat(MAX_TOPIC_LEN)).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        let cases = [
            ("", "empty"),
            ("two words", "contains whitespace"),
            ("tab\there", "contains whitespace"),
            ("bell\u{7}", "contains control characters"),
        ];
        for (name, expected) in cases {
            match validate_topic_name(name) {
                Err(RegistryError::InvalidTopicName { reason, .. }) => assert_eq!(reason, expected),
                other => panic!("{name:?} gave {other:?}"),
            }
        }
        assert!(validate_topic_name(&"x".repeat(MAX_TOPIC_LEN + 1)).is_err());
    }

    #[test]
    fn test_add_is_idempotent() {
        let (handle, _rx) = SubscriberHandle::channel(7, 4);
        let mut topic = Topic::new("weather");

        assert!(topic.add(&handle));
        assert!(!topic.add(&handle));
        assert_eq!(topic.subscriber_count(), 1);
        assert!(topic.subscribers().any(|h| h.id() == 7));

        assert!(topic.remove(7));
        assert!(!topic.remove(7));
        assert_eq!(topic.subscriber_count(), 0);
    }
}
