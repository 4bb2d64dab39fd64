//! Topic registry implementation
//!
//! The central registry that owns every topic and routes payloads from
//! publishers to the subscribers of a topic.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

use super::error::RegistryError;
use super::handle::{Offer, SubscriberHandle};
use super::topic::{validate_topic_name, Topic};
use crate::stats::BrokerStats;

/// Central registry for all topics
///
/// The outer map lock is only held for lookup and insertion. Each topic has
/// its own lock; `publish` holds it while queueing to subscribers, which
/// fixes the per-topic delivery order. No lock is held across socket I/O.
pub struct TopicRegistry {
    /// Map of topic name to topic
    topics: RwLock<HashMap<String, Arc<RwLock<Topic>>>>,

    /// Counters shared with the broker
    stats: Arc<BrokerStats>,
}

impl TopicRegistry {
    /// Create an empty registry with its own counters
    pub fn new() -> Self {
        Self::with_stats(Arc::new(BrokerStats::new()))
    }

    /// Create an empty registry reporting into `stats`
    pub fn with_stats(stats: Arc<BrokerStats>) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            stats,
        }
    }

    /// Get the counters this registry updates
    pub fn stats(&self) -> &Arc<BrokerStats> {
        &self.stats
    }

    /// Get the topic for `name`, creating it if absent
    ///
    /// Two concurrent callers for the same new name always get the same
    /// topic instance.
    pub async fn get_or_create(&self, name: &str) -> Result<Arc<RwLock<Topic>>, RegistryError> {
        validate_topic_name(name)?;

        {
            let topics = self.topics.read().await;
            if let Some(topic) = topics.get(name) {
                return Ok(Arc::clone(topic));
            }
        }

        let mut topics = self.topics.write().await;
        let topic = topics.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(topic = name, "Topic created");
            Arc::new(RwLock::new(Topic::new(name)))
        });

        Ok(Arc::clone(topic))
    }

    /// Subscribe `handle` to the topic `name`
    ///
    /// Returns `true` if the handle was added, `false` if it was already
    /// subscribed or has been closed. Re-subscribing is not an error.
    pub async fn subscribe(
        &self,
        name: &str,
        handle: &SubscriberHandle,
    ) -> Result<bool, RegistryError> {
        let topic_arc = self.get_or_create(name).await?;
        let mut topic = topic_arc.write().await;

        if !handle.is_alive() {
            return Ok(false);
        }

        let added = topic.add(handle);
        if added {
            tracing::info!(
                topic = name,
                subscriber = handle.id(),
                subscribers = topic.subscriber_count(),
                "Subscriber added"
            );
        } else {
            tracing::debug!(
                topic = name,
                subscriber = handle.id(),
                "Already subscribed"
            );
        }

        Ok(added)
    }

    /// Remove `handle` from every topic
    ///
    /// Returns the number of topics it was removed from. Close the handle
    /// first so a racing `subscribe` cannot re-add it.
    pub async fn unsubscribe_all(&self, handle: &SubscriberHandle) -> usize {
        let topics: Vec<Arc<RwLock<Topic>>> = self.topics.read().await.values().cloned().collect();

        let mut removed = 0;
        for topic_arc in topics {
            let mut topic = topic_arc.write().await;
            if topic.remove(handle.id()) {
                removed += 1;
                tracing::debug!(
                    topic = topic.name(),
                    subscriber = handle.id(),
                    subscribers = topic.subscriber_count(),
                    "Subscriber removed"
                );
            }
        }

        removed
    }

    /// Offer `payload` to every subscriber of `name`
    ///
    /// Creates the topic if needed, so publishing to a topic nobody listens
    /// to is a legal no-op. Returns the number of subscribers the payload was
    /// queued for. Subscribers that are closed or whose queue is full are
    /// closed, pruned and not counted.
    pub async fn publish(&self, name: &str, payload: Bytes) -> Result<usize, RegistryError> {
        let topic_arc = self.get_or_create(name).await?;
        let mut topic = topic_arc.write().await;

        let mut delivered = 0;
        let mut pruned = Vec::new();

        for handle in topic.subscribers() {
            match handle.offer(payload.clone()) {
                Offer::Queued => delivered += 1,
                Offer::Full => {
                    tracing::warn!(
                        topic = name,
                        subscriber = handle.id(),
                        "Subscriber queue full, dropping slow subscriber"
                    );
                    handle.close();
                    pruned.push(handle.id());
                }
                Offer::Closed => {
                    tracing::debug!(
                        topic = name,
                        subscriber = handle.id(),
                        "Pruning closed subscriber"
                    );
                    handle.close();
                    pruned.push(handle.id());
                }
            }
        }

        for id in pruned {
            topic.remove(id);
            self.stats.subscriber_pruned();
        }
        drop(topic);

        self.stats.message_published(delivered);
        tracing::trace!(
            topic = name,
            bytes = payload.len(),
            delivered = delivered,
            "Published"
        );

        Ok(delivered)
    }

    /// Check if a topic has been referenced
    pub async fn topic_exists(&self, name: &str) -> bool {
        self.topics.read().await.contains_key(name)
    }

    /// Get the number of subscribers of a topic, if it exists
    pub async fn subscriber_count(&self, name: &str) -> Option<usize> {
        let topic_arc = self.topics.read().await.get(name).cloned()?;
        let topic = topic_arc.read().await;
        Some(topic.subscriber_count())
    }

    /// Get total number of topics
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
