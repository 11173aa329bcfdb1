//! Sticky message retention.
//!
//! A sticky publish is remembered under the exact channel it was published to.
//! New subscribers receive the retained messages of their channel, of its
//! ancestors and of its descendants. Retention is volatile and lives only as
//! long as the dispatcher.

use crate::channel::{is_descendant, prefixes, ChannelId};
use crate::message::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Retained sticky messages, keyed by exact channel.
pub struct StickyStore<T> {
    records: DashMap<ChannelId, Arc<Message<T>>>,
}

impl<T> StickyStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Get the number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retain a message under its channel, replacing any earlier one.
    ///
    /// Returns the replaced message, if any.
    pub fn record(&self, message: Arc<Message<T>>) -> Option<Arc<Message<T>>> {
        let channel = message.channel.clone();
        let previous = self.records.insert(channel.clone(), message);
        debug!(channel = %channel, replaced = previous.is_some(), "Sticky: message retained");
        previous
    }

    /// Get the retained message of an exact channel.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<Arc<Message<T>>> {
        self.records.get(channel).map(|r| Arc::clone(r.value()))
    }

    /// Collect the messages a new subscriber of `channel` must receive.
    ///
    /// Ancestor records come first, root-most first and including `channel`
    /// itself. Strict descendant records follow, ordered by channel name.
    #[must_use]
    pub fn replay_for(&self, channel: &str, separator: &str) -> Vec<Arc<Message<T>>> {
        let mut replay: Vec<_> = prefixes(channel, separator)
            .filter_map(|prefix| self.get(prefix))
            .collect();

        let mut descendants: Vec<_> = self
            .records
            .iter()
            .filter(|r| is_descendant(r.key(), channel, separator))
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        descendants.sort_by(|a, b| a.0.cmp(&b.0));

        replay.extend(descendants.into_iter().map(|(_, message)| message));
        replay
    }

    /// Drop the retained message of an exact channel.
    ///
    /// Returns `true` if a message was retained.
    pub fn clear(&self, channel: &str) -> bool {
        let removed = self.records.remove(channel).is_some();
        if removed {
            debug!(channel = %channel, "Sticky: message dropped");
        }
        removed
    }

    /// Drop every retained message.
    pub fn clear_all(&self) {
        self.records.clear();
    }

    /// Get the channels holding a retained message, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<_> = self.records.iter().map(|r| r.key().clone()).collect();
        channels.sort();
        channels
    }
}

impl<T> Default for StickyStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PublishMode;

    fn sticky(channel: &str, data: &'static str) -> Arc<Message<&'static str>> {
        Arc::new(Message::new(channel, data, PublishMode::Sticky))
    }

    fn payloads(messages: &[Arc<Message<&'static str>>]) -> Vec<&'static str> {
        messages.iter().map(|m| m.data).collect()
    }

    #[test]
    fn test_record_overwrites() {
        let store = StickyStore::new();
        assert!(store.record(sticky("a", "first")).is_none());
        assert!(store.record(sticky("a", "second")).is_some());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").map(|m| m.data), Some("second"));
    }

    #[test]
    fn test_replay_ancestors_then_descendants() {
        let store = StickyStore::new();
        store.record(sticky("a", "root"));
        store.record(sticky("a.b", "self"));
        store.record(sticky("a.b.d", "child-d"));
        store.record(sticky("a.b.c", "child-c"));
        store.record(sticky("a.bc", "sibling"));
        store.record(sticky("x", "unrelated"));

        let replay = store.replay_for("a.b", ".");
        assert_eq!(payloads(&replay), vec!["root", "self", "child-c", "child-d"]);
    }

    #[test]
    fn test_replay_only_records_exact_channels() {
        let store = StickyStore::new();
        store.record(sticky("a.b.c", "leaf"));

        // The ancestors of a sticky channel are not retained themselves
        assert!(store.get("a").is_none());
        assert!(store.get("a.b").is_none());
        assert_eq!(payloads(&store.replay_for("a", ".")), vec!["leaf"]);
        assert!(store.replay_for("a.b.c.d", ".").len() == 1);
        assert!(store.replay_for("b", ".").is_empty());
    }

    #[test]
    fn test_clear() {
        let store = StickyStore::new();
        store.record(sticky("a", "one"));
        store.record(sticky("b", "two"));

        assert!(store.clear("a"));
        assert!(!store.clear("a"));
        assert_eq!(store.channels(), vec!["b".to_string()]);

        store.clear_all();
        assert!(store.is_empty());
    }
}
