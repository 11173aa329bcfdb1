//! Channel names and per-channel subscriber lists.
//!
//! Channel names are hierarchical: segments joined by a separator, so with the
//! default separator `"a.b"` is an ancestor of `"a.b.c"`.

use crate::subscription::{Subscription, Token};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default hierarchy separator.
pub const DEFAULT_SEPARATOR: &str = ".";

/// A channel identifier.
pub type ChannelId = String;

/// Validate a channel name.
///
/// Any non-empty name is accepted, whatever its length.
///
/// # Errors
///
/// Returns an error message if the channel name is empty.
pub fn validate_channel_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Channel name cannot be empty");
    }
    Ok(())
}

/// Validate a hierarchy separator.
///
/// # Errors
///
/// Returns an error message if the separator is empty.
pub fn validate_separator(separator: &str) -> Result<(), &'static str> {
    if separator.is_empty() {
        return Err("Separator cannot be empty");
    }
    Ok(())
}

/// Iterate the prefixes of `channel`, root-most first, ending with `channel` itself.
///
/// `prefixes("a.b.c", ".")` yields `"a"`, `"a.b"`, `"a.b.c"`. Empty segments are kept,
/// so `"a..b"` yields `"a"`, `"a."`, `"a..b"`.
pub fn prefixes<'a>(channel: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    channel
        .match_indices(separator)
        .map(move |(end, _)| &channel[..end])
        .chain(std::iter::once(channel))
}

/// Check whether `candidate` is a strict descendant of `ancestor`.
#[must_use]
pub fn is_descendant(candidate: &str, ancestor: &str, separator: &str) -> bool {
    candidate
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with(separator))
}

/// The subscriber list of one channel, kept in delivery order.
pub struct Channel<T> {
    /// Channel name.
    name: ChannelId,
    /// Subscribers sorted by priority, undefined priorities last.
    subscribers: Vec<Arc<Subscription<T>>>,
}

impl<T> Channel<T> {
    /// Create an empty channel.
    #[must_use]
    pub fn new(name: impl Into<ChannelId>) -> Self {
        Self {
            name: name.into(),
            subscribers: Vec::new(),
        }
    }

    /// Get the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if the channel is empty (no subscribers).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Check whether a subscription with this token lives here.
    #[must_use]
    pub fn contains_token(&self, token: &Token) -> bool {
        self.subscribers.iter().any(|s| &s.token == token)
    }

    /// Add a subscription and restore priority order.
    ///
    /// The sort is stable: equal priorities keep subscription order.
    pub fn subscribe(&mut self, subscription: Arc<Subscription<T>>) {
        debug!(channel = %self.name, token = %subscription.token, "Subscriber added");
        self.subscribers.push(subscription);
        self.subscribers.sort_by_key(|s| s.sort_key());
    }

    /// Remove every subscription matching `predicate`.
    ///
    /// Removed subscriptions are deactivated so in-flight deliveries skip them.
    /// Returns the number removed.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Subscription<T>) -> bool,
    {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscription| {
            if predicate(subscription) {
                subscription.deactivate();
                false
            } else {
                true
            }
        });
        let removed = before - self.subscribers.len();
        if removed > 0 {
            debug!(channel = %self.name, removed, "Subscribers removed");
        }
        removed
    }

    /// Copy the subscriber list for delivery.
    ///
    /// The copy is unaffected by subscribes and unsubscribes made while it is walked.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Subscription<T>>> {
        self.subscribers.clone()
    }

    /// Get all subscriber tokens in delivery order.
    #[must_use]
    pub fn subscribers(&self) -> Vec<Token> {
        self.subscribers.iter().map(|s| s.token.clone()).collect()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::{Callback, ContextId};

    fn subscription(priority: Option<i64>) -> Arc<Subscription<()>> {
        Arc::new(Subscription::new(
            Token::generate(),
            ContextId::new("ctx"),
            Callback::observe(|_, _| {}),
            priority,
        ))
    }

    #[test]
    fn test_channel_name_validation() {
        assert!(validate_channel_name("valid.channel").is_ok());
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name(".").is_ok());

        let long_name = format!("root.{}", "x".repeat(300));
        assert!(validate_channel_name(&long_name).is_ok());
    }

    #[test]
    fn test_separator_validation() {
        assert!(validate_separator("::").is_ok());
        assert!(validate_separator("").is_err());
    }

    #[test]
    fn test_prefixes() {
        let walk: Vec<_> = prefixes("a.b.c", ".").collect();
        assert_eq!(walk, vec!["a", "a.b", "a.b.c"]);

        let single: Vec<_> = prefixes("root", ".").collect();
        assert_eq!(single, vec!["root"]);

        let multi: Vec<_> = prefixes("channel::sub::leaf", "::").collect();
        assert_eq!(multi, vec!["channel", "channel::sub", "channel::sub::leaf"]);
    }

    #[test]
    fn test_prefixes_keep_empty_segments() {
        let walk: Vec<_> = prefixes("a..b", ".").collect();
        assert_eq!(walk, vec!["a", "a.", "a..b"]);

        let leading: Vec<_> = prefixes(".a", ".").collect();
        assert_eq!(leading, vec!["", ".a"]);
    }

    #[test]
    fn test_is_descendant() {
        assert!(is_descendant("a.b", "a", "."));
        assert!(is_descendant("a.b.c", "a.b", "."));
        assert!(!is_descendant("a", "a", "."));
        assert!(!is_descendant("ab", "a", "."));
        assert!(!is_descendant("a", "a.b", "."));
        assert!(is_descendant("a::b", "a", "::"));
        assert!(!is_descendant("a.b", "a", "::"));
    }

    #[test]
    fn test_channel_priority_order() {
        let mut channel = Channel::new("test");
        let undefined = subscription(None);
        let one = subscription(Some(1));
        let zero = subscription(Some(0));

        channel.subscribe(Arc::clone(&undefined));
        channel.subscribe(Arc::clone(&one));
        channel.subscribe(Arc::clone(&zero));

        assert_eq!(
            channel.subscribers(),
            vec![zero.token.clone(), one.token.clone(), undefined.token.clone()]
        );
    }

    #[test]
    fn test_equal_priorities_keep_subscription_order() {
        let mut channel = Channel::new("test");
        let first = subscription(Some(2));
        let second = subscription(Some(2));
        let third = subscription(None);
        let fourth = subscription(None);

        for sub in [&third, &first, &fourth, &second] {
            channel.subscribe(Arc::clone(sub));
        }

        assert_eq!(
            channel.subscribers(),
            vec![
                first.token.clone(),
                second.token.clone(),
                third.token.clone(),
                fourth.token.clone()
            ]
        );
    }

    #[test]
    fn test_channel_remove_where() {
        let mut channel = Channel::new("test");
        let keep = subscription(None);
        let drop_me = subscription(Some(1));
        channel.subscribe(Arc::clone(&keep));
        channel.subscribe(Arc::clone(&drop_me));

        let snapshot = channel.snapshot();
        assert_eq!(channel.remove_where(|s| s.token == drop_me.token), 1);

        assert_eq!(channel.subscriber_count(), 1);
        assert!(!channel.contains_token(&drop_me.token));
        assert!(!drop_me.is_active());
        assert!(keep.is_active());
        // Snapshots taken earlier still hold the removed entry
        assert_eq!(snapshot.len(), 2);

        assert_eq!(channel.remove_where(|_| true), 1);
        assert!(channel.is_empty());
    }
}
