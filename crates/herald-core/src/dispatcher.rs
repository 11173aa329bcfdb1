//! The publish/subscribe dispatcher.
//!
//! Delivery is synchronous: `publish` runs every matching callback on the
//! caller's stack before it returns. Callbacks may subscribe, unsubscribe and
//! publish re-entrantly; no internal lock is held while a callback runs.

use crate::channel::{
    prefixes, validate_channel_name, validate_separator, Channel, ChannelId, DEFAULT_SEPARATOR,
};
use crate::message::{Message, Propagation, PublishMode};
use crate::selector::Selector;
use crate::sticky::StickyStore;
use crate::subscription::{Callback, ContextId, SubscribeOptions, Subscription, Token};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Dispatcher errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Invalid channel name.
    #[error("Invalid channel name: {0}")]
    InvalidChannel(&'static str),

    /// Invalid hierarchy separator.
    #[error("Invalid separator: {0}")]
    InvalidSeparator(&'static str),
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Channel hierarchy separator.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Emit diagnostics for every subscribe, publish and delivery.
    #[serde(default)]
    pub debug: bool,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            debug: false,
        }
    }
}

/// Dispatcher statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Number of channels with at least one subscriber.
    pub channel_count: usize,
    /// Total number of subscriptions.
    pub subscription_count: usize,
    /// Number of retained sticky messages.
    pub sticky_count: usize,
}

/// Routes published messages to the subscribers of a channel and its ancestors.
pub struct Dispatcher<T = serde_json::Value> {
    /// Channels indexed by name. Only non-empty channels are kept.
    channels: DashMap<ChannelId, Channel<T>>,
    /// Retained sticky messages.
    sticky: StickyStore<T>,
    /// Hierarchy separator.
    separator: RwLock<String>,
    /// Diagnostic output switch.
    debug: AtomicBool,
    /// Context used for subscriptions that do not name one.
    context: ContextId,
}

impl<T> Dispatcher<T> {
    /// Create a new dispatcher with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            sticky: StickyStore::new(),
            separator: RwLock::new(default_separator()),
            debug: AtomicBool::new(false),
            context: ContextId::generate(),
        }
    }

    /// Create a new dispatcher with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured separator is invalid.
    pub fn with_config(config: DispatcherConfig) -> Result<Self, DispatchError> {
        validate_separator(&config.separator).map_err(DispatchError::InvalidSeparator)?;
        debug!("Creating dispatcher with config: {:?}", config);

        let dispatcher = Self::new();
        *dispatcher.separator.write() = config.separator;
        dispatcher.debug.store(config.debug, Ordering::Relaxed);
        Ok(dispatcher)
    }

    /// Get the context used when a subscription does not name one.
    #[must_use]
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    /// Get the current hierarchy separator.
    #[must_use]
    pub fn separator(&self) -> String {
        self.separator.read().clone()
    }

    /// Change the hierarchy separator for subsequent calls.
    ///
    /// Existing channel names are not re-keyed.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is empty.
    pub fn set_separator(&self, separator: &str) -> Result<&Self, DispatchError> {
        validate_separator(separator).map_err(DispatchError::InvalidSeparator)?;
        *self.separator.write() = separator.to_string();
        debug!(separator = %separator, "Separator changed");
        Ok(self)
    }

    /// Toggle diagnostic output of subscribe and publish activity.
    pub fn print_log(&self, enabled: bool) -> &Self {
        self.debug.store(enabled, Ordering::Relaxed);
        self
    }

    /// Check whether diagnostic output is enabled.
    #[must_use]
    pub fn is_logging(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Get dispatcher statistics.
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            channel_count: self.channels.len(),
            subscription_count: self.channels.iter().map(|c| c.subscriber_count()).sum(),
            sticky_count: self.sticky.len(),
        }
    }

    /// Subscribe a callback to a channel.
    ///
    /// Retained sticky messages of the channel, its ancestors and its
    /// descendants are replayed to the callback before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel name is invalid. The dispatcher is left
    /// unchanged.
    pub fn subscribe(
        &self,
        channel: &str,
        callback: Callback<T>,
        options: SubscribeOptions,
    ) -> Result<Token, DispatchError> {
        if let Err(reason) = validate_channel_name(channel) {
            warn!(channel = %channel, reason, "Can't subscribe to channel");
            return Err(DispatchError::InvalidChannel(reason));
        }

        let context = options.context.unwrap_or_else(|| self.context.clone());
        let token = self.unique_token();
        let subscription = Arc::new(Subscription::new(
            token.clone(),
            context,
            callback,
            options.priority,
        ));

        {
            let mut entry = self.channels.entry(channel.to_string()).or_insert_with(|| {
                debug!(channel = %channel, "Creating new channel");
                Channel::new(channel)
            });
            entry.subscribe(Arc::clone(&subscription));

            debug!(
                channel = %channel,
                token = %token,
                subscribers = entry.subscriber_count(),
                "Subscribed"
            );
        }

        if self.is_logging() {
            info!(
                channel = %channel,
                receiver = %subscription.context,
                priority = ?subscription.priority,
                "subscribe to channel"
            );
        }

        let separator = self.separator();
        for message in self.sticky.replay_for(channel, &separator) {
            trace!(channel = %message.channel, token = %token, "Replaying sticky message");
            subscription.deliver(&message);
        }

        Ok(token)
    }

    /// Publish a message to a channel.
    ///
    /// Returns the dispatcher for chaining.
    pub fn publish(&self, channel: &str, data: T, mode: PublishMode) -> &Self {
        self.publish_counted(channel, data, mode);
        self
    }

    /// Publish a message to a channel.
    ///
    /// Returns the number of callbacks that ran.
    pub fn publish_counted(&self, channel: &str, data: T, mode: PublishMode) -> usize {
        let message = Arc::new(Message::new(channel, data, mode));

        if self.is_logging() {
            info!(channel = %channel, mode = %mode, message = message.id, "publish");
        }

        if mode == PublishMode::Sticky {
            self.sticky.record(Arc::clone(&message));
        }

        let mut delivered = 0;
        if mode.is_hierarchical() {
            let separator = self.separator();
            for current in prefixes(channel, &separator) {
                if self.notify(current, &message, &mut delivered) == Propagation::Stop {
                    trace!(channel = %channel, stopped_at = %current, "Propagation stopped");
                    break;
                }
            }
        } else {
            self.notify(channel, &message, &mut delivered);
        }

        trace!(channel = %channel, recipients = delivered, "Published message");
        delivered
    }

    /// Deliver a message to the subscribers of one exact channel.
    fn notify(&self, channel: &str, message: &Message<T>, delivered: &mut usize) -> Propagation {
        // The guard must be gone before any callback runs.
        let snapshot = match self.channels.get(channel) {
            Some(entry) => entry.snapshot(),
            None => return Propagation::Continue,
        };

        for subscription in snapshot {
            let Some(outcome) = subscription.deliver(message) else {
                continue;
            };
            *delivered += 1;

            if self.is_logging() {
                info!(receiver = %subscription.context, channel = %channel, "delivered");
            }

            if outcome == Propagation::Stop && message.mode == PublishMode::Ordered {
                return Propagation::Stop;
            }
        }

        Propagation::Continue
    }

    /// Remove the subscriptions picked by `selector`.
    ///
    /// Unknown tokens, channels and contexts are a no-op. Returns the number
    /// of subscriptions removed.
    pub fn unsubscribe(&self, selector: Selector<T>) -> usize {
        let removed = match selector.scope() {
            Some(channel) => self.remove_from_channel(channel, &selector),
            None => self.remove_everywhere(&selector),
        };

        debug!(selector = selector_kind(&selector), removed, "Unsubscribed");
        removed
    }

    fn remove_from_channel(&self, channel: &str, selector: &Selector<T>) -> usize {
        let removed = match self.channels.get_mut(channel) {
            Some(mut entry) => entry.remove_where(|s| selector.matches(s)),
            None => return 0,
        };

        if self.channels.remove_if(channel, |_, c| c.is_empty()).is_some() {
            debug!(channel = %channel, "Deleted empty channel");
        }
        removed
    }

    fn remove_everywhere(&self, selector: &Selector<T>) -> usize {
        let mut removed = 0;
        self.channels.retain(|name, channel| {
            removed += channel.remove_where(|s| selector.matches(s));
            if channel.is_empty() {
                debug!(channel = %name, "Deleted empty channel");
                return false;
            }
            true
        });
        removed
    }

    /// Get the names of all channels with at least one subscriber, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut names: Vec<_> = self.channels.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Check if a channel has subscribers.
    #[must_use]
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Get the subscriber count for a channel.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|e| e.subscriber_count())
            .unwrap_or(0)
    }

    /// Get the channels holding a retained sticky message.
    #[must_use]
    pub fn sticky_channels(&self) -> Vec<ChannelId> {
        self.sticky.channels()
    }

    /// Drop the retained sticky message of an exact channel.
    pub fn clear_sticky(&self, channel: &str) -> bool {
        self.sticky.clear(channel)
    }

    fn unique_token(&self) -> Token {
        loop {
            let token = Token::generate();
            if !self.channels.iter().any(|c| c.contains_token(&token)) {
                return token;
            }
        }
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn selector_kind<T>(selector: &Selector<T>) -> &'static str {
    match selector {
        Selector::ByToken(_) => "token",
        Selector::ByChannel(_) => "channel",
        Selector::ByChannelAndCallback(..) => "channel+callback",
        Selector::ByChannelAndContext(..) => "channel+context",
        Selector::ByChannelCallbackAndContext(..) => "channel+callback+context",
        Selector::ByContext(_) => "context",
    }
}
