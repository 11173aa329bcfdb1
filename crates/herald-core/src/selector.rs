//! Unsubscribe selectors.

use crate::channel::ChannelId;
use crate::subscription::{Callback, ContextId, Subscription, Token};

/// Which subscriptions an unsubscribe removes.
#[derive(Debug, Clone)]
pub enum Selector<T = serde_json::Value> {
    /// The one subscription created with this token.
    ByToken(Token),
    /// Every subscription on a channel.
    ByChannel(ChannelId),
    /// Subscriptions on a channel using this callback, whatever their context.
    ByChannelAndCallback(ChannelId, Callback<T>),
    /// Subscriptions on a channel owned by this context.
    ByChannelAndContext(ChannelId, ContextId),
    /// Subscriptions on a channel using this callback and owned by this context.
    ByChannelCallbackAndContext(ChannelId, Callback<T>, ContextId),
    /// Subscriptions owned by this context, on every channel.
    ByContext(ContextId),
}

impl<T> Selector<T> {
    /// Select by token.
    #[must_use]
    pub fn token(token: impl Into<Token>) -> Self {
        Self::ByToken(token.into())
    }

    /// Select a whole channel.
    #[must_use]
    pub fn channel(channel: impl Into<ChannelId>) -> Self {
        Self::ByChannel(channel.into())
    }

    /// Select a callback on a channel.
    #[must_use]
    pub fn callback(channel: impl Into<ChannelId>, callback: &Callback<T>) -> Self {
        Self::ByChannelAndCallback(channel.into(), callback.clone())
    }

    /// Select a context on a channel.
    #[must_use]
    pub fn channel_context(channel: impl Into<ChannelId>, context: impl Into<ContextId>) -> Self {
        Self::ByChannelAndContext(channel.into(), context.into())
    }

    /// Select a callback and context pair on a channel.
    #[must_use]
    pub fn callback_context(
        channel: impl Into<ChannelId>,
        callback: &Callback<T>,
        context: impl Into<ContextId>,
    ) -> Self {
        Self::ByChannelCallbackAndContext(channel.into(), callback.clone(), context.into())
    }

    /// Select a context across all channels.
    #[must_use]
    pub fn context(context: impl Into<ContextId>) -> Self {
        Self::ByContext(context.into())
    }

    /// The single channel this selector is confined to, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::ByChannel(channel)
            | Self::ByChannelAndCallback(channel, _)
            | Self::ByChannelAndContext(channel, _)
            | Self::ByChannelCallbackAndContext(channel, _, _) => Some(channel),
            Self::ByToken(_) | Self::ByContext(_) => None,
        }
    }

    /// Check whether a subscription is selected.
    ///
    /// The channel part is not checked here; see [`Selector::scope`].
    #[must_use]
    pub fn matches(&self, subscription: &Subscription<T>) -> bool {
        match self {
            Self::ByToken(token) => &subscription.token == token,
            Self::ByChannel(_) => true,
            Self::ByChannelAndCallback(_, callback) => subscription.callback.same_as(callback),
            Self::ByChannelAndContext(_, context) | Self::ByContext(context) => {
                &subscription.context == context
            }
            Self::ByChannelCallbackAndContext(_, callback, context) => {
                subscription.callback.same_as(callback) && &subscription.context == context
            }
        }
    }
}
