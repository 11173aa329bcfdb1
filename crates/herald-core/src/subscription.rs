//! Subscriptions and the handles that identify them.

use crate::message::{Message, Propagation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Length of a generated subscription token.
pub const TOKEN_LENGTH: usize = 16;

/// Opaque handle returned by `subscribe`, usable to remove exactly that subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Generate a random token.
    #[must_use]
    pub fn generate() -> Self {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Get the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of the object owning a subscription.
///
/// Subscriptions sharing a context can be removed together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(String);

impl ContextId {
    /// Create a context ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random context ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("ctx_{:016x}", rand::random::<u64>()))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContextId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContextId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

type CallbackFn<T> = dyn Fn(&Message<T>, &ContextId) -> Propagation + Send + Sync;

/// A shared subscriber callback.
///
/// Two callbacks are equal when they are clones of the same handle; separately
/// built callbacks never compare equal, even if their closures are identical.
pub struct Callback<T>(Arc<CallbackFn<T>>);

impl<T> Callback<T> {
    /// Wrap a closure that decides how propagation continues.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Message<T>, &ContextId) -> Propagation + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a closure that never stops propagation.
    pub fn observe<F>(f: F) -> Self
    where
        F: Fn(&Message<T>, &ContextId) + Send + Sync + 'static,
    {
        Self::new(move |message, context| {
            f(message, context);
            Propagation::Continue
        })
    }

    /// Run the callback.
    pub fn invoke(&self, message: &Message<T>, context: &ContextId) -> Propagation {
        (self.0)(message, context)
    }

    /// Check whether both handles point at the same callback.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        // Compare data pointers only; vtable addresses are not unique.
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for Callback<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<T> Eq for Callback<T> {}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Options for a new subscription.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Owner of the subscription. Defaults to the dispatcher's own context.
    pub context: Option<ContextId>,
    /// Delivery priority within a channel; lower runs first, `None` runs last.
    pub priority: Option<i64>,
}

impl SubscribeOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the owning context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<ContextId>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the delivery priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// A registered subscriber on one channel.
pub struct Subscription<T> {
    /// Unique handle of this subscription.
    pub token: Token,
    /// Owning context, passed to the callback on every delivery.
    pub context: ContextId,
    /// The subscriber callback.
    pub callback: Callback<T>,
    /// Delivery priority.
    pub priority: Option<i64>,
    /// Cleared once the subscription is removed from its channel.
    active: AtomicBool,
}

impl<T> Subscription<T> {
    /// Create a new, active subscription.
    #[must_use]
    pub fn new(
        token: Token,
        context: ContextId,
        callback: Callback<T>,
        priority: Option<i64>,
    ) -> Self {
        Self {
            token,
            context,
            callback,
            priority,
            active: AtomicBool::new(true),
        }
    }

    /// Ordering key: defined priorities ascending, then undefined ones.
    #[must_use]
    pub fn sort_key(&self) -> (bool, i64) {
        (self.priority.is_none(), self.priority.unwrap_or_default())
    }

    /// Whether the subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Deliver a message unless the subscription was removed meanwhile.
    ///
    /// Returns `None` when the subscription is no longer active.
    pub fn deliver(&self, message: &Message<T>) -> Option<Propagation> {
        if !self.is_active() {
            return None;
        }
        Some(self.callback.invoke(message, &self.context))
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .field("context", &self.context)
            .field("priority", &self.priority)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PublishMode;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_token_generation() {
        let token = Token::generate();
        assert_eq!(token.as_str().len(), TOKEN_LENGTH);
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, Token::generate());
    }

    #[test]
    fn test_token_from_text() {
        let token = Token::generate();
        let restored = Token::from(token.to_string());
        assert_eq!(token, restored);
    }

    #[test]
    fn test_callback_identity() {
        let a: Callback<()> = Callback::observe(|_, _| {});
        let b: Callback<()> = Callback::observe(|_, _| {});

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_sort_key_puts_undefined_last() {
        let cb: Callback<()> = Callback::observe(|_, _| {});
        let ctx = ContextId::new("ctx");
        let undefined = Subscription::new(Token::generate(), ctx.clone(), cb.clone(), None);
        let low = Subscription::new(Token::generate(), ctx.clone(), cb.clone(), Some(-5));
        let high = Subscription::new(Token::generate(), ctx, cb, Some(i64::MAX));

        assert!(low.sort_key() < high.sort_key());
        assert!(high.sort_key() < undefined.sort_key());
    }

    #[test]
    fn test_inactive_subscription_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cb = Callback::observe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let sub = Subscription::new(Token::generate(), ContextId::generate(), cb, None);
        let msg = Message::new("a", (), PublishMode::Broadcast);

        assert_eq!(sub.deliver(&msg), Some(Propagation::Continue));
        sub.deactivate();
        assert_eq!(sub.deliver(&msg), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_options_builder() {
        let opts = SubscribeOptions::new().with_context("owner").with_priority(3);
        assert_eq!(opts.context, Some(ContextId::new("owner")));
        assert_eq!(opts.priority, Some(3));
    }
}
