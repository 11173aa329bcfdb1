//! # herald-core
//!
//! Hierarchical in-process publish/subscribe for Herald.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Dispatcher** - Synchronous routing of published messages to subscribers
//! - **Channel** - Hierarchical names and per-channel subscriber lists
//! - **Sticky** - Retained messages replayed to late subscribers
//! - **Selector** - Explicit unsubscribe targets
//!
//! ## Routing
//!
//! ```text
//!  publish("a.b.c")
//!        │
//!        ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │     "a"     │────▶│    "a.b"    │────▶│   "a.b.c"   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!   priority order      priority order      priority order
//! ```
//!
//! `Rootless` publishes skip straight to the exact channel, and in `Ordered`
//! mode a subscriber returning [`Propagation::Stop`] ends the walk.
//!
//! ## Example
//!
//! ```rust
//! use herald_core::{Callback, Dispatcher, PublishMode, Selector, SubscribeOptions};
//! use serde_json::json;
//!
//! let dispatcher: Dispatcher = Dispatcher::new();
//! let token = dispatcher
//!     .subscribe(
//!         "network",
//!         Callback::observe(|msg, _| println!("{} -> {}", msg.channel, msg.data)),
//!         SubscribeOptions::new().with_priority(1),
//!     )
//!     .unwrap();
//!
//! dispatcher.publish("network.getData", json!({"id": 7}), PublishMode::Broadcast);
//! dispatcher.unsubscribe(Selector::ByToken(token));
//! ```

pub mod channel;
pub mod dispatcher;
pub mod message;
pub mod selector;
pub mod sticky;
pub mod subscription;

pub use channel::{Channel, ChannelId, DEFAULT_SEPARATOR};
pub use dispatcher::{DispatchError, Dispatcher, DispatcherConfig, DispatcherStats};
pub use message::{Message, Propagation, PublishMode};
pub use selector::Selector;
pub use sticky::StickyStore;
pub use subscription::{Callback, ContextId, SubscribeOptions, Subscription, Token};

use once_cell::sync::Lazy;

static GLOBAL: Lazy<Dispatcher> = Lazy::new(Dispatcher::new);

/// Get the process-wide shared dispatcher.
///
/// Callers needing isolation should construct their own [`Dispatcher`].
#[must_use]
pub fn global() -> &'static Dispatcher {
    &GLOBAL
}
