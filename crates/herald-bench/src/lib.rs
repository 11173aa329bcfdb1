//! Shared fixtures for Herald benchmarks.

use herald_core::{Callback, Dispatcher, SubscribeOptions};
use serde_json::Value;

/// A callback that does nothing.
#[must_use]
pub fn noop() -> Callback<Value> {
    Callback::observe(|_, _| {})
}

/// Build a channel name with `depth` segments, e.g. `"level0.level1.level2"`.
#[must_use]
pub fn deep_channel(depth: usize) -> String {
    (0..depth)
        .map(|i| format!("level{}", i))
        .collect::<Vec<_>>()
        .join(".")
}

/// Create a dispatcher with `count` subscribers on `channel`.
#[must_use]
pub fn fanout(channel: &str, count: usize) -> Dispatcher {
    let dispatcher = Dispatcher::new();
    for i in 0..count {
        let options = SubscribeOptions::new().with_priority((i % 7) as i64);
        dispatcher.subscribe(channel, noop(), options).unwrap();
    }
    dispatcher
}

/// Create a dispatcher with one subscriber on every prefix of a `depth`-segment channel.
///
/// Returns the dispatcher and the full channel name.
#[must_use]
pub fn hierarchy(depth: usize) -> (Dispatcher, String) {
    let dispatcher = Dispatcher::new();
    let channel = deep_channel(depth);
    for prefix in herald_core::channel::prefixes(&channel, ".") {
        dispatcher.subscribe(prefix, noop(), SubscribeOptions::new()).unwrap();
    }
    (dispatcher, channel)
}
