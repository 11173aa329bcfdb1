//! Message types for Herald.
//!
//! A [`Message`] carries the full argument tuple of one publish call and is
//! shared between every delivery of that call.

use crate::channel::ChannelId;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// A unique message identifier.
pub type MessageId = u64;

/// Process-wide message counter.
static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique message ID.
#[must_use]
pub fn generate_message_id() -> MessageId {
    ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// How a publish is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PublishMode {
    /// Walk the channel hierarchy root-first, ignoring stop requests.
    #[default]
    Broadcast,
    /// Like `Broadcast`, and retain the message for late subscribers.
    Sticky,
    /// Deliver only to the exact channel.
    Rootless,
    /// Like `Broadcast`, but a subscriber may halt the rest of the walk.
    Ordered,
}

impl PublishMode {
    /// Get the mode name as used in scripts and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Sticky => "sticky",
            Self::Rootless => "rootless",
            Self::Ordered => "ordered",
        }
    }

    /// Whether this mode walks the ancestors of the published channel.
    #[must_use]
    pub fn is_hierarchical(self) -> bool {
        self != Self::Rootless
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown names parse as [`PublishMode::Broadcast`].
impl FromStr for PublishMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "sticky" => Self::Sticky,
            "rootless" => Self::Rootless,
            "ordered" => Self::Ordered,
            _ => Self::Broadcast,
        })
    }
}

/// What a subscriber asks the dispatcher to do after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Keep delivering.
    #[default]
    Continue,
    /// Halt delivery for this publish. Honored only in [`PublishMode::Ordered`].
    Stop,
}

impl From<bool> for Propagation {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Self::Continue
        } else {
            Self::Stop
        }
    }
}

/// A published message.
#[derive(Debug, Clone)]
pub struct Message<T> {
    /// Unique message identifier.
    pub id: MessageId,
    /// The channel exactly as it was published to.
    pub channel: ChannelId,
    /// Message payload.
    pub data: T,
    /// Routing mode of the publish.
    pub mode: PublishMode,
}

impl<T> Message<T> {
    /// Create a new message.
    #[must_use]
    pub fn new(channel: impl Into<ChannelId>, data: T, mode: PublishMode) -> Self {
        Self {
            id: generate_message_id(),
            channel: channel.into(),
            data,
            mode,
        }
    }

    /// Get the payload.
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Whether this message was published in sticky mode.
    #[must_use]
    pub fn is_sticky(&self) -> bool {
        self.mode == PublishMode::Sticky
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new("chat.lobby", "hello", PublishMode::Sticky);
        assert_eq!(msg.channel, "chat.lobby");
        assert_eq!(*msg.data(), "hello");
        assert!(msg.is_sticky());
    }

    #[test]
    fn test_unique_message_ids() {
        let id1 = generate_message_id();
        let id2 = generate_message_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("sticky".parse(), Ok(PublishMode::Sticky));
        assert_eq!("ROOTLESS".parse(), Ok(PublishMode::Rootless));
        assert_eq!("ordered".parse(), Ok(PublishMode::Ordered));
        // Unknown modes fall back to a plain hierarchical publish
        assert_eq!("loud".parse(), Ok(PublishMode::Broadcast));
        assert_eq!(PublishMode::Ordered.to_string(), "ordered");
    }

    #[test]
    fn test_propagation_from_bool() {
        assert_eq!(Propagation::from(false), Propagation::Stop);
        assert_eq!(Propagation::from(true), Propagation::Continue);
        assert_eq!(Propagation::default(), Propagation::Continue);
    }

    #[test]
    fn test_rootless_is_not_hierarchical() {
        assert!(!PublishMode::Rootless.is_hierarchical());
        assert!(PublishMode::Sticky.is_hierarchical());
    }
}
