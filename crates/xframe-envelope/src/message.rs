//! Built-in message types.
//!
//! Frame-to-host requests and their host-to-frame replies:
//!
//! | Request              | Reply                                    |
//! |----------------------|------------------------------------------|
//! | `send-embed-context` | `embed-context`                          |
//! | `send-embed-state`   | `embed-state` (repeating)                |
//! | `send-intersections` | `intersection` (repeating)               |
//! | `embed-size`         | `embed-size-changed`, `embed-size-denied` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    SendEmbedContext,
    EmbedContext,
    SendEmbedState,
    EmbedState,
    SendIntersections,
    Intersection,
    EmbedSize,
    EmbedSizeChanged,
    EmbedSizeDenied,
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::SendEmbedContext,
        MessageType::EmbedContext,
        MessageType::SendEmbedState,
        MessageType::EmbedState,
        MessageType::SendIntersections,
        MessageType::Intersection,
        MessageType::EmbedSize,
        MessageType::EmbedSizeChanged,
        MessageType::EmbedSizeDenied,
    ];

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageType::SendEmbedContext => "send-embed-context",
            MessageType::EmbedContext => "embed-context",
            MessageType::SendEmbedState => "send-embed-state",
            MessageType::EmbedState => "embed-state",
            MessageType::SendIntersections => "send-intersections",
            MessageType::Intersection => "intersection",
            MessageType::EmbedSize => "embed-size",
            MessageType::EmbedSizeChanged => "embed-size-changed",
            MessageType::EmbedSizeDenied => "embed-size-denied",
        }
    }

    /// Returns true for frame-to-host requests.
    pub const fn is_request(self) -> bool {
        matches!(
            self,
            MessageType::SendEmbedContext
                | MessageType::SendEmbedState
                | MessageType::SendIntersections
                | MessageType::EmbedSize
        )
    }

    /// Reply types the host answers a request with. Empty for replies.
    pub const fn reply_types(self) -> &'static [MessageType] {
        match self {
            MessageType::SendEmbedContext => &[MessageType::EmbedContext],
            MessageType::SendEmbedState => &[MessageType::EmbedState],
            MessageType::SendIntersections => &[MessageType::Intersection],
            MessageType::EmbedSize => &[
                MessageType::EmbedSizeChanged,
                MessageType::EmbedSizeDenied,
            ],
            _ => &[],
        }
    }

    /// Returns true when the host keeps sending this reply until unsubscribed.
    pub const fn is_streaming(self) -> bool {
        matches!(self, MessageType::EmbedState | MessageType::Intersection)
    }

    /// All host-to-frame reply types.
    pub fn replies() -> impl Iterator<Item = MessageType> {
        Self::ALL.into_iter().filter(|t| !t.is_request())
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown message type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message type '{0}'")]
pub struct UnknownMessageType(pub String);

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownMessageType(s.to_string()))
    }
}
