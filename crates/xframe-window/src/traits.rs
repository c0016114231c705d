use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// Shared handle to a window.
pub type WindowRef = Rc<dyn Window>;

/// Callback invoked for every message event delivered to a window.
pub type MessageListener = Rc<dyn Fn(&MessageEvent)>;

/// Opaque window identity.
///
/// Two handles refer to the same window exactly when their ids are equal.
/// This is what the `event.source === targetWindow` check compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// A message event as seen by the receiving window.
///
/// `data` is whatever the sender posted. Only string payloads can be
/// protocol traffic; everything else is foreign noise.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// The posting window, if known.
    pub source: Option<WindowId>,
    /// The posted payload.
    pub data: Value,
}

impl MessageEvent {
    /// Create an event with an arbitrary payload.
    pub fn new(source: Option<WindowId>, data: impl Into<Value>) -> Self {
        Self {
            source,
            data: data.into(),
        }
    }

    /// Create an event carrying a string payload.
    pub fn text(source: Option<WindowId>, data: impl Into<String>) -> Self {
        Self {
            source,
            data: Value::String(data.into()),
        }
    }

    /// The payload as a string, when it is one.
    pub fn data_str(&self) -> Option<&str> {
        self.data.as_str()
    }
}

/// Capability set the protocol needs from a window.
///
/// Implementations wrap a real browser window (via bindings) or an
/// in-memory stand-in such as [`crate::SimWindow`].
pub trait Window {
    /// Stable identity of this window.
    fn id(&self) -> WindowId;

    /// The parent window.
    ///
    /// Returns `None` for a top-level window. Implementations mirroring the
    /// browser may instead return the window itself; callers treat both as
    /// "top reached".
    fn parent(&self) -> Option<WindowRef>;

    /// Post a string message to this window.
    ///
    /// Fire-and-forget: a closed or navigated-away window drops the message
    /// silently, exactly as the browser primitive does.
    fn post_message(&self, data: &str, target_origin: &str);

    /// Install a listener for message events delivered to this window.
    fn add_message_listener(&self, listener: MessageListener);

    /// The window `name` (carries boot data).
    fn name(&self) -> String;

    /// The location hash fragment, including the leading `#` if present.
    fn location_hash(&self) -> String;

    /// Dispatch a named same-window notification.
    fn dispatch_local_event(&self, event: &str);

    /// True when this window has no distinct parent.
    fn is_top(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.id() == self.id(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_id_display() {
        assert_eq!(WindowId::new(7).to_string(), "window-7");
        assert_eq!(WindowId::new(7).get(), 7);
    }

    #[test]
    fn data_str_only_for_strings() {
        let text = MessageEvent::text(None, "amp-{}");
        assert_eq!(text.data_str(), Some("amp-{}"));

        let object = MessageEvent::new(None, serde_json::json!({ "type": "ping" }));
        assert!(object.data_str().is_none());
    }
}
