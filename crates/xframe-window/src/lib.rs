//! Window handle abstraction for cross-frame messaging.
//!
//! The protocol never touches a browser directly. It talks to windows through
//! the [`Window`] capability:
//! - a `parent` link used to resolve the ancestor chain
//! - a fire-and-forget `post_message`
//! - a single message-event listener hook
//!
//! This is the lowest layer of xframe. [`SimWindow`] is an in-memory
//! implementation used by tests, the CLI replay tool, and non-browser hosts.

pub mod sim;
pub mod traits;

pub use sim::{PostedMessage, SimWindow};
pub use traits::{MessageEvent, MessageListener, Window, WindowId, WindowRef};
