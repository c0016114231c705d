//! Sentinel-bound messaging between embedded frames and their host page.
//!
//! A creative running in a nested frame finds its host among its ancestors,
//! then exchanges marker-prefixed JSON envelopes with it. Only messages from
//! that one window carrying the frame's sentinel are ever delivered.
//!
//! # Crate Structure
//!
//! - [`window`]: window handle abstraction and an in-memory simulator
//! - [`envelope`]: wire codec, message types and typed payloads
//! - [`context`]: identity resolution, callback registry, dispatch loop and
//!   the [`context::FrameContext`] verbs
//! - [`schema`]: optional JSON Schema validation (behind `schema` feature)

/// Re-export window types.
pub mod window {
    pub use xframe_window::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use xframe_envelope::*;
}

/// Re-export frame context types.
pub mod context {
    pub use xframe_context::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use xframe_schema::*;
}
