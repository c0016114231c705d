//! Sentinel-bound cross-frame messaging context for embedded creatives.
//!
//! This is the layer creative code talks to. Construct a [`FrameContext`]
//! over the frame's window, then observe visibility and intersections or
//! request resizes. All traffic flows through one listener that only accepts
//! messages from the resolved target window carrying this frame's sentinel.

pub mod boot;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod registry;
pub mod sentinel;

pub use boot::{BootContext, BootData, ContextMetadata};
pub use config::ContextConfig;
pub use context::{FrameContext, FrameContextBuilder, MetadataSubscription};
pub use dispatch::{DispatchOutcome, Dispatcher, LoopState};
pub use error::{ContextError, Result};
pub use identity::{ancestor_chain, resolve_identity, Identity};
pub use registry::{Callback, CallbackRegistry, DispatchResult, Registration};
pub use sentinel::Sentinel;
