//! Optional JSON Schema validation of inbound cross-frame envelopes.
//!
//! Validators are keyed by message type. A frame context with a registry
//! attached drops envelopes whose payload violates the schema for their type
//! before any callback sees them.

pub mod builtin;
pub mod config;
pub mod error;
pub mod registry;
pub mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
