//! Marker-prefixed JSON envelope codec for cross-frame messaging.
//!
//! Every protocol message on the wire is:
//! - the fixed marker `amp-`
//! - immediately followed by a JSON object `{ sentinel, type, ...payload }`
//!
//! Anything else posted to a window is foreign traffic. Decoding never fails
//! loudly: it either yields an [`Envelope`] or `None`.

pub mod codec;
pub mod error;
pub mod message;
pub mod payload;

pub use codec::{
    decode_envelope, decode_envelope_with_marker, encode_envelope, encode_envelope_with_marker,
    has_marker, Envelope, MARKER,
};
pub use error::{EnvelopeError, Result};
pub use message::{MessageType, UnknownMessageType};
pub use payload::{
    string_or_number, EmbedContextPayload, EmbedSize, EmbedState, IntersectionChange,
    IntersectionPayload, LayoutRect, Location, ResizeOutcome,
};
