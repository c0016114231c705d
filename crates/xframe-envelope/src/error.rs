/// Errors that can occur while encoding envelopes.
///
/// Decoding has no error type: malformed input is not a protocol message.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The payload could not be serialized.
    #[error("envelope json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload serialized to something other than a JSON object.
    #[error("envelope payload must be a JSON object (got {kind})")]
    PayloadNotObject { kind: &'static str },
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
