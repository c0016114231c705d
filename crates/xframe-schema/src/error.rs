/// Errors that can occur during schema validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema for '{message_type}': {message}")]
    CompileFailed {
        message_type: String,
        message: String,
    },

    /// The envelope failed schema validation.
    #[error("validation failed for '{message_type}': {message}")]
    ValidationFailed {
        message_type: String,
        message: String,
    },

    /// The input is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The envelope carries no `type` field.
    #[error("envelope has no message type")]
    MissingType,

    /// No schema registered for the given message type.
    #[error("no schema registered for '{0}'")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
