use std::fmt;
use std::io;

use xframe_context::ContextError;
use xframe_envelope::EnvelopeError;
use xframe_schema::SchemaError;

// Exit codes follow the sysexits-style table shared by our CLIs.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn envelope_error(context: &str, err: EnvelopeError) -> CliError {
    match err {
        EnvelopeError::PayloadNotObject { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        EnvelopeError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn context_error(context: &str, err: ContextError) -> CliError {
    match err {
        ContextError::MalformedSentinel(_)
        | ContextError::MissingBootData
        | ContextError::InvalidBootData(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ContextError::InvalidDepth { .. } | ContextError::InvalidConfig(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        ContextError::AncestorChainTooDeep { .. } => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    match err {
        SchemaError::ValidationFailed { .. }
        | SchemaError::InvalidJson(_)
        | SchemaError::MissingType
        | SchemaError::NoSchema(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_problems_are_data_errors() {
        let err = context_error("boot", ContextError::MissingBootData);
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("boot: "));
    }

    #[test]
    fn depth_problems_are_usage_errors() {
        let err = context_error(
            "replay",
            ContextError::InvalidDepth {
                depth: 3,
                ancestors: 1,
            },
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn io_permission_maps_to_50() {
        let err = io_error(
            "read",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn non_object_payload_is_usage() {
        let err = envelope_error("encode", EnvelopeError::PayloadNotObject { kind: "array" });
        assert_eq!(err.code, USAGE);
    }
}
