/// Errors that abort frame context construction.
///
/// Per-message problems never surface as errors; see
/// [`crate::DispatchOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The sentinel does not have the `<depth>-<random>` shape.
    #[error("malformed sentinel '{0}' (expected '<depth>-<random>')")]
    MalformedSentinel(String),

    /// The sentinel depth does not index into the ancestor chain.
    #[error("sentinel depth {depth} out of range ({ancestors} ancestors)")]
    InvalidDepth { depth: usize, ancestors: usize },

    /// Walking parent links did not reach a top-level window in time.
    #[error("ancestor chain exceeds {max} windows")]
    AncestorChainTooDeep { max: usize },

    /// Neither the window name nor the hash carried boot data.
    #[error("no boot data in window name or location hash")]
    MissingBootData,

    /// Boot data was present but unusable.
    #[error("invalid boot data: {0}")]
    InvalidBootData(String),

    /// The context configuration is unusable.
    #[error("invalid context config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
