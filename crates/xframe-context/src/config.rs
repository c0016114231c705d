use xframe_envelope::MARKER;

use crate::error::{ContextError, Result};

/// Runtime knobs for a frame context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Wire marker prefixed to every protocol message.
    pub marker: String,
    /// Origin passed to `post_message`.
    pub target_origin: String,
    /// Local event dispatched on the frame window once the context is ready.
    pub ready_event: String,
    /// Upper bound on parent hops while resolving the ancestor chain.
    pub max_ancestor_depth: usize,
    /// Inbound string payloads longer than this are ignored unparsed.
    pub max_message_len: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            marker: MARKER.to_string(),
            target_origin: "*".to_string(),
            ready_event: "windowContextCreated".to_string(),
            max_ancestor_depth: 64,
            max_message_len: 1024 * 1024,
        }
    }
}

impl ContextConfig {
    /// Reject configurations the dispatch loop cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.marker.is_empty() {
            return Err(ContextError::InvalidConfig(
                "marker must not be empty".to_string(),
            ));
        }
        if self.target_origin.is_empty() {
            return Err(ContextError::InvalidConfig(
                "target_origin must not be empty".to_string(),
            ));
        }
        if self.max_ancestor_depth == 0 {
            return Err(ContextError::InvalidConfig(
                "max_ancestor_depth must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ContextConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.marker, "amp-");
        assert_eq!(config.ready_event, "windowContextCreated");
    }

    #[test]
    fn rejects_empty_marker() {
        let config = ContextConfig {
            marker: String::new(),
            ..ContextConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ContextError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_depth_bound() {
        let config = ContextConfig {
            max_ancestor_depth: 0,
            ..ContextConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
