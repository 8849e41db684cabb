//! Engine error types.

use prefetch_core::ConfigError;

/// Failure reported by a template's own preload step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PreloadError {
    message: String,
}

impl PreloadError {
    /// Create a preload error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by the engine.
///
/// Network and payload failures never appear here; they are recorded in the
/// route store instead.
#[derive(Debug, thiserror::Error)]
pub enum PrefetchError {
    #[error("template preload failed for {path}: {source}")]
    Preload {
        path: String,
        #[source]
        source: PreloadError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no transport configured")]
    MissingTransport,
}
