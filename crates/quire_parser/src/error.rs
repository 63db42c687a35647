//! Parse error types.

use thiserror::Error;

/// Errors that can occur while parsing or serializing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The source text is invalid.
    #[error("Invalid source: {message}")]
    InvalidSource {
        /// Error message.
        message: String,
    },

    /// The tree cannot be serialized by this processor.
    #[error("Cannot serialize node `{0}`")]
    Unsupported(String),
}

impl ParseError {
    /// Creates a new invalid source error.
    pub fn invalid_source(message: impl Into<String>) -> Self {
        Self::InvalidSource {
            message: message.into(),
        }
    }

    /// Creates a new unsupported node error.
    pub fn unsupported(node_type: impl Into<String>) -> Self {
        Self::Unsupported(node_type.into())
    }
}
