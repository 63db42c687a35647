//! Engine error types.

use std::path::Path;

use thiserror::Error;

/// Boxed error raised by plugins, transformers, completers and resolvers.
pub type PluginError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Contradictory or incomplete options. Aborts the run before any file
    /// is processed.
    #[error("{0}")]
    Setup(String),

    /// A configuration or ignore file could not be read or parsed.
    #[error(transparent)]
    Lookup(#[from] FindUpError),

    /// A configuration value has the wrong shape.
    #[error("{0}")]
    Config(String),

    /// A plugin failed to attach, transform or complete.
    #[error("{0}")]
    Plugin(String),

    /// Parsing or serializing a tree failed.
    #[error(transparent)]
    Parse(#[from] quire_parser::ParseError),

    /// Reading or writing a file failed.
    #[error("{0}")]
    File(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a setup error.
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a file error.
    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }

    /// Creates a plugin error from anything printable.
    pub fn plugin(error: impl std::fmt::Display) -> Self {
        Self::Plugin(error.to_string())
    }
}

/// A failed upward lookup.
///
/// Cloneable so that every caller coalesced on one directory receives the
/// same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FindUpError {
    #[error("Cannot read file `{path}`\n{cause}")]
    Read { path: String, cause: String },

    #[error("Cannot parse file `{path}`\n{cause}")]
    Parse { path: String, cause: String },

    #[error("Cannot read given file `{path}`\n{cause}")]
    ReadGiven { path: String, cause: String },

    #[error("Cannot parse given file `{path}`\n{cause}")]
    ParseGiven { path: String, cause: String },
}

impl FindUpError {
    pub(crate) fn read(path: &Path, cause: impl std::fmt::Display, given: bool) -> Self {
        let path = path.display().to_string();
        let cause = cause.to_string();
        if given {
            Self::ReadGiven { path, cause }
        } else {
            Self::Read { path, cause }
        }
    }

    pub(crate) fn parse(path: &Path, cause: impl std::fmt::Display, given: bool) -> Self {
        let path = path.display().to_string();
        let cause = cause.to_string();
        if given {
            Self::ParseGiven { path, cause }
        } else {
            Self::Parse { path, cause }
        }
    }
}
