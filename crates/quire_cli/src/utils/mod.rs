//! CLI utility functions

use std::path::PathBuf;

use miette::{IntoDiagnostic, Result, WrapErr};
use tokio::runtime::Runtime;

pub fn create_tokio_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()
}

/// Directory that files, globs and configuration resolve against.
pub fn working_directory() -> Result<PathBuf> {
    std::env::current_dir()
        .into_diagnostic()
        .wrap_err("Cannot read the current directory")
}
