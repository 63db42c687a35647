//! quire CLI
//!
//! Processes markdown files through configured plugins, checks their links
//! and reports what was found.

mod cli;
mod options;
mod utils;
mod watch;

use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::options::engine_options;
use crate::utils::{create_tokio_runtime, working_directory};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries processed documents, so logs go to stderr.
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::from(1),
        Ok(false) => ExitCode::SUCCESS,
        Err(e) => {
            // Shown whatever the log filter is.
            eprintln!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the run failed.
fn run(cli: Cli) -> Result<bool> {
    let cwd = working_directory()?;
    let rt = create_tokio_runtime()?;

    rt.block_on(async move {
        if cli.watch {
            return watch::watch(&cli, cwd).await;
        }

        let options = engine_options(&cli, cwd).into_diagnostic()?;
        let outcome = quire_core::run(options).await.into_diagnostic()?;
        debug!("Processed {} files", outcome.files.len());
        Ok(outcome.code != 0)
    })
}
