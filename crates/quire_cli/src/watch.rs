//! Watch mode: processes files again when they change.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use quire_core::{EngineOptions, File, Input, RunOutcome, run};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::options::engine_options;

/// Processes the given files, then every file of the run again when it
/// changes, until Ctrl-C.
///
/// Nothing is written to stdout while watching. Overwriting the input files
/// with `--output` waits for Ctrl-C, after which everything is processed once
/// more with writing turned on. Returns whether the last run failed.
pub async fn watch(cli: &Cli, cwd: PathBuf) -> Result<bool> {
    if cli.files.is_empty() {
        miette::bail!("No input, `--watch` needs files");
    }

    let defer_output = matches!(cli.output, Some(None));
    eprintln!("Watching... (press CTRL+C to exit)");
    if defer_output {
        eprintln!("Note: Ignoring `--output` until exit.");
    }

    let outcome = run(watching(cli, &cwd, None, defer_output)?)
        .await
        .into_diagnostic()?;
    let mut failed = outcome.code != 0;

    let (sender, mut changes) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| {
            if let Ok(event) = result
                && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            {
                for path in event.paths {
                    let _ = sender.send(path);
                }
            }
        },
        Config::default(),
    )
    .into_diagnostic()?;

    let mut watched = HashSet::new();
    watch_origins(&mut watcher, &mut watched, &outcome);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(path) = changes.recv() => {
                // One save is often reported as several events.
                let mut paths = BTreeSet::from([path]);
                while let Ok(path) = changes.try_recv() {
                    paths.insert(path);
                }

                for path in paths {
                    debug!("Changed `{}`", path.display());
                    let outcome = run(watching(cli, &cwd, Some(&path), defer_output)?)
                        .await
                        .into_diagnostic()?;
                    failed = outcome.code != 0;
                    watch_origins(&mut watcher, &mut watched, &outcome);
                }
            }
            signal = &mut ctrl_c => {
                signal.into_diagnostic()?;
                eprintln!();
                break;
            }
            else => break,
        }
    }
    drop(watcher);

    if defer_output {
        info!("Writing files");
        let outcome = run(engine_options(cli, cwd).into_diagnostic()?)
            .await
            .into_diagnostic()?;
        failed = outcome.code != 0;
    }

    Ok(failed)
}

/// Options of a run while watching, over `changed` or else the given files.
fn watching(
    cli: &Cli,
    cwd: &Path,
    changed: Option<&Path>,
    defer_output: bool,
) -> Result<EngineOptions> {
    let mut options = engine_options(cli, cwd.to_path_buf()).into_diagnostic()?;
    options.out = Some(false);
    if defer_output {
        options.output = None;
    }
    if let Some(path) = changed {
        options.files = vec![Input::File(File::with_path(cwd, path))];
    }
    Ok(options)
}

fn watch_origins(
    watcher: &mut RecommendedWatcher,
    watched: &mut HashSet<PathBuf>,
    outcome: &RunOutcome,
) {
    for origin in &outcome.origins {
        if watched.contains(origin) {
            continue;
        }
        match watcher.watch(origin, RecursiveMode::NonRecursive) {
            Ok(()) => {
                watched.insert(origin.clone());
            }
            Err(e) => debug!("Cannot watch `{}`: {}", origin.display(), e),
        }
    }
    info!("Watching {} files", watched.len());
}
