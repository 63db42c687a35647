//! Runs the engine over a set of files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::configuration::Configuration;
use crate::error::EngineError;
use crate::file::File;
use crate::file_pipeline::{self, RunContext};
use crate::file_set::FileSet;
use crate::finder::{FinderOptions, find};
use crate::ignore::Ignore;
use crate::options::{EngineOptions, Prepared, RunSettings};
use crate::reporter::{ReportOptions, report};
use crate::statistics::Statistics;

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    /// `1` when the run failed, see [`Statistics::failed`], `0` otherwise.
    pub code: i32,
    /// The given files, sorted by path.
    pub files: Vec<File>,
    /// Where every file of the run came from, including files plugins
    /// added, resolved against `cwd`.
    pub origins: Vec<PathBuf>,
}

/// Processes files according to `options`.
///
/// Every file problem ends up as a message on its file. An error is returned
/// only for options that do not make sense, before anything is processed.
pub async fn run(options: EngineOptions) -> Result<RunOutcome, EngineError> {
    let Prepared {
        mut settings,
        files: inputs,
        stream_in,
        configuration,
        ignore,
        ignore_patterns,
        silently_ignore,
    } = options.prepare()?;

    let configuration = Arc::new(Configuration::new(configuration));

    let mut files = Vec::new();
    let had_inputs = !inputs.is_empty();

    if had_inputs {
        if settings.file_path.is_some() {
            return Err(EngineError::setup(
                "Do not pass both `file_path` and real files.\nDid you mean to pass stdin instead of files?",
            ));
        }

        let found = find(
            inputs,
            &FinderOptions {
                cwd: settings.cwd.clone(),
                extensions: settings.extensions.clone(),
                ignore: Arc::new(Ignore::new(ignore)),
                ignore_patterns,
                silently_ignore,
            },
        )
        .await?;

        files = found.files;
        for file in &mut files {
            file.given = true;
        }
        if settings.out.is_none() {
            settings.out = Some(found.one_file_mode);
        }
    } else {
        let value = stream_in.read_all().await?;
        debug!("Read from `stream_in`");

        let mut file = match &settings.file_path {
            Some(path) => File::with_path(&settings.cwd, path),
            None => File::new(&settings.cwd),
        };
        file.value = Some(value);
        file.given = true;
        file.stream_in = true;
        files.push(file);

        if settings.out.is_none() {
            settings.out = Some(true);
        }
    }

    let (files, origins) = process(settings.clone(), configuration, files).await?;

    log(&settings, &files).await?;

    let failed = Statistics::of_files(&files).failed(settings.frail);
    Ok(RunOutcome {
        code: i32::from(failed),
        files,
        origins: origins
            .into_iter()
            .filter(|origin| !origin.is_empty())
            .map(|origin| settings.cwd.join(origin))
            .collect(),
    })
}

/// Runs every file through the file pipeline, including files added while
/// running, and returns the given ones in their original order with the
/// origins of all of them.
async fn process(
    settings: RunSettings,
    configuration: Arc<Configuration>,
    files: Vec<File>,
) -> Result<(Vec<File>, Vec<String>), EngineError> {
    if files.is_empty() {
        return Ok((files, Vec::new()));
    }

    let (file_set, mut added) = FileSet::new();
    let context = Arc::new(RunContext {
        settings,
        configuration,
        file_set: file_set.clone(),
    });

    let order: Vec<String> = files.iter().map(File::origin).collect();
    for file in files {
        file_set.add(file);
    }
    info!("Processing {} files", order.len());

    let mut tasks = JoinSet::new();
    let mut finished = HashMap::new();

    loop {
        tokio::select! {
            Some(file) = added.recv() => {
                let context = Arc::clone(&context);
                tasks.spawn(async move { file_pipeline::run(&context, file).await });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                let file = joined.map_err(|e| EngineError::plugin(format!("Cannot process file: {e}")))?;
                finished.insert(file.origin(), file);
                if file_set.one() {
                    break;
                }
            }
            else => break,
        }
    }

    debug!("Processed {} files", finished.len());
    let files = order
        .iter()
        .filter_map(|origin| finished.remove(origin))
        .collect();
    Ok((files, file_set.origins()))
}

async fn log(settings: &RunSettings, files: &[File]) -> Result<(), EngineError> {
    let reported: Vec<&File> = files
        .iter()
        .filter(|file| file.given && !file.ignored)
        .collect();

    let mut diagnostics = report(
        &reported,
        ReportOptions {
            color: settings.color,
            quiet: settings.quiet,
            silent: settings.silent,
            verbose: settings.verbose,
        },
    );

    if !diagnostics.is_empty() {
        if !diagnostics.ends_with('\n') {
            diagnostics.push('\n');
        }
        settings.stream_error.write(&diagnostics).await?;
    }
    Ok(())
}
