//! Stages after the barrier: stringify, copy, stdout, write.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::{ConfiguredProcessor, RunContext, is_settled};
use crate::error::EngineError;
use crate::file::File;
use crate::options::Output;

pub(super) async fn run(
    context: &RunContext,
    file: &mut File,
    processor: &ConfiguredProcessor,
) -> Result<(), EngineError> {
    stringify(context, file, processor)?;
    copy(context, file).await?;
    stdout(context, file).await?;
    write(context, file).await
}

fn stringify(
    context: &RunContext,
    file: &mut File,
    processor: &ConfiguredProcessor,
) -> Result<(), EngineError> {
    let settings = &context.settings;

    if is_settled(file) {
        debug!("Not compiling failed or ignored document");
        return Ok(());
    }
    if settings.output.is_none() && settings.out != Some(true) && !settings.always_stringify {
        debug!("Not compiling document without output settings");
        return Ok(());
    }
    let Some(tree) = &file.tree else {
        return Ok(());
    };

    debug!("Compiling `{}`", file.display_path());
    let (value, extension) = if settings.inspect {
        (format!("{}\n", quire_tree::inspect(tree)), Some("txt"))
    } else if settings.tree_out {
        let json = serde_json::to_string_pretty(tree)
            .map_err(|e| EngineError::file(format!("Cannot serialize tree: {e}")))?;
        (format!("{json}\n"), Some("json"))
    } else {
        (processor.processor.stringify(tree, &processor.settings)?, None)
    };

    if let Some(extension) = extension {
        file.set_extension(extension);
    }
    file.value = Some(value);
    debug!("Serialized document");
    Ok(())
}

async fn copy(context: &RunContext, file: &mut File) -> Result<(), EngineError> {
    let Some(Output::Path(output)) = &context.settings.output else {
        debug!("Not copying");
        return Ok(());
    };
    if file.ignored {
        debug!("Not copying");
        return Ok(());
    }

    let target = context.settings.cwd.join(output);
    debug!("Copying `{}`", file.display_path());

    let folder = match tokio::fs::metadata(&target).await {
        Ok(metadata) => metadata.is_dir(),
        Err(e) if e.kind() != ErrorKind::NotFound || ends_with_separator(output) => {
            return Err(EngineError::file(format!("Cannot read output folder\n{e}")));
        }
        Err(_) => {
            let parent = target.parent().unwrap_or(Path::new("/"));
            if let Err(e) = tokio::fs::metadata(parent).await {
                return Err(EngineError::file(format!("Cannot access parent folder\n{e}")));
            }
            false
        }
    };

    if !folder && context.file_set.expected() > 1 {
        return Err(EngineError::file(format!(
            "Cannot write multiple files to single output `{}`",
            target.display()
        )));
    }

    let relative = pathdiff::diff_paths(&target, &file.cwd).unwrap_or_else(|| target.clone());
    if folder {
        file.set_dirname(relative);
    } else {
        file.set_path(relative);
    }

    debug!("Copying document to {}", file.display_path());
    Ok(())
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .ends_with(std::path::MAIN_SEPARATOR)
}

async fn stdout(context: &RunContext, file: &File) -> Result<(), EngineError> {
    let settings = &context.settings;

    if !file.given {
        debug!("Ignoring programmatically added file");
        return Ok(());
    }
    if is_settled(file) || settings.output.is_some() || settings.out != Some(true) {
        debug!("Ignoring writing to `stream_out`");
        return Ok(());
    }

    debug!("Writing document to `stream_out`");
    settings
        .stream_out
        .write(file.value.as_deref().unwrap_or_default())
        .await?;
    Ok(())
}

async fn write(context: &RunContext, file: &mut File) -> Result<(), EngineError> {
    if context.settings.output.is_none() {
        debug!("Ignoring writing to file-system");
        return Ok(());
    }
    if !file.given || file.ignored {
        debug!("Ignoring programmatically added or ignored file");
        return Ok(());
    }

    let Some(destination) = file.path().map(|path| context.settings.cwd.join(path)) else {
        return Err(EngineError::file("Cannot write file without an output path"));
    };

    if file.has_fatal() {
        debug!("Cannot write file with a fatal error");
        return Ok(());
    }

    debug!("Writing document to `{}`", destination.display());
    file.stored = true;
    tokio::fs::write(&destination, file.value.as_deref().unwrap_or_default()).await?;
    Ok(())
}
