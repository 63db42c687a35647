//! Stages up to the barrier: configure, read, parse, transform.

use quire_tree::Node;
use serde_json::Value;
use tracing::debug;

use super::{ConfiguredProcessor, RunContext, is_settled};
use crate::error::EngineError;
use crate::file::File;
use crate::message::{Message, Severity};

pub(super) async fn run(
    context: &RunContext,
    file: &mut File,
    processor: &mut ConfiguredProcessor,
) -> Result<(), EngineError> {
    configure(context, file, processor).await?;
    read(context, file).await?;
    parse(context, file, processor)?;
    transform(file, processor).await
}

async fn configure(
    context: &RunContext,
    file: &mut File,
    processor: &mut ConfiguredProcessor,
) -> Result<(), EngineError> {
    if is_settled(file) {
        return Ok(());
    }

    let configuration = context.configuration.load(file.path()).await?;

    if configuration.file_path.is_none() && context.settings.ignore_unconfigured {
        debug!("Ignoring file w/o corresponding config file");
        file.ignored = true;
        return Ok(());
    }

    debug!("Using settings `{:?}`", configuration.settings);
    processor.settings = configuration.settings.clone();

    debug!("Using `{}` plugins", configuration.plugins.len());
    for (plugin, options) in &configuration.plugins {
        let options = match options {
            Some(Value::Bool(false)) => continue,
            Some(Value::Object(map)) if map.is_empty() => None,
            other => other.as_ref(),
        };

        debug!("Using plugin `{}`, with options `{:?}`", plugin.id(), options);
        let transformer = plugin
            .attach(options, Some(&context.file_set))
            .map_err(EngineError::plugin)?;
        processor.transformers.extend(transformer);
    }

    Ok(())
}

async fn read(context: &RunContext, file: &mut File) -> Result<(), EngineError> {
    if file.value.is_some() || file.stream_in {
        debug!("Not reading file `{}` with `value`", file.display_path());
        return Ok(());
    }
    if is_settled(file) {
        debug!("Not reading failed or ignored file `{}`", file.display_path());
        return Ok(());
    }

    let Some(path) = file.path().map(|path| context.settings.cwd.join(path)) else {
        return Err(EngineError::file("Cannot read file without a path"));
    };

    debug!("Reading `{}`", path.display());
    match tokio::fs::read_to_string(&path).await {
        Ok(value) => {
            file.value = Some(value);
            Ok(())
        }
        Err(e) => {
            file.value = Some(String::new());
            Err(e.into())
        }
    }
}

fn parse(
    context: &RunContext,
    file: &mut File,
    processor: &ConfiguredProcessor,
) -> Result<(), EngineError> {
    if is_settled(file) {
        return Ok(());
    }

    let value = file.value.as_deref().unwrap_or_default();

    if context.settings.tree_in {
        debug!("Not parsing already parsed document");
        match serde_json::from_str::<Node>(value) {
            Ok(tree) => file.tree = Some(tree),
            Err(e) => file.push(
                Message::new("Cannot read file as JSON")
                    .with_severity(Severity::Error)
                    .with_cause(e.to_string()),
            ),
        }

        if let Some(extension) = context.settings.extensions.first() {
            file.set_extension(extension);
        }
        file.value = Some(String::new());
        return Ok(());
    }

    debug!("Parsing `{}`", file.display_path());
    let tree = processor.processor.parse(value, &processor.settings)?;
    file.tree = Some(tree);
    debug!("Parsed document");
    Ok(())
}

async fn transform(file: &mut File, processor: &ConfiguredProcessor) -> Result<(), EngineError> {
    if is_settled(file) {
        return Ok(());
    }
    let Some(mut tree) = file.tree.take() else {
        return Ok(());
    };

    debug!("Transforming document `{}`", file.display_path());
    let mut result = Ok(());
    for transformer in &processor.transformers {
        result = transformer.transform(&mut tree, file).await;
        if result.is_err() {
            break;
        }
    }
    file.tree = Some(tree);

    result.map_err(EngineError::plugin)
}
