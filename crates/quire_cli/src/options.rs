//! Turns parsed arguments into engine options.

use std::path::PathBuf;
use std::sync::Arc;

use jsonc_parser::ParseOptions;
use quire_core::{EngineOptions, Input, Output, PluginEntry, PluginRegistry, Settings};
use quire_parser::{MarkdownProcessor, Processor};
use quire_validate_links::ValidateLinks;
use serde_json::Value;
use thiserror::Error;

use crate::cli::Cli;

pub const RC_NAME: &str = ".quirerc";
pub const IGNORE_NAME: &str = ".quireignore";
pub const PACKAGE_FIELD: &str = "quireConfig";
pub const PLUGIN_PREFIX: &str = "quire";

#[derive(Debug, Error)]
pub enum ArgError {
    #[error("Cannot parse `{value}` as JSON\n{cause}")]
    Json { value: String, cause: String },

    #[error("Expected `key=value` for `--setting`, not `{0}`")]
    Setting(String),
}

/// Plugins that ship with the binary, under their full names.
pub fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register_plugin("quire-validate-links", Arc::new(ValidateLinks::new()));
    registry
}

/// Builds the options of one run over `cli.files`.
pub fn engine_options(cli: &Cli, cwd: PathBuf) -> Result<EngineOptions, ArgError> {
    let processor = Arc::new(MarkdownProcessor::new());

    let extensions = if cli.ext.is_empty() {
        processor.extensions().iter().map(|ext| ext.to_string()).collect()
    } else {
        cli.ext.clone()
    };

    let mut settings = Settings::new();
    for setting in &cli.settings {
        parse_setting(setting, &mut settings)?;
    }

    let plugins = cli
        .plugins
        .iter()
        .map(|plugin| parse_plugin(plugin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EngineOptions {
        cwd: Some(cwd),
        files: cli.files.iter().cloned().map(Input::from).collect(),
        extensions,
        file_path: cli.file_path.clone(),
        out: cli.out(),
        output: cli
            .output
            .clone()
            .map(|path| path.map_or(Output::Overwrite, Output::Path)),
        tree: cli.tree,
        tree_in: cli.tree_in.then_some(true),
        tree_out: cli.tree_out.then_some(true),
        inspect: cli.inspect,
        rc_name: Some(RC_NAME.to_string()),
        package_field: Some(PACKAGE_FIELD.to_string()),
        detect_config: Some(!cli.no_config),
        rc_path: cli.rc_path.clone(),
        settings,
        ignore_name: Some(IGNORE_NAME.to_string()),
        detect_ignore: Some(!cli.no_ignore),
        ignore_path: cli.ignore_path.clone(),
        ignore_path_resolve_from: cli.ignore_path_resolve_from.into(),
        ignore_patterns: cli.ignore_pattern.clone(),
        silently_ignore: cli.silently_ignore,
        plugins,
        plugin_prefix: Some(PLUGIN_PREFIX.to_string()),
        color: cli.color(),
        silent: cli.silent,
        quiet: cli.quiet,
        frail: cli.frail,
        verbose: cli.verbose,
        processor: Some(processor),
        resolver: Some(Arc::new(registry())),
        ..Default::default()
    })
}

/// `key=value`, where a value that is not JSON is taken as a string.
fn parse_setting(setting: &str, settings: &mut Settings) -> Result<(), ArgError> {
    let (key, value) = setting
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| ArgError::Setting(setting.to_string()))?;

    let value = parse_json(value, setting).unwrap_or_else(|_| Value::String(value.to_string()));
    settings.insert(key.trim().to_string(), value);
    Ok(())
}

/// `name`, `name={"key":"value"}` or `name=key:"value"`.
fn parse_plugin(plugin: &str) -> Result<PluginEntry, ArgError> {
    let Some((name, options)) = plugin.split_once('=') else {
        return Ok(PluginEntry::specifier(plugin, None));
    };

    let options = options.trim();
    let options = if options.is_empty() {
        None
    } else if options.starts_with('{') {
        Some(parse_json(options, plugin)?)
    } else {
        Some(parse_json(&format!("{{{options}}}"), plugin)?)
    };

    Ok(PluginEntry::specifier(name, options))
}

fn parse_json(text: &str, value: &str) -> Result<Value, ArgError> {
    let error = |cause: String| ArgError::Json {
        value: value.to_string(),
        cause,
    };

    jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
        .map_err(|e| error(e.to_string()))?
        .ok_or_else(|| error("Unexpected end of input".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use quire_core::{Pluggable, ResolveFrom};
    use rstest::rstest;
    use serde_json::json;

    fn options(args: &[&str]) -> EngineOptions {
        let cli = Cli::parse_from(std::iter::once("quire").chain(args.iter().copied()));
        engine_options(&cli, PathBuf::from("/repo")).unwrap()
    }

    #[rstest]
    #[case("bullet=\"*\"", "bullet", json!("*"))]
    #[case("bullet=*", "bullet", json!("*"))]
    #[case("gfm=false", "gfm", json!(false))]
    #[case("list={\"tight\": true}", "list", json!({ "tight": true }))]
    #[case(" padded =1", "padded", json!(1))]
    fn test_parse_setting(#[case] setting: &str, #[case] key: &str, #[case] expected: Value) {
        let mut settings = Settings::new();
        parse_setting(setting, &mut settings).unwrap();
        assert_eq!(settings.get(key), Some(&expected));
    }

    #[rstest]
    #[case("bullet")]
    #[case("=1")]
    fn test_parse_setting_without_key(#[case] setting: &str) {
        let error = parse_setting(setting, &mut Settings::new()).unwrap_err();
        assert_eq!(
            error.to_string(),
            format!("Expected `key=value` for `--setting`, not `{setting}`")
        );
    }

    #[rstest]
    #[case("validate-links", None)]
    #[case("validate-links=", None)]
    #[case("validate-links={\"repository\":false}", Some(json!({ "repository": false })))]
    #[case("validate-links=repository:false", Some(json!({ "repository": false })))]
    fn test_parse_plugin(#[case] plugin: &str, #[case] expected: Option<Value>) {
        let entry = parse_plugin(plugin).unwrap();
        assert!(matches!(&entry.pluggable, Pluggable::Specifier(name) if name == "validate-links"));
        assert_eq!(entry.options, expected);
    }

    #[test]
    fn test_parse_plugin_with_broken_options() {
        let error = parse_plugin("validate-links={").unwrap_err();
        assert!(
            error
                .to_string()
                .starts_with("Cannot parse `validate-links={` as JSON\n"),
            "{error}"
        );
    }

    #[test]
    fn test_defaults() {
        let options = options(&["docs"]);

        assert_eq!(options.cwd, Some(PathBuf::from("/repo")));
        assert_eq!(options.extensions, MarkdownProcessor::new().extensions());
        assert_eq!(options.rc_name.as_deref(), Some(RC_NAME));
        assert_eq!(options.ignore_name.as_deref(), Some(IGNORE_NAME));
        assert_eq!(options.package_field.as_deref(), Some(PACKAGE_FIELD));
        assert_eq!(options.plugin_prefix.as_deref(), Some(PLUGIN_PREFIX));
        assert_eq!(options.detect_config, Some(true));
        assert_eq!(options.detect_ignore, Some(true));
        assert_eq!(options.ignore_path_resolve_from, ResolveFrom::Dir);
        assert_eq!(options.out, None);
        assert_eq!(options.output, None);
        assert_eq!(options.tree_in, None);
        assert_eq!(options.files.len(), 1);
    }

    #[test]
    fn test_flags() {
        let options = options(&[
            "--output",
            "--no-config",
            "--no-ignore",
            "--ignore-path-resolve-from",
            "cwd",
            "--ext",
            "markdown",
            "--tree-in",
            "--frail",
            "--no-color",
        ]);

        assert_eq!(options.output, Some(Output::Overwrite));
        assert_eq!(options.detect_config, Some(false));
        assert_eq!(options.detect_ignore, Some(false));
        assert_eq!(options.ignore_path_resolve_from, ResolveFrom::Cwd);
        assert_eq!(options.extensions, vec!["markdown"]);
        assert_eq!(options.tree_in, Some(true));
        assert_eq!(options.tree_out, None);
        assert!(options.frail);
        assert!(!options.color);
        assert!(options.files.is_empty());
    }

    #[test]
    fn test_output_path() {
        let options = options(&["a.md", "-o", "out"]);
        assert_eq!(options.output, Some(Output::Path(PathBuf::from("out"))));
    }
}
