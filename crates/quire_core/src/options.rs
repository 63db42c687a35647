//! Engine options and their validation.

use std::path::PathBuf;
use std::sync::Arc;

use quire_parser::Processor;

use crate::configuration::{ConfigTransform, ConfigurationOptions};
use crate::error::EngineError;
use crate::finder::Input;
use crate::ignore::{IgnoreOptions, ResolveFrom};
use crate::io::{InputStream, OutputStream};
use crate::plugin::{PluginEntry, Preset};
use crate::resolver::{PluginRegistry, Resolver};
use crate::settings::Settings;

/// Where processed files are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Overwrite the input files.
    Overwrite,
    /// Write to this file, or into this folder.
    Path(PathBuf),
}

/// Everything a run can be configured with.
///
/// Unset options get the defaults described on each field.
#[derive(Default)]
pub struct EngineOptions {
    /// Directory paths resolve against. Defaults to the current directory.
    pub cwd: Option<PathBuf>,
    /// Paths, globs and files to process. Standard input is read when empty.
    pub files: Vec<Input>,
    /// Extensions picked when searching folders, with or without dot.
    pub extensions: Vec<String>,
    pub stream_in: InputStream,
    /// Path of the file read from `stream_in`.
    pub file_path: Option<PathBuf>,
    /// Defaults to standard output.
    pub stream_out: Option<OutputStream>,
    /// Where the report goes. Defaults to standard error.
    pub stream_error: Option<OutputStream>,
    /// Write the processed document to `stream_out`. Decided from the input
    /// when unset: on for standard input and for a single given file.
    pub out: Option<bool>,
    /// Write processed files to disk. `None` does not write.
    pub output: Option<Output>,
    /// Serialize documents even when they are not written anywhere.
    pub always_stringify: bool,
    /// Default for `tree_in` and `tree_out`.
    pub tree: bool,
    /// Read JSON trees instead of parsing.
    pub tree_in: Option<bool>,
    /// Write JSON trees instead of serializing.
    pub tree_out: Option<bool>,
    /// Write a debug dump of trees instead of serializing.
    pub inspect: bool,

    /// Base name of configuration files, such as `.quirerc`.
    pub rc_name: Option<String>,
    /// Field holding configuration in `package.json` files.
    pub package_field: Option<String>,
    /// Search for configuration files. Defaults to on when `rc_name` or
    /// `package_field` is set.
    pub detect_config: Option<bool>,
    /// Configuration file to use instead of searching.
    pub rc_path: Option<PathBuf>,
    /// Settings passed to the processor, merged over configuration files.
    pub settings: Settings,
    pub config_transform: Option<ConfigTransform>,
    /// Configuration used when no configuration file is found.
    pub default_config: Option<Preset>,

    /// Base name of ignore files, such as `.quireignore`.
    pub ignore_name: Option<String>,
    /// Search for ignore files. Defaults to on when `ignore_name` is set.
    pub detect_ignore: Option<bool>,
    /// Ignore file to use instead of searching.
    pub ignore_path: Option<PathBuf>,
    pub ignore_path_resolve_from: ResolveFrom,
    /// Extra gitignore-style patterns, relative to `cwd`.
    pub ignore_patterns: Vec<String>,
    /// Ignore files that no configuration file applies to.
    pub ignore_unconfigured: bool,
    /// Skip ignored files without a message, even when given explicitly.
    pub silently_ignore: bool,

    /// Plugins used for every file, after configuration files.
    pub plugins: Vec<PluginEntry>,
    /// Prefix tried in front of plugin names, such as `quire`.
    pub plugin_prefix: Option<String>,

    pub color: bool,
    /// Report only fatal messages.
    pub silent: bool,
    /// Do not report files without messages.
    pub quiet: bool,
    /// Treat warnings as errors for the exit code.
    pub frail: bool,
    /// Add notes and causes to the report.
    pub verbose: bool,

    /// Turns text into trees and back. Required.
    pub processor: Option<Arc<dyn Processor>>,
    /// Turns plugin names into plugins. Defaults to an empty
    /// [`PluginRegistry`].
    pub resolver: Option<Arc<dyn Resolver>>,
}

/// Validated settings shared by the stages of a run.
#[derive(Clone)]
pub struct RunSettings {
    pub cwd: PathBuf,
    pub extensions: Vec<String>,
    pub file_path: Option<PathBuf>,
    pub stream_out: OutputStream,
    pub stream_error: OutputStream,
    pub out: Option<bool>,
    pub output: Option<Output>,
    pub always_stringify: bool,
    pub tree_in: bool,
    pub tree_out: bool,
    pub inspect: bool,
    pub ignore_unconfigured: bool,
    pub color: bool,
    pub silent: bool,
    pub quiet: bool,
    pub frail: bool,
    pub verbose: bool,
    pub processor: Arc<dyn Processor>,
}

/// Options split up for the parts of a run.
pub(crate) struct Prepared {
    pub settings: RunSettings,
    pub files: Vec<Input>,
    pub stream_in: InputStream,
    pub configuration: ConfigurationOptions,
    pub ignore: IgnoreOptions,
    pub ignore_patterns: Vec<String>,
    pub silently_ignore: bool,
}

impl EngineOptions {
    /// Checks the options and fills in defaults.
    pub(crate) fn prepare(self) -> Result<Prepared, EngineError> {
        let processor = self
            .processor
            .ok_or_else(|| EngineError::setup("Missing `processor`"))?;

        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir()?,
        };

        let out = self.out;
        if self.output.is_some() && out == Some(true) {
            return Err(EngineError::setup("Cannot accept both `output` and `out`"));
        }

        let has_config = self.rc_name.is_some() || self.package_field.is_some();
        if self.detect_config == Some(true) && !has_config {
            return Err(EngineError::setup(
                "Missing `rc_name` or `package_field` with `detect_config`",
            ));
        }
        let detect_config = self.detect_config.unwrap_or(has_config);

        let has_ignore = self.ignore_name.is_some();
        let detect_ignore = self.detect_ignore.unwrap_or(has_ignore);

        if self.ignore_unconfigured && self.rc_path.is_some() {
            return Err(EngineError::setup(
                "Cannot accept both `rc_path` and `ignore_unconfigured`, as former prevents looking for configuration but the latter requires it",
            ));
        }
        if self.ignore_unconfigured && !has_config {
            return Err(EngineError::setup(
                "Missing `rc_name` or `package_field` with `ignore_unconfigured`, the former are needed to look for configuration",
            ));
        }
        if self.ignore_unconfigured && !detect_config {
            return Err(EngineError::setup(
                "Cannot use `detect_config: false` with `ignore_unconfigured`, the former prevents looking for configuration but the latter requires it",
            ));
        }
        if self.detect_ignore == Some(true) && !has_ignore {
            return Err(EngineError::setup(
                "Missing `ignore_name` with `detect_ignore`",
            ));
        }

        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                if ext.starts_with('.') {
                    ext.clone()
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(PluginRegistry::new()));

        let configuration = ConfigurationOptions {
            cwd: cwd.clone(),
            rc_name: self.rc_name,
            package_field: self.package_field,
            detect_config,
            rc_path: self.rc_path,
            plugin_prefix: self.plugin_prefix,
            config_transform: self.config_transform,
            default_config: self.default_config,
            plugins: self.plugins,
            settings: self.settings,
            resolver,
        };

        let ignore = IgnoreOptions {
            cwd: cwd.clone(),
            detect: detect_ignore,
            ignore_name: self.ignore_name,
            ignore_path: self.ignore_path,
            resolve_from: self.ignore_path_resolve_from,
        };

        let settings = RunSettings {
            cwd,
            extensions,
            file_path: self.file_path,
            stream_out: self.stream_out.unwrap_or(OutputStream::Stdout),
            stream_error: self.stream_error.unwrap_or(OutputStream::Stderr),
            out,
            output: self.output,
            always_stringify: self.always_stringify,
            tree_in: self.tree_in.unwrap_or(self.tree),
            tree_out: self.tree_out.unwrap_or(self.tree),
            inspect: self.inspect,
            ignore_unconfigured: self.ignore_unconfigured,
            color: self.color,
            silent: self.silent,
            quiet: self.quiet,
            frail: self.frail,
            verbose: self.verbose,
            processor,
        };

        Ok(Prepared {
            settings,
            files: self.files,
            stream_in: self.stream_in,
            configuration,
            ignore,
            ignore_patterns: self.ignore_patterns,
            silently_ignore: self.silently_ignore,
        })
    }
}
