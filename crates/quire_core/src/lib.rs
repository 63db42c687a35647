//! # quire_core
//!
//! File-set processing engine for quire.
//!
//! This crate provides:
//! - Cascading configuration discovery and plugin resolution
//! - Ignore files and file discovery from paths and globs
//! - The per-file pipeline and the barrier files of one run meet at
//! - Message sorting, statistics and a plain text reporter
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quire_core::{EngineOptions, run};
//! use quire_parser::MarkdownProcessor;
//!
//! let outcome = run(EngineOptions {
//!     files: vec!["docs".into()],
//!     extensions: vec!["md".into()],
//!     rc_name: Some(".quirerc".into()),
//!     ignore_name: Some(".quireignore".into()),
//!     processor: Some(Arc::new(MarkdownProcessor::new())),
//!     ..Default::default()
//! })
//! .await?;
//!
//! std::process::exit(outcome.code);
//! ```

mod configuration;
mod engine;
mod error;
mod file;
mod file_pipeline;
mod file_set;
pub mod find_up;
mod finder;
mod ignore;
mod io;
mod message;
mod options;
mod plugin;
mod reporter;
mod resolver;
mod settings;
mod statistics;

pub use configuration::{ConfigResult, ConfigTransform, Configuration, ConfigurationOptions};
pub use engine::{RunOutcome, run};
pub use error::{EngineError, FindUpError, PluginError};
pub use file::{File, FileData};
pub use file_set::FileSet;
pub use find_up::{FindUp, FindUpOptions, Loader};
pub use finder::{FinderOptions, FinderResult, Input, find, has_magic};
pub use crate::ignore::{Ignore, IgnoreFile, IgnoreOptions, ResolveFrom};
pub use io::{InputStream, OutputStream};
pub use message::{Message, Place, Severity, compare_messages, sort_messages};
pub use options::{EngineOptions, Output, RunSettings};
pub use plugin::{
    Completer, MissingPlugin, Module, Pluggable, Plugin, PluginEntry, Preset, Transformer,
};
pub use reporter::{ReportOptions, report};
pub use resolver::{ModuleHandle, PluginRegistry, Resolver};
pub use settings::{Settings, deep_merge, merge_options};
pub use statistics::Statistics;
