//! Plugins, presets and the hooks they install.
//!
//! A [`Plugin`] is attached once per file. Attaching may return a
//! [`Transformer`], which runs over that file's tree, and may register a
//! [`Completer`] on the file set, which runs once all files reached the
//! barrier.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use quire_tree::Node;
use serde_json::Value;

use crate::error::{EngineError, PluginError};
use crate::file::File;
use crate::file_set::FileSet;
use crate::settings::Settings;

/// A plugin.
pub trait Plugin: Send + Sync {
    /// Name used in logs and debug output. Repeated configuration is merged
    /// by instance, not by this id.
    fn id(&self) -> &str;

    /// Attaches the plugin for one file.
    ///
    /// `file_set` is `None` when the plugin runs outside of an engine run.
    fn attach(
        &self,
        options: Option<&Value>,
        file_set: Option<&FileSet>,
    ) -> Result<Option<Arc<dyn Transformer>>, PluginError>;
}

/// Per-file tree transform.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Inspects or changes the tree of `file`.
    ///
    /// Messages go on `file`; an error makes the file fail.
    async fn transform(&self, tree: &mut Node, file: &mut File) -> Result<(), PluginError>;
}

/// Set-level hook, run once per wave of files at the barrier.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Completers with the same id are registered only once.
    fn id(&self) -> Option<&str> {
        None
    }

    /// Runs over every file of the wave.
    ///
    /// Returned files are added to the set and processed too.
    async fn complete(&self, files: &mut [File]) -> Result<Vec<File>, PluginError>;
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plugin({})", self.id())
    }
}

/// Something that can appear in a list of plugins.
#[derive(Debug, Clone)]
pub enum Pluggable {
    /// Name or path, resolved through a [`crate::Resolver`].
    Specifier(String),
    Plugin(Arc<dyn Plugin>),
    /// Inline preset.
    Preset(Box<Preset>),
}

/// A pluggable with its options.
#[derive(Debug, Clone)]
pub struct PluginEntry {
    pub pluggable: Pluggable,
    pub options: Option<Value>,
}

impl PluginEntry {
    pub fn new(pluggable: Pluggable, options: Option<Value>) -> Self {
        Self { pluggable, options }
    }

    /// An entry naming a plugin or preset to resolve.
    pub fn specifier(specifier: impl Into<String>, options: Option<Value>) -> Self {
        Self::new(Pluggable::Specifier(specifier.into()), options)
    }

    /// An entry holding a plugin.
    pub fn plugin(plugin: Arc<dyn Plugin>, options: Option<Value>) -> Self {
        Self::new(Pluggable::Plugin(plugin), options)
    }
}

/// A shareable bundle of plugins and settings.
#[derive(Debug, Clone, Default)]
pub struct Preset {
    pub plugins: Vec<PluginEntry>,
    pub settings: Settings,
}

impl Preset {
    /// Reads a preset from configuration data.
    ///
    /// `plugins` is either a list, whose items are specifiers, inline presets
    /// or `[pluggable, options]` pairs, or a mapping from specifiers to
    /// options.
    pub fn from_value(value: &Value) -> Result<Self, EngineError> {
        let Value::Object(map) = value else {
            return Err(EngineError::config(format!(
                "Expected preset, not `{}`",
                display_value(value)
            )));
        };

        let plugins = match map.get("plugins") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(entry_from_value)
                .collect::<Result<_, _>>()?,
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(specifier, options)| {
                    PluginEntry::specifier(specifier.clone(), Some(options.clone()))
                })
                .collect(),
            Some(other) => {
                return Err(EngineError::config(format!(
                    "Expected a list or object of plugins, not `{}`",
                    display_value(other)
                )));
            }
        };

        let settings = match map.get("settings") {
            Some(Value::Object(settings)) => settings.clone(),
            _ => Settings::new(),
        };

        Ok(Self { plugins, settings })
    }
}

fn entry_from_value(value: &Value) -> Result<PluginEntry, EngineError> {
    match value {
        Value::Array(pair) => {
            let options = pair.get(1).cloned();
            match pair.first() {
                Some(first) => Ok(PluginEntry::new(pluggable_from_value(first)?, options)),
                None => Err(EngineError::config("Expected preset, not ``")),
            }
        }
        other => Ok(PluginEntry::new(pluggable_from_value(other)?, None)),
    }
}

fn pluggable_from_value(value: &Value) -> Result<Pluggable, EngineError> {
    match value {
        Value::String(specifier) => Ok(Pluggable::Specifier(specifier.clone())),
        other => Ok(Pluggable::Preset(Box::new(Preset::from_value(other)?))),
    }
}

/// Formats a value the way it reads in configuration files, strings
/// without quotes.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// What a resolved module turned out to be.
#[derive(Debug, Clone)]
pub enum Module {
    Plugin(Arc<dyn Plugin>),
    Preset(Preset),
}

/// Stands in for a plugin that could not be resolved.
///
/// Configuration keeps going; files fail when its transform runs.
pub struct MissingPlugin {
    specifier: String,
    id: String,
    cause: String,
}

impl MissingPlugin {
    pub fn new(specifier: impl Into<String>, cause: impl fmt::Display) -> Self {
        let specifier = specifier.into();
        Self {
            id: format!("missing:{specifier}"),
            specifier,
            cause: cause.to_string(),
        }
    }
}

impl Plugin for MissingPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn attach(
        &self,
        _options: Option<&Value>,
        _file_set: Option<&FileSet>,
    ) -> Result<Option<Arc<dyn Transformer>>, PluginError> {
        Ok(Some(Arc::new(MissingTransform {
            reason: format!("Cannot find module `{}`\n{}", self.specifier, self.cause),
        })))
    }
}

struct MissingTransform {
    reason: String,
}

#[async_trait]
impl Transformer for MissingTransform {
    async fn transform(&self, _tree: &mut Node, _file: &mut File) -> Result<(), PluginError> {
        Err(self.reason.clone().into())
    }
}
