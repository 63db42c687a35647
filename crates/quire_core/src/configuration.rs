//! Configuration files and the plugins and settings they resolve to.
//!
//! The configuration of a file is the nearest configuration file found by
//! [`FindUp`] (or the default configuration when there is none), with the
//! configuration given by the caller merged on top.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use jsonc_parser::ParseOptions;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EngineError, PluginError};
use crate::find_up::{FindUp, FindUpOptions, Loader};
use crate::plugin::{MissingPlugin, Module, Pluggable, Plugin, PluginEntry, Preset};
use crate::resolver::{ModuleHandle, Resolver};
use crate::settings::{Settings, deep_merge, merge_options};

/// Extensions tried after the bare configuration file name, in order.
const RC_EXTENSIONS: &[&str] = &[".json", ".cjs", ".mjs", ".js", ".yaml", ".yml"];

const PACKAGE_JSON: &str = "package.json";

/// Hook run over raw configuration data before it is read as a preset.
pub type ConfigTransform = Arc<dyn Fn(Value, &Path) -> Value + Send + Sync>;

/// Returns true for configuration files that are modules rather than data.
pub(crate) fn is_executable(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("js" | "cjs" | "mjs")
    )
}

/// Parses configuration data: YAML for `.yaml` and `.yml`, JSON with
/// comments otherwise.
pub(crate) fn parse_data(contents: &[u8], path: &Path) -> Result<Value, PluginError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => Ok(serde_yaml::from_slice(contents)?),
        _ => {
            let text = std::str::from_utf8(contents)?;
            let value = jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
                .map_err(|e| e.to_string())?;
            Ok(value.unwrap_or(Value::Null))
        }
    }
}

/// Plugins and settings that apply to a file.
#[derive(Default)]
pub struct ConfigResult {
    /// The configuration file these came from, if one was found.
    pub file_path: Option<PathBuf>,
    pub plugins: Vec<(Arc<dyn Plugin>, Option<Value>)>,
    pub settings: Settings,
}

impl fmt::Debug for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResult")
            .field("file_path", &self.file_path)
            .field(
                "plugins",
                &self
                    .plugins
                    .iter()
                    .map(|(plugin, options)| (plugin.id(), options))
                    .collect::<Vec<_>>(),
            )
            .field("settings", &self.settings)
            .finish()
    }
}

impl ConfigResult {
    /// Adds `plugin`, merging options into an earlier entry of the same
    /// plugin instance. Plugins that only share an id stay separate.
    fn add_plugin(&mut self, plugin: Arc<dyn Plugin>, options: Option<Value>) {
        let options = options.filter(|options| !options.is_null());
        match self
            .plugins
            .iter_mut()
            .find(|(existing, _)| Arc::ptr_eq(existing, &plugin))
        {
            Some((_, existing)) => *existing = merge_options(existing.take(), options),
            None => self.plugins.push((plugin, options)),
        }
    }
}

/// Options for [`Configuration`].
#[derive(Clone)]
pub struct ConfigurationOptions {
    pub cwd: PathBuf,
    /// Base name of configuration files, such as `.quirerc`.
    pub rc_name: Option<String>,
    /// Field of `package.json` holding configuration.
    pub package_field: Option<String>,
    pub detect_config: bool,
    /// Use exactly this configuration file.
    pub rc_path: Option<PathBuf>,
    /// Prefix tried in front of bare plugin names.
    pub plugin_prefix: Option<String>,
    pub config_transform: Option<ConfigTransform>,
    /// Used when no configuration file is found.
    pub default_config: Option<Preset>,
    /// Plugins given by the caller, merged over every configuration.
    pub plugins: Vec<PluginEntry>,
    /// Settings given by the caller, merged over every configuration.
    pub settings: Settings,
    pub resolver: Arc<dyn Resolver>,
}

struct ConfigLoader {
    cwd: PathBuf,
    package_field: Option<String>,
    prefix: Option<String>,
    transform: Option<ConfigTransform>,
    default_config: Option<Preset>,
    given: Preset,
    resolver: Arc<dyn Resolver>,
}

#[async_trait]
impl Loader for ConfigLoader {
    type Output = ConfigResult;

    async fn load(
        &self,
        contents: Vec<u8>,
        path: &Path,
    ) -> Result<Option<ConfigResult>, PluginError> {
        let result = self.create(Some(contents), Some(path)).await?;
        Ok(result.file_path.is_some().then_some(result))
    }
}

impl ConfigLoader {
    async fn create(
        &self,
        contents: Option<Vec<u8>>,
        file_path: Option<&Path>,
    ) -> Result<ConfigResult, EngineError> {
        let mut file_path = file_path.map(Path::to_path_buf);
        let mut preset = None;

        if let (Some(contents), Some(path)) = (contents, file_path.as_deref()) {
            preset = self.read(contents, path).await?;
        }

        // A `package.json` without the field is no configuration file.
        if preset.is_none()
            && file_path
                .as_deref()
                .and_then(Path::file_name)
                .is_some_and(|name| name == PACKAGE_JSON)
        {
            file_path = None;
        }

        let mut result = ConfigResult::default();
        match (preset, file_path.as_deref().and_then(Path::parent)) {
            (Some(preset), Some(dir)) => self.merge(&mut result, preset, dir.to_path_buf()).await?,
            _ => {
                if let Some(default_config) = &self.default_config {
                    self.merge(&mut result, default_config.clone(), self.cwd.clone())
                        .await?;
                }
            }
        }
        self.merge(&mut result, self.given.clone(), self.cwd.clone())
            .await?;

        result.file_path = file_path;
        Ok(result)
    }

    async fn read(&self, contents: Vec<u8>, path: &Path) -> Result<Option<Preset>, EngineError> {
        if is_executable(path) {
            let module = self
                .resolver
                .load(&ModuleHandle::Path(path.to_path_buf()))
                .await
                .map_err(|e| {
                    EngineError::config(format!("Cannot import `{}`\n{}", self.relative(path), e))
                })?;
            return match module {
                Module::Preset(preset) => Ok(Some(preset)),
                Module::Plugin(plugin) => Err(EngineError::config(format!(
                    "Expected preset, not `{}`",
                    plugin.id()
                ))),
            };
        }

        let mut value =
            parse_data(&contents, path).map_err(|e| EngineError::config(e.to_string()))?;

        if let Some(field) = &self.package_field
            && path.file_name().is_some_and(|name| name == PACKAGE_JSON)
        {
            value = value.get(field).cloned().unwrap_or(Value::Null);
        }

        if value.is_null() {
            return Ok(None);
        }

        if let Some(transform) = &self.transform {
            value = transform(value, path);
        }

        Preset::from_value(&value).map(Some)
    }

    fn merge<'a>(
        &'a self,
        target: &'a mut ConfigResult,
        preset: Preset,
        root: PathBuf,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        async move {
            for entry in preset.plugins {
                match entry.pluggable {
                    Pluggable::Specifier(specifier) => {
                        self.add_module(target, &specifier, entry.options, &root)
                            .await?
                    }
                    Pluggable::Plugin(plugin) => target.add_plugin(plugin, entry.options),
                    Pluggable::Preset(preset) => {
                        self.merge(target, *preset, root.clone()).await?
                    }
                }
            }
            deep_merge(&mut target.settings, preset.settings);
            Ok(())
        }
        .boxed()
    }

    async fn add_module(
        &self,
        target: &mut ConfigResult,
        specifier: &str,
        options: Option<Value>,
        root: &Path,
    ) -> Result<(), EngineError> {
        let handle = match self
            .resolver
            .resolve(specifier, root, self.prefix.as_deref())
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot find module `{}`: {}", specifier, e);
                target.add_plugin(Arc::new(MissingPlugin::new(specifier, e)), options);
                return Ok(());
            }
        };

        debug!("Loading `{}` as {:?}", specifier, handle);
        let module = self.resolver.load(&handle).await.map_err(|e| {
            EngineError::config(format!("Cannot import `{}`\n{}", specifier, e))
        })?;

        match module {
            Module::Plugin(plugin) => target.add_plugin(plugin, options),
            Module::Preset(preset) => {
                let dir = handle.dir().unwrap_or(root).to_path_buf();
                self.merge(target, preset, dir).await.map_err(|e| {
                    EngineError::config(format!("Cannot use preset `{}`\n{}", specifier, e))
                })?;
            }
        }
        Ok(())
    }

    fn relative(&self, path: &Path) -> String {
        pathdiff::diff_paths(path, &self.cwd)
            .unwrap_or_else(|| path.to_path_buf())
            .display()
            .to_string()
    }
}

/// Finds and loads the configuration of files.
pub struct Configuration {
    cwd: PathBuf,
    find_up: FindUp<ConfigLoader>,
}

impl Configuration {
    pub fn new(options: ConfigurationOptions) -> Self {
        let mut names = Vec::new();
        if let Some(rc_name) = &options.rc_name {
            names.push(rc_name.clone());
            names.extend(RC_EXTENSIONS.iter().map(|ext| format!("{rc_name}{ext}")));
            debug!("Looking for `{:?}` configuration files", names);
        }
        if let Some(field) = &options.package_field {
            names.push(PACKAGE_JSON.to_string());
            debug!("Looking for `{}` fields in `package.json` files", field);
        }

        let loader = ConfigLoader {
            cwd: options.cwd.clone(),
            package_field: options.package_field,
            prefix: options.plugin_prefix,
            transform: options.config_transform,
            default_config: options.default_config,
            given: Preset {
                plugins: options.plugins,
                settings: options.settings,
            },
            resolver: options.resolver,
        };

        let find_up = FindUp::new(
            FindUpOptions {
                cwd: options.cwd.clone(),
                names,
                file_path: options.rc_path,
                detect: options.detect_config,
            },
            loader,
        );

        Self {
            cwd: options.cwd,
            find_up,
        }
    }

    /// Loads the configuration that applies to `file_path`.
    ///
    /// Files without a path (such as stdin) are configured as if they were
    /// in the working directory.
    pub async fn load(&self, file_path: Option<&Path>) -> Result<Arc<ConfigResult>, EngineError> {
        let file_path = match file_path {
            Some(path) => path.to_path_buf(),
            None => self.cwd.join("stdin.js"),
        };

        if let Some(found) = self.find_up.load(&file_path).await? {
            return Ok(found);
        }

        Ok(Arc::new(self.find_up.loader().create(None, None).await?))
    }
}
