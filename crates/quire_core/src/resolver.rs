//! Plugin resolution logic.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::configuration::{is_executable, parse_data};
use crate::error::PluginError;
use crate::plugin::{Module, Plugin, Preset};

/// Locates a resolved module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleHandle {
    /// A module registered under a name.
    Named(String),
    /// A module on disk.
    Path(PathBuf),
}

impl ModuleHandle {
    /// Directory nested specifiers of this module resolve from.
    pub fn dir(&self) -> Option<&Path> {
        match self {
            Self::Named(_) => None,
            Self::Path(path) => path.parent(),
        }
    }
}

/// Turns plugin specifiers into plugins and presets.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Finds the module `specifier` refers to, as seen from the directory
    /// `from`. Bare names are also tried with `prefix` in front.
    async fn resolve(
        &self,
        specifier: &str,
        from: &Path,
        prefix: Option<&str>,
    ) -> Result<ModuleHandle, PluginError>;

    /// Loads a resolved module.
    async fn load(&self, handle: &ModuleHandle) -> Result<Module, PluginError>;
}

const PRESET_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Resolver backed by modules registered in-process and preset files on
/// disk.
///
/// Bare names are looked up in this order:
/// 1. modules registered under the name
/// 2. `.quire/presets/<name>.{json,yaml,yml}` in `from` or any ancestor
/// 3. `$HOME/.quire/presets/<name>.{json,yaml,yml}`
///
/// With a prefix, `<prefix>-<name>` (or `@scope/<prefix>-<name>`) is tried
/// before `<name>` at every step. Specifiers starting with `.` or `/` are
/// paths relative to `from`.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    named: HashMap<String, Module>,
    files: HashMap<PathBuf, Module>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under `name`.
    pub fn register_plugin(&mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) {
        self.named.insert(name.into(), Module::Plugin(plugin));
    }

    /// Registers a preset under `name`.
    pub fn register_preset(&mut self, name: impl Into<String>, preset: Preset) {
        self.named.insert(name.into(), Module::Preset(preset));
    }

    /// Registers what an executable module at `path` evaluates to.
    ///
    /// Executable configuration files (`.js`, `.cjs`, `.mjs`) are never run;
    /// they load only when registered here.
    pub fn register_file(&mut self, path: impl Into<PathBuf>, module: Module) {
        self.files.insert(path.into(), module);
    }

    fn candidates(specifier: &str, prefix: Option<&str>) -> Vec<String> {
        let Some(prefix) = prefix.filter(|prefix| !prefix.is_empty()) else {
            return vec![specifier.to_string()];
        };
        let prefix = if prefix.ends_with('-') {
            prefix.to_string()
        } else {
            format!("{prefix}-")
        };

        let (scope, name) = match specifier.split_once('/') {
            Some((scope, name)) if scope.starts_with('@') => (format!("{scope}/"), name),
            _ => (String::new(), specifier),
        };

        let mut candidates = Vec::new();
        if !name.starts_with(&prefix) {
            candidates.push(format!("{scope}{prefix}{name}"));
        }
        candidates.push(format!("{scope}{name}"));
        candidates
    }

    fn find_preset_file(&self, name: &str, from: &Path) -> Option<PathBuf> {
        if !is_valid_name(name) {
            return None;
        }

        let home = dirs::home_dir();
        from.ancestors()
            .chain(home.as_deref())
            .flat_map(|dir| {
                PRESET_EXTENSIONS
                    .iter()
                    .map(move |ext| dir.join(".quire").join("presets").join(format!("{name}.{ext}")))
            })
            .find(|path| path.is_file())
    }
}

/// Accepts `name` and `@scope/name`, nothing that could escape a directory.
fn is_valid_name(name: &str) -> bool {
    let components: Vec<_> = Path::new(name).components().collect();
    match components.as_slice() {
        [Component::Normal(_)] => true,
        [Component::Normal(scope), Component::Normal(_)] => {
            scope.to_string_lossy().starts_with('@')
        }
        _ => false,
    }
}

#[async_trait]
impl Resolver for PluginRegistry {
    async fn resolve(
        &self,
        specifier: &str,
        from: &Path,
        prefix: Option<&str>,
    ) -> Result<ModuleHandle, PluginError> {
        if specifier.starts_with('.') || Path::new(specifier).is_absolute() {
            let path = from.join(specifier);
            if self.files.contains_key(&path) || path.is_file() {
                return Ok(ModuleHandle::Path(path));
            }
            return Err(format!("Cannot find `{}`", path.display()).into());
        }

        let candidates = Self::candidates(specifier, prefix);
        for candidate in &candidates {
            if self.named.contains_key(candidate) {
                debug!("Resolved `{}` to registered `{}`", specifier, candidate);
                return Ok(ModuleHandle::Named(candidate.clone()));
            }
        }
        for candidate in &candidates {
            if let Some(path) = self.find_preset_file(candidate, from) {
                debug!("Resolved `{}` to `{}`", specifier, path.display());
                return Ok(ModuleHandle::Path(path));
            }
        }

        Err(format!("Cannot find `{}` from `{}`", candidates.join("` or `"), from.display()).into())
    }

    async fn load(&self, handle: &ModuleHandle) -> Result<Module, PluginError> {
        match handle {
            ModuleHandle::Named(name) => self
                .named
                .get(name)
                .cloned()
                .ok_or_else(|| format!("Nothing registered as `{name}`").into()),
            ModuleHandle::Path(path) => {
                if let Some(module) = self.files.get(path) {
                    return Ok(module.clone());
                }
                if is_executable(path) {
                    return Err(format!(
                        "Cannot run `{}`, executable modules must be registered",
                        path.display()
                    )
                    .into());
                }
                let contents = tokio::fs::read(path).await?;
                let value = parse_data(&contents, path)?;
                Ok(Module::Preset(Preset::from_value(&value)?))
            }
        }
    }
}
