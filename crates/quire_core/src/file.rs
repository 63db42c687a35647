//! The virtual file that flows through the pipelines.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use quire_tree::Node;

use crate::message::{Message, Severity};

/// A file with its path history, contents, tree and diagnostics.
///
/// Paths are stored as given and resolved against `cwd` when touching the
/// file system. The first history entry is the file's origin and never
/// changes once set, which is what a [`crate::FileSet`] de-duplicates on.
#[derive(Debug, Default)]
pub struct File {
    /// Directory that relative paths resolve against.
    pub cwd: PathBuf,
    history: Vec<PathBuf>,
    /// Text contents, once read or streamed in.
    pub value: Option<String>,
    /// Syntax tree, once parsed.
    pub tree: Option<Node>,
    pub messages: Vec<Message>,
    /// Plugin scratch space.
    pub data: FileData,
    /// Set once the file was written to disk.
    pub stored: bool,
    /// True for files that were explicitly requested, as opposed to files
    /// plugins discovered on their own.
    pub given: bool,
    /// Ignored files are neither reported nor written.
    pub ignored: bool,
    /// The value came from the input stream.
    pub stream_in: bool,
}

impl File {
    /// Creates a file without a path.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    /// Creates a file at `path`.
    pub fn with_path(cwd: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        let mut file = Self::new(cwd);
        file.history.push(path.into());
        file
    }

    /// Sets the contents.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Current path.
    pub fn path(&self) -> Option<&Path> {
        self.history.last().map(PathBuf::as_path)
    }

    /// Every path this file had, oldest first.
    pub fn history(&self) -> &[PathBuf] {
        &self.history
    }

    /// Key identifying where the file came from.
    pub fn origin(&self) -> String {
        self.history
            .first()
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    }

    /// Current path resolved against `cwd`.
    pub fn absolute_path(&self) -> Option<PathBuf> {
        self.path().map(|path| self.cwd.join(path))
    }

    /// Current path as display text, empty when there is none.
    pub fn display_path(&self) -> String {
        self.path()
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    }

    /// Moves the file to `path`, recording the old path in its history.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.path() != Some(path.as_path()) {
            self.history.push(path);
        }
    }

    /// Replaces the whole history with `path`.
    pub(crate) fn reset_history(&mut self, path: impl Into<PathBuf>) {
        self.history = vec![path.into()];
    }

    /// Changes the extension; `extension` may start with a dot.
    ///
    /// Does nothing for files without a path.
    pub fn set_extension(&mut self, extension: &str) {
        if let Some(path) = self.path() {
            let path = path.with_extension(extension.trim_start_matches('.'));
            self.set_path(path);
        }
    }

    /// Moves the file into `dirname`, keeping its basename.
    pub fn set_dirname(&mut self, dirname: impl AsRef<Path>) {
        if let Some(basename) = self.path().and_then(Path::file_name) {
            let path = dirname.as_ref().join(basename);
            self.set_path(path);
        }
    }

    /// File name with extension.
    pub fn basename(&self) -> Option<String> {
        self.path()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// File name without extension.
    pub fn stem(&self) -> Option<String> {
        self.path()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    /// Extension including the leading dot.
    pub fn extname(&self) -> Option<String> {
        self.path()
            .and_then(Path::extension)
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }

    /// Directory part of the current path.
    pub fn dirname(&self) -> Option<&Path> {
        self.path().and_then(Path::parent)
    }

    /// Returns true if any message is fatal.
    pub fn has_fatal(&self) -> bool {
        self.messages.iter().any(Message::is_fatal)
    }

    /// Attaches a message, stamping it with this file's path.
    pub fn push(&mut self, mut message: Message) {
        message.file = self.display_path();
        self.messages.push(message);
    }

    /// Attaches a fatal message.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.push(Message::new(reason).with_severity(Severity::Error));
    }

    /// Attaches a fatal message with an underlying cause.
    pub fn fail_with(&mut self, reason: impl Into<String>, cause: impl fmt::Display) {
        self.push(
            Message::new(reason)
                .with_severity(Severity::Error)
                .with_cause(cause.to_string()),
        );
    }

    /// Attaches an informational message.
    pub fn info(&mut self, reason: impl Into<String>) {
        self.push(Message::new(reason).with_severity(Severity::Info));
    }
}

/// Typed key/value storage plugins use to pass data along with a file.
#[derive(Default)]
pub struct FileData {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl FileData {
    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Returns the value under `key` if it has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)?.downcast_mut()
    }

    /// Removes and returns the value under `key` if it has type `T`.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let entry = self.entries.remove(key)?;
        match entry.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(entry) => {
                self.entries.insert(key.to_string(), entry);
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl fmt::Debug for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_set().entries(keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_history() {
        let mut file = File::with_path("/repo", "docs/readme.md");
        file.set_extension(".html");
        file.set_dirname("out");

        assert_eq!(file.path(), Some(Path::new("out/readme.html")));
        assert_eq!(file.origin(), "docs/readme.md");
        assert_eq!(file.history().len(), 3);
        assert_eq!(
            file.absolute_path(),
            Some(PathBuf::from("/repo/out/readme.html"))
        );
    }

    #[test]
    fn test_set_same_path_keeps_history() {
        let mut file = File::with_path("/repo", "a.md");
        file.set_path("a.md");
        assert_eq!(file.history().len(), 1);
    }

    #[test]
    fn test_path_parts() {
        let file = File::with_path("/", "docs/Guide.md");
        assert_eq!(file.basename().as_deref(), Some("Guide.md"));
        assert_eq!(file.stem().as_deref(), Some("Guide"));
        assert_eq!(file.extname().as_deref(), Some(".md"));
        assert_eq!(file.dirname(), Some(Path::new("docs")));
    }

    #[test]
    fn test_without_path() {
        let mut file = File::new("/");
        file.set_extension("md");
        assert_eq!(file.path(), None);
        assert_eq!(file.origin(), "");
    }

    #[test]
    fn test_messages() {
        let mut file = File::with_path("/", "a.md");
        file.info("fyi");
        assert!(!file.has_fatal());

        file.fail_with("Cannot process file", "boom");
        assert!(file.has_fatal());
        assert_eq!(file.messages[1].file, "a.md");
        assert_eq!(file.messages[1].cause.as_deref(), Some("boom"));
    }

    #[test]
    fn test_data() {
        let mut data = FileData::default();
        data.insert("count", 2_usize);

        assert_eq!(data.get::<usize>("count"), Some(&2));
        assert_eq!(data.get::<String>("count"), None);

        *data.get_mut::<usize>("count").unwrap() += 1;
        assert_eq!(data.remove::<String>("count"), None);
        assert_eq!(data.remove::<usize>("count"), Some(3));
        assert!(!data.contains("count"));
    }
}
