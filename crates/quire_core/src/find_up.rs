//! Upward search for the nearest configuration or ignore file.
//!
//! Every directory is searched at most once per [`FindUp`]: concurrent
//! lookups of the same directory wait on one shared cell, and lookups that
//! climb into an already searched directory reuse its result.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{FindUpError, PluginError};
use crate::finder::normalize;

/// Result of a lookup: the nearest loaded file, or `None` if there is none.
pub type Lookup<T> = Result<Option<Arc<T>>, FindUpError>;

/// Turns the raw bytes of a candidate file into a value.
#[async_trait]
pub trait Loader: Send + Sync {
    type Output: Send + Sync + 'static;

    /// Loads the file at `path`.
    ///
    /// Returning `Ok(None)` means the file does not count as a match and the
    /// search continues with the next candidate.
    async fn load(&self, contents: Vec<u8>, path: &Path)
    -> Result<Option<Self::Output>, PluginError>;
}

/// Options for [`FindUp`].
#[derive(Debug, Clone, Default)]
pub struct FindUpOptions {
    /// Base directory for relative paths.
    pub cwd: PathBuf,
    /// Candidate file names, tried in order in every directory.
    pub names: Vec<String>,
    /// Load exactly this file instead of searching.
    pub file_path: Option<PathBuf>,
    /// Search at all. Ignored when `file_path` is set.
    pub detect: bool,
}

/// Cached upward file search.
pub struct FindUp<L: Loader> {
    cwd: PathBuf,
    names: Vec<String>,
    given_path: Option<PathBuf>,
    detect: bool,
    loader: L,
    cache: Mutex<HashMap<PathBuf, Arc<OnceCell<Lookup<L::Output>>>>>,
    given: OnceCell<Lookup<L::Output>>,
}

impl<L: Loader> FindUp<L> {
    /// Creates a new search.
    pub fn new(options: FindUpOptions, loader: L) -> Self {
        let given_path = options
            .file_path
            .map(|path| normalize(&options.cwd.join(path)));
        Self {
            cwd: options.cwd,
            names: options.names,
            given_path,
            detect: options.detect,
            loader,
            cache: Mutex::new(HashMap::new()),
            given: OnceCell::new(),
        }
    }

    /// The loader this search uses.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Finds the file that applies to `file_path`.
    ///
    /// The search starts in the directory containing `file_path`, resolved
    /// against the working directory with `.` and `..` folded away.
    pub async fn load(&self, file_path: &Path) -> Lookup<L::Output> {
        if let Some(given) = &self.given_path {
            return self
                .given
                .get_or_init(|| self.load_given(given))
                .await
                .clone();
        }

        if !self.detect {
            return Ok(None);
        }

        let file_path = normalize(&self.cwd.join(file_path));
        match file_path.parent() {
            Some(dir) => self.lookup(dir.to_path_buf()).await,
            None => Ok(None),
        }
    }

    async fn load_given(&self, path: &Path) -> Lookup<L::Output> {
        debug!("Checking given file `{}`", path.display());
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| FindUpError::read(&self.relative(path), e, true))?;
        let value = self
            .loader
            .load(contents, path)
            .await
            .map_err(|e| FindUpError::parse(&self.relative(path), e, true))?;
        Ok(value.map(Arc::new))
    }

    fn lookup(&self, dir: PathBuf) -> BoxFuture<'_, Lookup<L::Output>> {
        async move {
            let cell = self.cache.lock().entry(dir.clone()).or_default().clone();
            cell.get_or_init(|| self.search(dir)).await.clone()
        }
        .boxed()
    }

    async fn search(&self, dir: PathBuf) -> Lookup<L::Output> {
        for name in &self.names {
            let path = dir.join(name);
            let contents = match tokio::fs::read(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    debug!("{}", e);
                    return Err(FindUpError::read(&self.relative(&path), e, false));
                }
            };

            match self.loader.load(contents, &path).await {
                Ok(Some(value)) => {
                    debug!("Read file `{}`", path.display());
                    return Ok(Some(Arc::new(value)));
                }
                Ok(None) => continue,
                Err(e) => return Err(FindUpError::parse(&self.relative(&path), e, false)),
            }
        }

        match dir.parent() {
            Some(parent) => self.lookup(parent.to_path_buf()).await,
            None => {
                debug!("No files found up from `{}`", dir.display());
                Ok(None)
            }
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        pathdiff::diff_paths(path, &self.cwd).unwrap_or_else(|| path.to_path_buf())
    }
}
