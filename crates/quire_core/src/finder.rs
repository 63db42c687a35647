//! Expands the requested paths and globs into files.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use globset::GlobBuilder;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{EngineError, FindUpError};
use crate::file::File;
use crate::ignore::{Ignore, IgnoreFile, in_scope};

/// Something to process: a path or glob, or a file made by the caller.
#[derive(Debug)]
pub enum Input {
    Pattern(String),
    File(File),
}

impl From<&str> for Input {
    fn from(pattern: &str) -> Self {
        Self::Pattern(pattern.to_string())
    }
}

impl From<String> for Input {
    fn from(pattern: String) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<File> for Input {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}

/// Options for [`find`].
pub struct FinderOptions {
    pub cwd: PathBuf,
    /// Extensions, with leading dot, of files to pick from folders.
    pub extensions: Vec<String>,
    pub ignore: Arc<Ignore>,
    /// Extra patterns ignored relative to `cwd`.
    pub ignore_patterns: Vec<String>,
    /// Drop ignored files instead of failing them when they are given
    /// explicitly.
    pub silently_ignore: bool,
}

/// Files found by [`find`].
#[derive(Debug)]
pub struct FinderResult {
    pub files: Vec<File>,
    /// Exactly one path was requested and it is a single file.
    pub one_file_mode: bool,
}

/// Returns true if `pattern` is a glob rather than a plain path.
pub fn has_magic(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Normalizes a path lexically: drops `.` and folds `..`.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Expands `inputs` into files, sorted by path.
///
/// Plain paths are kept even when they do not exist; they get a fatal
/// message instead. Folders are searched recursively for files with one of
/// the extensions.
pub async fn find(inputs: Vec<Input>, options: &FinderOptions) -> Result<FinderResult, EngineError> {
    let cwd = options.cwd.as_path();
    let mut candidates = Vec::new();
    let mut requested = Vec::new();

    for input in inputs {
        match input {
            Input::Pattern(pattern) if has_magic(&pattern) => {
                let matches = expand_glob(&pattern, cwd)?;
                requested.extend(matches.iter().map(|path| Some(path.clone())));
                candidates.extend(matches.into_iter().map(Candidate::Path));
            }
            Input::Pattern(pattern) => {
                let path = relative_to(cwd, &cwd.join(&pattern));
                requested.push(Some(path.clone()));
                candidates.push(Candidate::Path(path));
            }
            Input::File(mut file) => {
                let path = match file.path() {
                    Some(path) => relative_to(cwd, &cwd.join(path)),
                    None => cwd.to_path_buf(),
                };
                file.cwd = cwd.to_path_buf();
                file.reset_history(path);
                requested.push(None);
                candidates.push(Candidate::File(file));
            }
        }
    }

    let extra_ignore = IgnoreFile::from_lines(cwd, options.ignore_patterns.iter().map(String::as_str))
        .map_err(|e| EngineError::config(format!("Invalid ignore pattern: {e}")))?;

    let search = Search {
        options,
        extra_ignore,
    };
    let mut files = search.search(candidates, false).await;
    files.sort_by_key(File::display_path);

    let one_file_mode = files.len() == 1
        && requested.len() == 1
        && matches!((&requested[0], files[0].path()), (Some(wanted), Some(found)) if wanted == found);

    info!("Found {} files", files.len());
    Ok(FinderResult {
        files,
        one_file_mode,
    })
}

/// `path` relative to `cwd`, or `.` for `cwd` itself.
fn relative_to(cwd: &Path, path: &Path) -> PathBuf {
    let normal = normalize(path);
    match pathdiff::diff_paths(&normal, cwd) {
        Some(relative) if relative.as_os_str().is_empty() => PathBuf::from("."),
        Some(relative) => relative,
        None => normal,
    }
}

/// Paths below `cwd` matching `pattern`, relative to `cwd`.
///
/// Only the part of the tree below the pattern's literal prefix is walked.
/// Hidden entries do not match.
fn expand_glob(pattern: &str, cwd: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| EngineError::config(format!("Invalid glob pattern '{pattern}': {e}")))?
        .compile_matcher();

    let base: PathBuf = Path::new(pattern)
        .components()
        .take_while(|component| !has_magic(&component.as_os_str().to_string_lossy()))
        .collect();
    let root = cwd.join(&base);

    let mut matches: Vec<PathBuf> = WalkDir::new(&root)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(cwd).ok()?.to_path_buf();
            let against = if Path::new(pattern).is_absolute() {
                entry.path().to_path_buf()
            } else {
                relative.clone()
            };
            matcher.is_match(&against).then_some(relative)
        })
        .collect();

    matches.sort();
    debug!("Glob `{}` matched {} paths", pattern, matches.len());
    Ok(matches)
}

enum Candidate {
    Path(PathBuf),
    File(File),
}

impl Candidate {
    fn path(&self) -> PathBuf {
        match self {
            Self::Path(path) => path.clone(),
            Self::File(file) => file.path().map(Path::to_path_buf).unwrap_or_default(),
        }
    }
}

struct Search<'a> {
    options: &'a FinderOptions,
    extra_ignore: IgnoreFile,
}

/// What [`Search::check`] learned about a candidate.
enum Check {
    Ok { ignored: bool, folder: bool },
    Missing(std::io::Error),
    Unreadable(std::io::Error),
    Lookup(FindUpError),
}

impl Search<'_> {
    fn search(&self, candidates: Vec<Candidate>, nested: bool) -> BoxFuture<'_, Vec<File>> {
        async move {
            let results = join_all(
                candidates
                    .into_iter()
                    .map(|candidate| self.each(candidate, nested)),
            )
            .await;
            results.into_iter().flatten().collect()
        }
        .boxed()
    }

    async fn each(&self, candidate: Candidate, nested: bool) -> Vec<File> {
        let path = candidate.path();
        let cwd = &self.options.cwd;

        if nested && path.file_name().is_some_and(|name| name == "node_modules") {
            return Vec::new();
        }

        let check = self.check(&candidate, &path).await;

        let (ignored, folder) = match &check {
            Check::Ok { ignored, folder } => (*ignored, *folder),
            _ => (false, false),
        };

        if ignored && (nested || self.options.silently_ignore) {
            return Vec::new();
        }

        if !ignored && folder {
            return match tokio::fs::read_dir(cwd.join(&path)).await {
                Ok(mut entries) => {
                    let mut children = Vec::new();
                    while let Ok(Some(entry)) = entries.next_entry().await {
                        children.push(Candidate::Path(normalize(&path.join(entry.file_name()))));
                    }
                    self.search(children, true).await
                }
                Err(e) => {
                    let mut file = File::with_path(cwd, path);
                    file.fail_with("Cannot read folder", e);
                    vec![file]
                }
            };
        }

        if !folder && nested && !self.options.extensions.is_empty() {
            let extension = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()));
            if !extension.is_some_and(|ext| self.options.extensions.contains(&ext)) {
                return Vec::new();
            }
        }

        let mut file = match candidate {
            Candidate::Path(path) => File::with_path(cwd, path),
            Candidate::File(file) => file,
        };

        if ignored {
            file.fail("Cannot process specified file: it’s ignored");
        }

        match check {
            Check::Ok { .. } => {}
            Check::Missing(e) => file.fail_with("No such file or folder", e),
            Check::Unreadable(e) => file.fail_with("Cannot find file", e),
            Check::Lookup(e @ FindUpError::ReadGiven { .. }) => file.fail_with("Cannot find file", e),
            Check::Lookup(e) => file.fail_with("Cannot process file", e),
        }

        vec![file]
    }

    async fn check(&self, candidate: &Candidate, path: &Path) -> Check {
        let absolute = self.options.cwd.join(path);
        let needs_stat = match candidate {
            Candidate::Path(_) => true,
            Candidate::File(file) => file.value.is_none(),
        };

        let stat = async {
            if needs_stat {
                Some(tokio::fs::metadata(&absolute).await)
            } else {
                None
            }
        };
        let (stat, ignored) = tokio::join!(stat, self.options.ignore.check(&absolute));

        let folder = match stat {
            Some(Ok(metadata)) => metadata.is_dir(),
            Some(Err(e)) if e.kind() == ErrorKind::NotFound => return Check::Missing(e),
            Some(Err(e)) => return Check::Unreadable(e),
            None => false,
        };

        let ignored = match ignored {
            Ok(ignored) => ignored,
            Err(e) => return Check::Lookup(e),
        };

        let extra = in_scope(&self.options.cwd, &absolute)
            .is_some_and(|normal| self.extra_ignore.ignores(&normal));

        Check::Ok {
            ignored: ignored || extra,
            folder,
        }
    }
}
