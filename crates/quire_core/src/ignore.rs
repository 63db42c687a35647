//! Ignore files: gitignore-style patterns found by upward search.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{FindUpError, PluginError};
use crate::find_up::{FindUp, FindUpOptions, Loader};
use crate::finder::normalize;

/// Where the patterns of an explicitly given ignore file are resolved from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveFrom {
    /// The directory containing the ignore file.
    #[default]
    Dir,
    /// The working directory.
    Cwd,
}

impl std::str::FromStr for ResolveFrom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dir" => Ok(Self::Dir),
            "cwd" => Ok(Self::Cwd),
            other => Err(format!(
                "Expected `cwd` or `dir` for ignore path resolution, not `{other}`"
            )),
        }
    }
}

/// A loaded ignore file.
#[derive(Debug)]
pub struct IgnoreFile {
    /// Directory the ignore file lives in.
    pub dir: PathBuf,
    matcher: Gitignore,
}

impl IgnoreFile {
    /// Builds an ignore file rooted at `dir` from pattern lines.
    pub fn from_lines<'a>(
        dir: impl Into<PathBuf>,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ignore::Error> {
        let dir = dir.into();
        let mut builder = GitignoreBuilder::new(&dir);
        for line in lines {
            builder.add_line(None, line)?;
        }
        Ok(Self {
            matcher: builder.build()?,
            dir,
        })
    }

    /// Checks a relative, normalized path against the patterns.
    ///
    /// Parent directories are checked too, so `dir/` ignores `dir/file`.
    pub fn ignores(&self, normal: &Path) -> bool {
        self.matcher
            .matched_path_or_any_parents(normal, false)
            .is_ignore()
    }
}

/// Returns the path of `path` relative to `base`, or `None` when it points
/// outside of `base`.
pub(crate) fn in_scope(base: &Path, path: &Path) -> Option<PathBuf> {
    let normal = pathdiff::diff_paths(path, base)?;
    let outside = normal.as_os_str().is_empty()
        || normal.has_root()
        || matches!(normal.components().next(), Some(Component::ParentDir));
    (!outside).then_some(normal)
}

struct IgnoreLoader;

#[async_trait]
impl Loader for IgnoreLoader {
    type Output = IgnoreFile;

    async fn load(
        &self,
        contents: Vec<u8>,
        path: &Path,
    ) -> Result<Option<IgnoreFile>, PluginError> {
        let text = String::from_utf8_lossy(&contents);
        let dir = path.parent().unwrap_or(path);
        Ok(Some(IgnoreFile::from_lines(dir, text.lines())?))
    }
}

/// Options for [`Ignore`].
#[derive(Debug, Clone, Default)]
pub struct IgnoreOptions {
    pub cwd: PathBuf,
    /// Search for ignore files at all.
    pub detect: bool,
    /// Name of ignore files, such as `.quireignore`.
    pub ignore_name: Option<String>,
    /// Use exactly this ignore file.
    pub ignore_path: Option<PathBuf>,
    pub resolve_from: ResolveFrom,
}

/// Decides whether files are ignored, based on the nearest ignore file.
pub struct Ignore {
    cwd: PathBuf,
    resolve_from: ResolveFrom,
    find_up: FindUp<IgnoreLoader>,
}

impl Ignore {
    pub fn new(options: IgnoreOptions) -> Self {
        let find_up = FindUp::new(
            FindUpOptions {
                cwd: options.cwd.clone(),
                names: options.ignore_name.into_iter().collect(),
                file_path: options.ignore_path,
                detect: options.detect,
            },
            IgnoreLoader,
        );

        Self {
            cwd: options.cwd,
            resolve_from: options.resolve_from,
            find_up,
        }
    }

    /// Returns true if `file_path` is ignored.
    ///
    /// Paths outside the subtree the patterns apply to are never ignored.
    pub async fn check(&self, file_path: &Path) -> Result<bool, FindUpError> {
        let Some(ignore_file) = self.find_up.load(file_path).await? else {
            return Ok(false);
        };

        let base = match self.resolve_from {
            ResolveFrom::Cwd => self.cwd.as_path(),
            ResolveFrom::Dir => ignore_file.dir.as_path(),
        };

        Ok(match in_scope(base, &normalize(&self.cwd.join(file_path))) {
            Some(normal) => ignore_file.ignores(&normal),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn ignore(cwd: &Path) -> Ignore {
        Ignore::new(IgnoreOptions {
            cwd: cwd.to_path_buf(),
            detect: true,
            ignore_name: Some(".quireignore".to_string()),
            ..Default::default()
        })
    }

    #[rstest]
    #[case("/a", "/a/b/c.md", Some("b/c.md"))]
    #[case("/a", "/a", None)]
    #[case("/a", "/", None)]
    #[case("/a", "/b/c.md", None)]
    #[case("/a/b", "/a/c.md", None)]
    fn test_in_scope(#[case] base: &str, #[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            in_scope(Path::new(base), Path::new(path)),
            expected.map(PathBuf::from)
        );
    }

    #[tokio::test]
    async fn test_patterns() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("build")).unwrap();
        fs::write(temp.path().join(".quireignore"), "build/\n*.tmp.md\n").unwrap();

        let ignore = ignore(temp.path());
        assert!(ignore.check(Path::new("build/out.md")).await.unwrap());
        assert!(ignore.check(Path::new("notes.tmp.md")).await.unwrap());
        assert!(!ignore.check(Path::new("readme.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_parent_paths_are_not_matched_from_cwd() {
        let temp = tempdir().unwrap();
        let cwd = temp.path().join("cwd");
        fs::create_dir_all(&cwd).unwrap();
        fs::create_dir_all(temp.path().join("other")).unwrap();
        fs::write(cwd.join(".quireignore"), "*.md\n").unwrap();

        let ignore = ignore(&cwd);
        assert!(ignore.check(Path::new("x.md")).await.unwrap());
        assert!(!ignore.check(Path::new("../other/x.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_nested_ignore_file_only_covers_its_subtree() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("docs/.quireignore"), "*\n").unwrap();

        let ignore = ignore(temp.path());
        assert!(ignore.check(Path::new("docs/a.md")).await.unwrap());
        assert!(!ignore.check(Path::new("a.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_given_file_outside_of_its_dir() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("config")).unwrap();
        fs::write(temp.path().join("config/ignore"), "*\n").unwrap();

        let given = |resolve_from| {
            Ignore::new(IgnoreOptions {
                cwd: temp.path().to_path_buf(),
                detect: false,
                ignore_name: None,
                ignore_path: Some(PathBuf::from("config/ignore")),
                resolve_from,
            })
        };

        let from_dir = given(ResolveFrom::Dir);
        assert!(!from_dir.check(Path::new("a.md")).await.unwrap());
        assert!(from_dir.check(Path::new("config/a.md")).await.unwrap());

        let from_cwd = given(ResolveFrom::Cwd);
        assert!(from_cwd.check(Path::new("a.md")).await.unwrap());
    }

    #[test]
    fn test_resolve_from_parse() {
        assert_eq!("cwd".parse::<ResolveFrom>(), Ok(ResolveFrom::Cwd));
        assert!("up".parse::<ResolveFrom>().is_err());
    }
}
