//! Lexical path helpers. Nothing here touches the file system.

use std::path::{Component, Path, PathBuf};

/// Extensions a readme can have.
const README_EXTENSIONS: &[&str] = &["markdown", "mdown", "md", "mkdn"];

/// Joins `path` onto `base` and folds `.` and `..` away.
///
/// An absolute `path` replaces `base`.
pub(crate) fn resolve(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// `path` relative to `base`, as display text.
pub(crate) fn relative(base: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

/// Whether the basename of `path` is a readme, such as `README.md`.
pub(crate) fn is_readme(path: &Path) -> bool {
    let (Some(stem), Some(extension)) = (path.file_stem(), path.extension()) else {
        return false;
    };
    stem.eq_ignore_ascii_case("readme")
        && extension
            .to_str()
            .is_some_and(|extension| README_EXTENSIONS.contains(&extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("/repo/docs", "a.md", "/repo/docs/a.md")]
    #[case("/repo/docs", "./a.md", "/repo/docs/a.md")]
    #[case("/repo/docs", "../a.md", "/repo/a.md")]
    #[case("/repo/docs", "/etc/a.md", "/etc/a.md")]
    #[case("/repo/docs", "", "/repo/docs")]
    #[case("/repo/docs", "sub/", "/repo/docs/sub")]
    fn test_resolve(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(resolve(Path::new(base), path), PathBuf::from(expected));
    }

    #[rstest]
    #[case("/repo/docs", "/repo/docs/a.md", "a.md")]
    #[case("/repo/docs", "/repo/b.md", "../b.md")]
    #[case("/repo/docs", "/repo/docs", "")]
    fn test_relative(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(relative(Path::new(base), Path::new(path)), expected);
    }

    #[rstest]
    #[case("readme.md", true)]
    #[case("docs/README.markdown", true)]
    #[case("ReadMe.mkdn", true)]
    #[case("readme.txt", false)]
    #[case("readme.MD", false)]
    #[case("readmes.md", false)]
    #[case("readme", false)]
    fn test_is_readme(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_readme(Path::new(path)), expected);
    }
}
