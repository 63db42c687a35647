//! Turns link URLs into the files and headings they point to.

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::hosted::UrlConfig;
use crate::paths::resolve;

/// A file, and optionally a heading in it, that a link points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reference {
    /// Absolute path, empty for a file without a path.
    pub file_path: PathBuf,
    /// Slug of the heading, without prefix.
    pub hash: Option<String>,
}

impl Reference {
    /// `path#hash`, as skip patterns see it.
    pub fn together(&self) -> String {
        match &self.hash {
            Some(hash) => format!("{}#{}", self.file_path.display(), hash),
            None => self.file_path.display().to_string(),
        }
    }
}

/// What a URL is resolved against.
#[derive(Debug, Clone)]
pub(crate) struct Context {
    /// Folder of the current file, or the working directory.
    pub base: PathBuf,
    /// Absolute path of the current file.
    pub path: Option<PathBuf>,
    /// Root of the repository.
    pub root: PathBuf,
    pub url_config: UrlConfig,
}

/// Resolves `value`, the URL of a link or image.
///
/// Returns `None` for URLs that are not checked: absolute paths without a
/// known host, and full URLs to anything but the current repository.
pub(crate) fn to_reference(value: &str, context: &Context, image: bool) -> Option<Reference> {
    let config = &context.url_config;
    let mut value = value.to_string();

    if value.starts_with('/') {
        let hostname = config.hostname.as_deref()?;
        let pathname = if config.resolve_absolute_paths_in_repo && !config.prefix.is_empty() {
            format!("{}main{}", config.prefix, value)
        } else {
            value
        };
        value = format!("https://{hostname}{pathname}");
    }

    if let Ok(url) = Url::parse(&value) {
        return to_repo_reference(&url, context, image);
    }

    // Drop the query, unless it is part of the hash: `readme.md#heading?`.
    let mut hash_index = value.find('#');
    if let Some(query_index) = value.find('?')
        && hash_index.is_none_or(|hash_index| hash_index > query_index)
    {
        let hash = hash_index.map_or("", |hash_index| &value[hash_index..]);
        value = format!("{}{}", &value[..query_index], hash);
        hash_index = value.find('#');
    }

    // Images have no headings: `image.png#metadata`.
    if image && let Some(index) = hash_index.take() {
        value.truncate(index);
    }

    let (file_path, hash) = if value.starts_with('#') {
        (context.path.clone().unwrap_or_default(), Some(value.as_str()))
    } else if context.path.is_some() {
        let (path, hash) = match hash_index {
            Some(index) => (&value[..index], Some(&value[index..])),
            None => (value.as_str(), None),
        };
        (resolve(&context.base, decode(path)), hash)
    } else {
        (PathBuf::new(), None)
    };

    Some(Reference {
        file_path,
        hash: hash.and_then(|hash| heading(hash, config)),
    })
}

/// Resolves a URL to a file of the current repository, such as
/// `https://github.com/user/project/blob/main/docs/a.md`.
///
/// The segment after the prefix is taken as the branch and dropped.
fn to_repo_reference(url: &Url, context: &Context, image: bool) -> Option<Reference> {
    let config = &context.url_config;
    let hostname = config.hostname.as_deref()?;

    if config.prefix.is_empty()
        || !matches!(url.scheme(), "http" | "https")
        || url.host_str() != Some(hostname)
    {
        return None;
    }
    let rest = url.path().strip_prefix(config.prefix.as_str())?;
    let path: Vec<&str> = rest.split('/').skip(1).collect();

    let hash = match url.fragment() {
        Some(fragment) if !image && !fragment.is_empty() => Some(format!("#{fragment}")),
        _ => None,
    };

    Some(Reference {
        file_path: resolve(&context.root, decode(&path.join("/"))),
        hash: hash.and_then(|hash| heading(&hash, config)),
    })
}

/// Turns a raw hash, such as `#Intro`, into a heading slug.
///
/// Returns `None` for the top anchor, for line anchors and for hashes
/// without the heading prefix.
fn heading(hash: &str, config: &UrlConfig) -> Option<String> {
    let hash = hash.to_lowercase();

    if config
        .top_anchor
        .as_deref()
        .is_some_and(|top| !top.is_empty() && hash == top)
    {
        return None;
    }

    let slug = match config.heading_prefix.as_deref().filter(|p| !p.is_empty()) {
        Some(prefix) => {
            if config.lines && is_line_anchor(&hash) {
                return None;
            }
            hash.strip_prefix(prefix)?.to_string()
        }
        None => hash,
    };

    (!slug.is_empty()).then_some(slug)
}

/// `#l12`, `#l12-l20`.
fn is_line_anchor(hash: &str) -> bool {
    hash.strip_prefix("#l")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
