use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;

use crate::error::LinkError;
use crate::hosted::UrlConfig;

/// Repository given in the options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    /// Remote URL or shortcut, such as `quire/docs`.
    Url(String),
    /// `false` turns Git off, `true` is the same as leaving it out.
    Enabled(bool),
}

/// Options of the plugin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Defaults to the `origin` remote of the Git repository.
    pub repository: Option<Repository>,
    /// Root folder of the repository, relative to the working directory.
    pub root: Option<PathBuf>,
    /// Regular expressions matched against `path#hash` of every reference.
    #[serde(default)]
    pub skip_path_patterns: Vec<String>,
    /// Defaults to what the repository host uses.
    pub url_config: Option<UrlConfig>,
}

impl Options {
    /// Whether the repository is detected through Git.
    pub fn detects_repository(&self) -> bool {
        matches!(self.repository, None | Some(Repository::Enabled(true)))
    }

    /// The given remote URL.
    pub fn repository_url(&self) -> Option<&str> {
        match &self.repository {
            Some(Repository::Url(url)) => Some(url),
            _ => None,
        }
    }

    pub(crate) fn skip_patterns(&self) -> Result<Vec<Regex>, LinkError> {
        self.skip_path_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| LinkError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }
}
