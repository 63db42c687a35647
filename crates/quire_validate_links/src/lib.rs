//! validate-links plugin: checks that links and images point to existing
//! files and headings.
//!
//! Every file records its landmarks (the file itself, its headings and
//! explicit ids) and its references. Once all files of a run meet at the
//! barrier, references are checked against the landmarks of every file, and
//! files that are linked to with a hash are added to the run so that their
//! headings are known. Missing targets become warnings on the linking file,
//! with a suggestion when a close enough name exists.
//!
//! Links to the hosted repository itself, such as
//! `https://github.com/user/project/blob/main/readme.md#install`, are checked
//! as local files.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | repository | string \| boolean | `origin` remote | Remote URL; `false` when not using Git |
//! | root | string | Git root, or cwd with `repository` | Folder absolute links resolve from |
//! | skipPathPatterns | string[] | [] | Regexes matched against `path#hash` |
//! | urlConfig | object | detected from host | How the host links to files and headings |
//!
//! # Example
//!
//! ```json
//! {
//!   "plugins": [
//!     ["validate-links", { "repository": false, "skipPathPatterns": ["\\.pdf$"] }]
//!   ]
//! }
//! ```

mod check;
mod collect;
mod error;
mod hosted;
mod options;
mod paths;
mod propose;
mod reference;
mod repo;
mod slug;

use std::sync::Arc;

use quire_core::{FileSet, Plugin, PluginError, Transformer};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub use error::LinkError;
pub use hosted::{Host, HostedRepo, UrlConfig};
pub use options::{Options, Repository};
pub use propose::propose;
pub use slug::{Slugger, slug};

use crate::check::Checker;
use crate::collect::Collector;

/// Id of the plugin and of its completer.
pub const PLUGIN_ID: &str = "validate-links";

/// Source of the messages of the plugin.
pub const SOURCE: &str = "quire-validate-links";

/// The plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateLinks;

impl ValidateLinks {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for ValidateLinks {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn attach(
        &self,
        options: Option<&Value>,
        file_set: Option<&FileSet>,
    ) -> Result<Option<Arc<dyn Transformer>>, PluginError> {
        let options = match options {
            Some(value) => Options::deserialize(value).map_err(LinkError::Options)?,
            None => Options::default(),
        };
        let skip = options.skip_patterns()?;

        if let Some(file_set) = file_set {
            debug!("Checking links across the file set");
            file_set.use_completer(Arc::new(Checker));
        }

        Ok(Some(Arc::new(Collector::new(
            Arc::new(options),
            Arc::new(skip),
            file_set.cloned(),
        ))))
    }
}
