use thiserror::Error;

/// Errors raised while attaching or running the plugin.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Cannot parse options\n{0}")]
    Options(#[from] serde_json::Error),

    #[error("Cannot compile skip path pattern `{pattern}`\n{source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "Cannot find remote `origin` of local Git repo; pass `repository: false` if you are not using Git"
    )]
    NoRemote,

    #[error("Cannot find root of local Git repo")]
    NoRoot,
}
