//! Finds the repository a file lives in.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quire_core::File;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::LinkError;
use crate::options::Options;
use crate::paths::resolve;

static ORIGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"origin\t(.+?) \(fetch\)").expect("Invalid remote pattern"));

/// Remote and root folder of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Repo {
    /// Remote URL, `None` when Git is turned off.
    pub repository: Option<String>,
    /// Folder absolute paths in the repository resolve from.
    pub root: PathBuf,
}

/// Detects the repository of `file`, unless `options` give it.
pub(crate) async fn find_repo(file: &File, options: &Options) -> Result<Repo, LinkError> {
    let base = match file.path() {
        Some(path) => {
            let absolute = resolve(&file.cwd, path);
            absolute.parent().map_or(absolute.clone(), Path::to_path_buf)
        }
        None => file.cwd.clone(),
    };
    let detect = options.detects_repository();

    let repository = if detect {
        let remotes = git(&["remote", "-v"], &base)
            .await
            .ok_or(LinkError::NoRemote)?;
        let remote = ORIGIN
            .captures(&remotes)
            .and_then(|captures| captures.get(1))
            .ok_or(LinkError::NoRemote)?;
        debug!("Found remote `{}`", remote.as_str());
        Some(remote.as_str().to_string())
    } else {
        options.repository_url().map(str::to_string)
    };

    let root = if let Some(root) = &options.root {
        resolve(&file.cwd, root)
    } else if detect {
        let up = git(&["rev-parse", "--show-cdup"], &base)
            .await
            .ok_or(LinkError::NoRoot)?;
        resolve(&base, up.trim())
    } else {
        file.cwd.clone()
    };

    Ok(Repo { repository, root })
}

/// Runs git in `cwd`, returning its output on success.
async fn git(args: &[&str], cwd: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .inspect_err(|e| debug!("Cannot run git: {}", e))
        .ok()?;

    if !output.status.success() {
        debug!("`git {}` failed in `{}`", args.join(" "), cwd.display());
        return None;
    }
    String::from_utf8(output.stdout).ok()
}
