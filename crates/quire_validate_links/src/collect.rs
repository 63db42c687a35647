//! Per-file pass: records what a file offers and what it links to.

use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use quire_core::{File, FileSet, PluginError, Transformer};
use quire_tree::visitor::walk_node;
use quire_tree::{Node, NodeType, Position, VisitResult, Visitor};
use regex::Regex;
use tracing::debug;

use crate::check::check_all;
use crate::hosted::UrlConfig;
use crate::options::Options;
use crate::paths::{is_readme, resolve};
use crate::reference::{Context, to_reference};
use crate::repo::find_repo;
use crate::slug::Slugger;

/// Key of [`Collected`] in the data of a file.
pub(crate) const DATA_KEY: &str = "validate-links";

/// Existing locations: hashes per absolute file path, `""` for the file
/// itself.
pub(crate) type Landmarks = BTreeMap<PathBuf, BTreeMap<String, bool>>;

/// Places of the links to each location.
pub(crate) type References = BTreeMap<PathBuf, BTreeMap<String, Vec<Option<Position>>>>;

/// What one file offers and links to.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub landmarks: Landmarks,
    pub references: References,
}

impl Collected {
    fn add_landmarks(&mut self, path: &Path, hash: &str) {
        self.add_landmark(path, hash);

        // A readme stands for its folder. Two readmes in one folder both
        // define the folder's landmarks.
        if is_readme(path)
            && let Some(parent) = path.parent()
        {
            self.add_landmark(parent, hash);
        }
    }

    fn add_landmark(&mut self, path: &Path, hash: &str) {
        self.landmarks
            .entry(path.to_path_buf())
            .or_default()
            .insert(hash.to_string(), true);
    }

    fn add_reference(&mut self, path: &Path, hash: &str, position: Option<Position>) {
        self.references
            .entry(path.to_path_buf())
            .or_default()
            .entry(hash.to_string())
            .or_default()
            .push(position);
    }
}

/// The transformer of the plugin.
pub(crate) struct Collector {
    options: Arc<Options>,
    skip: Arc<Vec<Regex>>,
    file_set: Option<FileSet>,
}

impl Collector {
    pub(crate) fn new(
        options: Arc<Options>,
        skip: Arc<Vec<Regex>>,
        file_set: Option<FileSet>,
    ) -> Self {
        Self {
            options,
            skip,
            file_set,
        }
    }

    /// Adds the file at `path`, or the readme of the folder at `path`, to
    /// the set so that its headings are known.
    async fn add_file(&self, file_set: &FileSet, cwd: &Path, path: PathBuf) {
        let mut path = path;

        if let Ok(metadata) = tokio::fs::metadata(&path).await
            && metadata.is_dir()
            && let Some(readme) = find_readme(&path).await
        {
            path = path.join(readme);
        }

        let relative = pathdiff::diff_paths(&path, cwd).unwrap_or(path);
        debug!("Adding linked file `{}`", relative.display());
        file_set.add(File::with_path(cwd, relative));
    }
}

/// First readme in `folder`, by name.
async fn find_readme(folder: &Path) -> Option<String> {
    let mut entries = tokio::fs::read_dir(folder).await.ok()?;
    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    names.into_iter().find(|name| is_readme(Path::new(name)))
}

#[async_trait]
impl Transformer for Collector {
    async fn transform(&self, tree: &mut Node, file: &mut File) -> Result<(), PluginError> {
        let repo = find_repo(file, &self.options).await?;
        let url_config = match &self.options.url_config {
            Some(config) => config.clone(),
            None => UrlConfig::detect(repo.repository.as_deref()),
        };

        let absolute = file.path().map(|path| resolve(&file.cwd, path));
        let context = Context {
            base: absolute
                .as_deref()
                .and_then(Path::parent)
                .map_or_else(|| file.cwd.clone(), Path::to_path_buf),
            path: absolute.clone(),
            root: repo.root,
            url_config,
        };

        let mut walker = Walker {
            context: &context,
            skip: &self.skip,
            in_set: self.file_set.is_some(),
            slugger: Slugger::new(),
            collected: Collected::default(),
            statted: HashSet::new(),
            pending: Vec::new(),
        };
        walker
            .collected
            .add_landmarks(absolute.as_deref().unwrap_or(Path::new("")), "");
        let _ = walk_node(&mut walker, tree);

        let Walker {
            collected, pending, ..
        } = walker;
        debug!(
            "Found {} landmarks and {} references in `{}`",
            collected.landmarks.len(),
            collected.references.len(),
            file.display_path()
        );
        file.data.insert(DATA_KEY, collected);

        match &self.file_set {
            Some(file_set) => {
                for path in pending {
                    self.add_file(file_set, &file.cwd, path).await;
                }
            }
            None => check_all(std::slice::from_mut(file)).await,
        }

        Ok(())
    }
}

struct Walker<'a> {
    context: &'a Context,
    skip: &'a [Regex],
    in_set: bool,
    slugger: Slugger,
    collected: Collected,
    statted: HashSet<PathBuf>,
    /// Files to add to the set.
    pending: Vec<PathBuf>,
}

impl Walker<'_> {
    fn id(&mut self, node: &Node) -> Option<String> {
        let explicit = node
            .data_str(&["hProperties", "name"])
            .or_else(|| node.data_str(&["hProperties", "id"]))
            .or_else(|| node.data_str(&["id"]))
            .filter(|id| !id.is_empty());

        match explicit {
            Some(id) => Some(id.to_string()),
            None if node.node_type == NodeType::Heading => {
                Some(self.slugger.slug(&node.text_content())).filter(|slug| !slug.is_empty())
            }
            None => None,
        }
    }

    fn reference(&mut self, node: &Node, url: &str) {
        let image = node.node_type == NodeType::Image;
        let Some(reference) = to_reference(url, self.context, image) else {
            return;
        };

        let together = reference.together();
        if self.skip.iter().any(|pattern| pattern.is_match(&together)) {
            debug!("Skipping `{}`", together);
            return;
        }

        let path = reference.file_path.as_path();
        self.collected.add_reference(path, "", node.position);

        let Some(hash) = &reference.hash else {
            return;
        };
        if self.in_set || Some(path) == self.context.path.as_deref().or(Some(Path::new(""))) {
            self.collected.add_reference(path, hash, node.position);
        }
        if self.in_set
            && !path.as_os_str().is_empty()
            && self.statted.insert(path.to_path_buf())
        {
            self.pending.push(path.to_path_buf());
        }
    }
}

impl Visitor for Walker<'_> {
    fn enter(&mut self, node: &Node) -> VisitResult {
        if let Some(id) = self.id(node) {
            let path = self.context.path.clone().unwrap_or_default();
            self.collected.add_landmarks(&path, &id);
        }

        if let Some(url) = node.url.as_deref().filter(|url| !url.is_empty()) {
            self.reference(node, url);
        }

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quire_core::Severity;
    use quire_parser::{MarkdownProcessor, Processor, Settings};
    use serde_json::json;
    use tempfile::TempDir;

    fn collector(options: serde_json::Value) -> Collector {
        let options: Options = serde_json::from_value(options).unwrap();
        let skip = options.skip_patterns().unwrap();
        Collector::new(Arc::new(options), Arc::new(skip), None)
    }

    async fn run(temp: &TempDir, source: &str, options: serde_json::Value) -> File {
        let mut tree = MarkdownProcessor::new()
            .parse(source, &Settings::new())
            .unwrap();
        let mut file = File::with_path(temp.path(), "a.md").with_value(source);
        collector(options)
            .transform(&mut tree, &mut file)
            .await
            .unwrap();
        file
    }

    fn reasons(file: &File) -> Vec<&str> {
        file.messages.iter().map(|m| m.reason.as_str()).collect()
    }

    #[tokio::test]
    async fn test_headings_in_the_same_file() {
        let temp = TempDir::new().unwrap();
        let file = run(
            &temp,
            "# Alpha\n\n[a](#alpha) [b](#betas)\n\n## Beta\n",
            json!({ "repository": false }),
        )
        .await;

        assert_eq!(
            reasons(&file),
            vec!["Cannot find heading for `#betas`; did you mean `beta`"]
        );
        let message = &file.messages[0];
        assert_eq!(message.severity, Severity::Warning);
        assert_eq!(message.rule_id.as_deref(), Some("missing-heading"));
        assert_eq!(message.source.as_deref(), Some("quire-validate-links"));
        assert_eq!(message.place.unwrap().start().line, 3);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.md"), "# B\n").unwrap();

        let file = run(
            &temp,
            "[b](b.md) [m](missing.md) ![d](d.png)\n",
            json!({ "repository": false }),
        )
        .await;

        assert_eq!(
            reasons(&file),
            vec!["Cannot find file `d.png`", "Cannot find file `missing.md`"]
        );
    }

    #[tokio::test]
    async fn test_headings_in_other_files_need_a_set() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.md"), "# B\n").unwrap();

        let file = run(&temp, "[b](b.md#nope)\n", json!({ "repository": false })).await;

        assert!(file.messages.is_empty());
    }

    #[tokio::test]
    async fn test_skip_path_patterns() {
        let temp = TempDir::new().unwrap();
        let file = run(
            &temp,
            "[c](c.md) [x](#x)\n",
            json!({ "repository": false, "skipPathPatterns": ["c\\.md$", "#x$"] }),
        )
        .await;

        assert!(file.messages.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_ids_and_duplicate_headings() {
        let temp = TempDir::new().unwrap();
        let mut tree = MarkdownProcessor::new()
            .parse("# Same\n\n# Same\n\n[a](#same-1) [b](#custom)\n", &Settings::new())
            .unwrap();
        let mut data = serde_json::Map::new();
        data.insert("id".to_string(), json!("custom"));
        tree.children[0].data = Some(data);

        let mut file = File::with_path(temp.path(), "a.md");
        collector(json!({ "repository": false }))
            .transform(&mut tree, &mut file)
            .await
            .unwrap();

        // The first heading has an explicit id, so the second one is `same`.
        assert_eq!(reasons(&file), vec!["Cannot find heading for `#same-1`"]);
    }

    #[test]
    fn test_readme_landmarks_cover_the_folder() {
        let mut collected = Collected::default();
        collected.add_landmarks(Path::new("/repo/docs/readme.md"), "");
        collected.add_landmarks(Path::new("/repo/docs/readme.md"), "intro");
        collected.add_landmarks(Path::new("/repo/docs/guide.md"), "");

        let folder = &collected.landmarks[Path::new("/repo/docs")];
        assert_eq!(folder.keys().collect::<Vec<_>>(), vec!["", "intro"]);
        assert_eq!(collected.landmarks.len(), 3);
    }
}
