//! Processing of a single file.
//!
//! Stages run in three groups: configure, read, parse and transform; then
//! the barrier; then stringify, copy, stdout and write. An error stops the
//! rest of its group and becomes a fatal message on the file, but the next
//! group still runs, so every file reaches the barrier and every file gets a
//! chance to be reported. Stages skip files that already failed or are
//! ignored, except for the barrier.

mod process;
mod write;

use std::sync::Arc;

use quire_parser::Processor;
use tracing::debug;

use crate::configuration::Configuration;
use crate::error::EngineError;
use crate::file::File;
use crate::file_set::FileSet;
use crate::options::RunSettings;
use crate::plugin::Transformer;
use crate::settings::Settings;

/// What every file of a run shares.
pub(crate) struct RunContext {
    pub settings: RunSettings,
    pub configuration: Arc<Configuration>,
    pub file_set: FileSet,
}

/// A processor with the settings and transformers configured for one file.
pub(crate) struct ConfiguredProcessor {
    pub processor: Arc<dyn Processor>,
    pub settings: Settings,
    pub transformers: Vec<Arc<dyn Transformer>>,
}

impl ConfiguredProcessor {
    fn new(processor: Arc<dyn Processor>) -> Self {
        Self {
            processor,
            settings: Settings::new(),
            transformers: Vec::new(),
        }
    }
}

/// Runs `file` through every stage.
pub(crate) async fn run(context: &RunContext, mut file: File) -> File {
    let mut processor = ConfiguredProcessor::new(context.settings.processor.clone());

    let result = process::run(context, &mut file, &mut processor).await;
    fail_on_error(&mut file, result);

    let (mut file, error) = context.file_set.arrive(file).await;
    if let Some(error) = error {
        fail_on_error(&mut file, Err(EngineError::Plugin(error)));
    }

    let result = write::run(context, &mut file, &processor).await;
    fail_on_error(&mut file, result);

    debug!("Processed `{}`", file.display_path());
    file
}

fn fail_on_error(file: &mut File, result: Result<(), EngineError>) {
    if let Err(error) = result {
        debug!("Failing `{}`: {}", file.display_path(), error);
        file.fail_with("Cannot process file", error);
    }
}

/// Returns true for files later stages leave alone.
fn is_settled(file: &File) -> bool {
    file.has_fatal() || file.ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigurationOptions;
    use crate::error::PluginError;
    use crate::io::OutputStream;
    use crate::message::Message;
    use crate::options::Output;
    use crate::plugin::{Plugin, PluginEntry};
    use crate::resolver::PluginRegistry;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use quire_parser::MarkdownProcessor;
    use quire_tree::{Node, NodeType};
    use serde_json::{Value, json};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Uppercases text, warns about every link.
    struct Shout;

    #[async_trait]
    impl Transformer for Shout {
        async fn transform(&self, tree: &mut Node, file: &mut File) -> Result<(), PluginError> {
            fn visit(node: &mut Node, file: &mut File) {
                if node.node_type == NodeType::Text
                    && let Some(value) = &mut node.value
                {
                    *value = value.to_uppercase();
                }
                if node.node_type == NodeType::Link {
                    file.push(Message::new("Link").at(node));
                }
                for child in &mut node.children {
                    visit(child, file);
                }
            }
            visit(tree, file);
            Ok(())
        }
    }

    struct ShoutPlugin;

    impl Plugin for ShoutPlugin {
        fn id(&self) -> &str {
            "shout"
        }

        fn attach(
            &self,
            options: Option<&Value>,
            _file_set: Option<&FileSet>,
        ) -> Result<Option<Arc<dyn Transformer>>, PluginError> {
            if options == Some(&json!("fail")) {
                return Err("refusing to attach".into());
            }
            Ok(Some(Arc::new(Shout)))
        }
    }

    fn settings(cwd: &Path) -> RunSettings {
        RunSettings {
            cwd: cwd.to_path_buf(),
            extensions: vec![".md".to_string()],
            file_path: None,
            stream_out: OutputStream::capture(),
            stream_error: OutputStream::capture(),
            out: Some(false),
            output: None,
            always_stringify: false,
            tree_in: false,
            tree_out: false,
            inspect: false,
            ignore_unconfigured: false,
            color: false,
            silent: false,
            quiet: false,
            frail: false,
            verbose: false,
            processor: Arc::new(MarkdownProcessor::new()),
        }
    }

    fn context(settings: RunSettings, options: Option<Value>) -> RunContext {
        let configuration = Configuration::new(ConfigurationOptions {
            cwd: settings.cwd.clone(),
            rc_name: None,
            package_field: None,
            detect_config: false,
            rc_path: None,
            plugin_prefix: None,
            config_transform: None,
            default_config: None,
            plugins: vec![PluginEntry::plugin(Arc::new(ShoutPlugin), options)],
            settings: Settings::new(),
            resolver: Arc::new(PluginRegistry::new()),
        });
        let (file_set, _receiver) = FileSet::new();
        RunContext {
            settings,
            configuration: Arc::new(configuration),
            file_set,
        }
    }

    fn given(cwd: &Path, path: &str) -> File {
        let mut file = File::with_path(cwd, path);
        file.given = true;
        file
    }

    async fn run_one(context: &RunContext, file: File) -> File {
        context.file_set.add(File::with_path(&file.cwd, file.origin()));
        run(context, file).await
    }

    #[tokio::test]
    async fn test_stdout() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "# hi [x](y)\n").unwrap();
        let mut settings = settings(temp.path());
        settings.out = Some(true);
        let context = context(settings, None);

        let file = run_one(&context, given(temp.path(), "a.md")).await;

        assert_eq!(file.messages.len(), 1);
        assert_eq!(file.messages[0].reason, "Link");
        assert_eq!(
            context.settings.stream_out.contents().as_deref(),
            Some("# HI [X](y)\n")
        );
    }

    #[tokio::test]
    async fn test_no_output_does_not_stringify() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "hi\n").unwrap();
        let context = context(settings(temp.path()), None);

        let file = run_one(&context, given(temp.path(), "a.md")).await;

        assert_eq!(file.value.as_deref(), Some("hi\n"));
        assert!(file.tree.is_some());
        assert_eq!(context.settings.stream_out.contents().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = tempdir().unwrap();
        let context = context(settings(temp.path()), None);

        let file = run_one(&context, given(temp.path(), "nope.md")).await;

        assert!(file.has_fatal());
        assert_eq!(file.messages[0].reason, "Cannot process file");
        assert!(file.messages[0].cause.is_some());
    }

    #[tokio::test]
    async fn test_attach_error() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "hi\n").unwrap();
        let context = context(settings(temp.path()), Some(json!("fail")));

        let file = run_one(&context, given(temp.path(), "a.md")).await;

        assert_eq!(file.messages.len(), 1);
        assert_eq!(file.messages[0].cause.as_deref(), Some("refusing to attach"));
        assert!(file.tree.is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "hi\n").unwrap();
        let mut settings = settings(temp.path());
        settings.out = None;
        settings.output = Some(Output::Overwrite);
        let context = context(settings, None);

        let file = run_one(&context, given(temp.path(), "a.md")).await;

        assert!(file.stored);
        assert_eq!(fs::read_to_string(temp.path().join("a.md")).unwrap(), "HI\n");
    }

    #[tokio::test]
    async fn test_added_files_are_not_written() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "hi\n").unwrap();
        let mut settings = settings(temp.path());
        settings.output = Some(Output::Overwrite);
        let context = context(settings, None);

        let file = run_one(&context, File::with_path(temp.path(), "a.md")).await;

        assert!(!file.stored);
        assert_eq!(fs::read_to_string(temp.path().join("a.md")).unwrap(), "hi\n");
    }

    #[tokio::test]
    async fn test_output_folder_and_extension() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "hi\n").unwrap();
        fs::create_dir(temp.path().join("out")).unwrap();
        let mut settings = settings(temp.path());
        settings.output = Some(Output::Path("out".into()));
        settings.tree_out = true;
        let context = context(settings, None);

        let file = run_one(&context, given(temp.path(), "a.md")).await;

        assert_eq!(file.display_path(), "out/a.json");
        let written = fs::read_to_string(temp.path().join("out/a.json")).unwrap();
        let tree: Node = serde_json::from_str(&written).unwrap();
        assert_eq!(tree.node_type, NodeType::Root);
        assert!(written.ends_with("}\n"));
    }

    #[tokio::test]
    async fn test_tree_in() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.json"), "not json").unwrap();
        let mut settings = settings(temp.path());
        settings.tree_in = true;
        let context = context(settings, None);

        let file = run_one(&context, given(temp.path(), "a.json")).await;

        assert_eq!(file.messages[0].reason, "Cannot read file as JSON");
        assert!(file.has_fatal());
        assert_eq!(file.display_path(), "a.md");
    }

    #[tokio::test]
    async fn test_ignore_unconfigured() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.md"), "hi\n").unwrap();
        let mut settings = settings(temp.path());
        settings.ignore_unconfigured = true;
        let context = context(settings, None);

        let file = run_one(&context, given(temp.path(), "a.md")).await;

        assert!(file.ignored);
        assert_eq!(file.value, None);
        assert!(file.messages.is_empty());
    }
}
