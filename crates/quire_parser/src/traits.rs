//! Processor trait definition.

use quire_tree::Node;

use crate::ParseError;

/// Processor settings, the `settings` mapping of the resolved configuration.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Trait for turning source text into a tree and back.
///
/// A processor is stateless: plugins and settings are supplied per file by
/// the engine, so one instance can serve every file of a run.
///
/// # Example
///
/// ```rust
/// use quire_parser::{ParseError, Processor, Settings};
/// use quire_tree::{Node, NodeType};
///
/// struct Lines;
///
/// impl Processor for Lines {
///     fn name(&self) -> &str {
///         "lines"
///     }
///
///     fn extensions(&self) -> &[&str] {
///         &["txt"]
///     }
///
///     fn parse(&self, source: &str, _settings: &Settings) -> Result<Node, ParseError> {
///         let children = source
///             .lines()
///             .map(|line| Node::literal(NodeType::Text, line))
///             .collect();
///         Ok(Node::parent(NodeType::Root, children))
///     }
///
///     fn stringify(&self, tree: &Node, _settings: &Settings) -> Result<String, ParseError> {
///         Ok(tree
///             .children
///             .iter()
///             .map(|line| format!("{}\n", line.value.as_deref().unwrap_or_default()))
///             .collect())
///     }
/// }
/// ```
pub trait Processor: Send + Sync {
    /// Returns the name of this processor.
    fn name(&self) -> &str;

    /// Returns the file extensions this processor handles.
    ///
    /// Extensions should not include the leading dot (e.g., `["md", "markdown"]`).
    fn extensions(&self) -> &[&str];

    /// Parses the source text into a tree.
    fn parse(&self, source: &str, settings: &Settings) -> Result<Node, ParseError>;

    /// Serializes a tree back into text.
    fn stringify(&self, tree: &Node, settings: &Settings) -> Result<String, ParseError>;

    /// Returns true if this processor can handle the given file extension.
    fn can_parse(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
