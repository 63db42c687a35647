//! Node definition.
//!
//! The core tree node type used throughout quire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Position;

/// The kind of a node, serialized as the mdast `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Root,
    Paragraph,
    Heading,
    ThematicBreak,
    Blockquote,
    List,
    ListItem,
    Html,
    Code,
    Definition,
    Text,
    Emphasis,
    Strong,
    InlineCode,
    Break,
    Link,
    Image,
    LinkReference,
    ImageReference,
    Delete,
    Table,
    TableRow,
    TableCell,
    FootnoteDefinition,
    FootnoteReference,
    Yaml,
    Toml,
    Math,
    InlineMath,
}

impl NodeType {
    /// Returns the mdast name of this node type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::ThematicBreak => "thematicBreak",
            Self::Blockquote => "blockquote",
            Self::List => "list",
            Self::ListItem => "listItem",
            Self::Html => "html",
            Self::Code => "code",
            Self::Definition => "definition",
            Self::Text => "text",
            Self::Emphasis => "emphasis",
            Self::Strong => "strong",
            Self::InlineCode => "inlineCode",
            Self::Break => "break",
            Self::Link => "link",
            Self::Image => "image",
            Self::LinkReference => "linkReference",
            Self::ImageReference => "imageReference",
            Self::Delete => "delete",
            Self::Table => "table",
            Self::TableRow => "tableRow",
            Self::TableCell => "tableCell",
            Self::FootnoteDefinition => "footnoteDefinition",
            Self::FootnoteReference => "footnoteReference",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Math => "math",
            Self::InlineMath => "inlineMath",
        }
    }

    /// Returns true if nodes of this type hold children.
    pub const fn is_parent(&self) -> bool {
        matches!(
            self,
            Self::Root
                | Self::Paragraph
                | Self::Heading
                | Self::Blockquote
                | Self::List
                | Self::ListItem
                | Self::Emphasis
                | Self::Strong
                | Self::Link
                | Self::LinkReference
                | Self::Delete
                | Self::Table
                | Self::TableRow
                | Self::TableCell
                | Self::FootnoteDefinition
        )
    }
}

/// A node in the syntax tree.
///
/// Fields that only apply to some node types are optional and skipped when
/// serializing, so the JSON form matches what mdast tooling produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// The type of this node.
    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Child nodes (for parent nodes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,

    /// Text value (for literal nodes such as text, code and html).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Heading rank, 1 through 6.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,

    /// Whether a list or list item is loose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// `full`, `collapsed` or `shortcut`, for references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,

    /// Source range, absent for generated nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    /// Free-form data attached by plugins (for example `hProperties`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Node {
    /// Creates a node with no children, value or attributes.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            children: Vec::new(),
            value: None,
            depth: None,
            ordered: None,
            start: None,
            spread: None,
            checked: None,
            lang: None,
            meta: None,
            url: None,
            title: None,
            alt: None,
            identifier: None,
            label: None,
            reference_type: None,
            position: None,
            data: None,
        }
    }

    /// Creates a parent node with children.
    pub fn parent(node_type: NodeType, children: Vec<Node>) -> Self {
        Self {
            children,
            ..Self::new(node_type)
        }
    }

    /// Creates a literal node with a value.
    pub fn literal(node_type: NodeType, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(node_type)
        }
    }

    /// Creates a heading of the given depth.
    pub fn heading(depth: u8, children: Vec<Node>) -> Self {
        Self {
            depth: Some(depth),
            ..Self::parent(NodeType::Heading, children)
        }
    }

    /// Creates a link to `url`.
    pub fn link(url: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::parent(NodeType::Link, children)
        }
    }

    /// Sets the position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns true if this node has children.
    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns the plain text content of this node.
    ///
    /// Literal values are concatenated depth-first. Html values and image
    /// alternative text are left out.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(value) = &self.value {
            if self.node_type != NodeType::Html {
                out.push_str(value);
            }
            return;
        }

        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Looks up a string field in `data`, following nested mappings.
    ///
    /// `node.data_str(&["hProperties", "id"])` reads `data.hProperties.id`.
    pub fn data_str(&self, path: &[&str]) -> Option<&str> {
        let (last, parents) = path.split_last()?;
        let mut map = self.data.as_ref()?;
        for key in parents {
            map = map.get(*key)?.as_object()?;
        }
        map.get(*last)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_content_skips_html() {
        let node = Node::parent(
            NodeType::Paragraph,
            vec![
                Node::literal(NodeType::Text, "a "),
                Node::literal(NodeType::Html, "<b>"),
                Node::parent(
                    NodeType::Emphasis,
                    vec![Node::literal(NodeType::Text, "b")],
                ),
                Node::literal(NodeType::InlineCode, " c"),
            ],
        );

        assert_eq!(node.text_content(), "a b c");
    }

    #[test]
    fn test_text_content_skips_image_alt() {
        let mut image = Node::new(NodeType::Image);
        image.alt = Some("alt".to_string());
        let heading = Node::heading(1, vec![Node::literal(NodeType::Text, "Logo "), image]);

        assert_eq!(heading.text_content(), "Logo ");
    }

    #[test]
    fn test_json_shape() {
        let node = Node::heading(2, vec![Node::literal(NodeType::Text, "Intro")]);
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "heading",
                "children": [{ "type": "text", "value": "Intro" }],
                "depth": 2
            })
        );
    }

    #[test]
    fn test_json_from_mdast() {
        let node: Node = serde_json::from_str(
            r#"{"type":"root","children":[{"type":"thematicBreak"},{"type":"inlineCode","value":"x"}]}"#,
        )
        .unwrap();

        assert_eq!(node.children[0].node_type, NodeType::ThematicBreak);
        assert_eq!(node.children[1].value.as_deref(), Some("x"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<Node>(r#"{"type":"mystery"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_data_str() {
        let mut node = Node::new(NodeType::Heading);
        node.data = serde_json::json!({ "hProperties": { "id": "custom" }, "id": "flat" })
            .as_object()
            .cloned();

        assert_eq!(node.data_str(&["hProperties", "id"]), Some("custom"));
        assert_eq!(node.data_str(&["id"]), Some("flat"));
        assert_eq!(node.data_str(&["hProperties", "name"]), None);
        assert_eq!(node.data_str(&[]), None);
    }

    #[test]
    fn test_is_parent() {
        assert!(NodeType::Root.is_parent());
        assert!(NodeType::Link.is_parent());
        assert!(!NodeType::Text.is_parent());
        assert!(!NodeType::Image.is_parent());
    }
}
