//! Markdown processor using markdown-rs (wooorm/markdown-rs).
//!
//! Parsing converts the mdast produced by the `markdown` crate into owned
//! [`Node`]s; serializing goes through [`crate::stringify`].

use markdown::mdast::{self, ReferenceKind};
use markdown::{ParseOptions, to_mdast};
use quire_tree::{Node, NodeType, Point, Position};

use crate::stringify::{MarkdownOptions, to_markdown};
use crate::{ParseError, Processor, Settings};

/// Markdown processor implementation.
///
/// Uses `markdown-rs` for parsing, which supports:
/// - CommonMark
/// - GFM (GitHub Flavored Markdown), on unless the `gfm` setting is `false`
/// - Frontmatter, when the `frontmatter` setting is `true`
pub struct MarkdownProcessor;

impl MarkdownProcessor {
    /// Creates a new Markdown processor.
    pub fn new() -> Self {
        Self
    }

    fn parse_options(settings: &Settings) -> ParseOptions {
        let gfm = settings
            .get("gfm")
            .and_then(|value| value.as_bool())
            .unwrap_or(true);
        let mut options = if gfm {
            ParseOptions::gfm()
        } else {
            ParseOptions::default()
        };
        if settings.get("frontmatter").and_then(|value| value.as_bool()) == Some(true) {
            options.constructs.frontmatter = true;
        }
        options
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for MarkdownProcessor {
    fn name(&self) -> &str {
        "markdown"
    }

    fn extensions(&self) -> &[&str] {
        &["md", "markdown", "mdown", "mkdn", "mkd", "mdwn", "mkdown"]
    }

    fn parse(&self, source: &str, settings: &Settings) -> Result<Node, ParseError> {
        let options = Self::parse_options(settings);
        let mdast =
            to_mdast(source, &options).map_err(|e| ParseError::invalid_source(e.to_string()))?;

        Ok(Converter { source }.convert(&mdast))
    }

    fn stringify(&self, tree: &Node, settings: &Settings) -> Result<String, ParseError> {
        to_markdown(tree, &MarkdownOptions::from_settings(settings))
    }
}

struct Converter<'s> {
    source: &'s str,
}

impl Converter<'_> {
    fn convert(&self, node: &mdast::Node) -> Node {
        use mdast::Node as M;

        let mut out = match node {
            M::Root(root) => self.parent(NodeType::Root, &root.children),
            M::Paragraph(para) => self.parent(NodeType::Paragraph, &para.children),
            M::Heading(heading) => {
                let mut out = self.parent(NodeType::Heading, &heading.children);
                out.depth = Some(heading.depth);
                out
            }
            M::ThematicBreak(_) => Node::new(NodeType::ThematicBreak),
            M::Blockquote(quote) => self.parent(NodeType::Blockquote, &quote.children),
            M::List(list) => {
                let mut out = self.parent(NodeType::List, &list.children);
                out.ordered = Some(list.ordered);
                out.start = list.start;
                out.spread = Some(list.spread);
                out
            }
            M::ListItem(item) => {
                let mut out = self.parent(NodeType::ListItem, &item.children);
                out.spread = Some(item.spread);
                out.checked = item.checked;
                out
            }
            M::Html(html) => Node::literal(NodeType::Html, &html.value),
            M::Code(code) => {
                let mut out = Node::literal(NodeType::Code, &code.value);
                out.lang = code.lang.clone();
                out.meta = code.meta.clone();
                out
            }
            M::Math(math) => {
                let mut out = Node::literal(NodeType::Math, &math.value);
                out.meta = math.meta.clone();
                out
            }
            M::Definition(def) => {
                let mut out = Node::new(NodeType::Definition);
                out.url = Some(def.url.clone());
                out.title = def.title.clone();
                out.identifier = Some(def.identifier.clone());
                out.label = def.label.clone();
                out
            }
            M::Text(text) => Node::literal(NodeType::Text, &text.value),
            M::Emphasis(em) => self.parent(NodeType::Emphasis, &em.children),
            M::Strong(strong) => self.parent(NodeType::Strong, &strong.children),
            M::Delete(del) => self.parent(NodeType::Delete, &del.children),
            M::InlineCode(code) => Node::literal(NodeType::InlineCode, &code.value),
            M::InlineMath(math) => Node::literal(NodeType::InlineMath, &math.value),
            M::Break(_) => Node::new(NodeType::Break),
            M::Link(link) => {
                let mut out = self.parent(NodeType::Link, &link.children);
                out.url = Some(link.url.clone());
                out.title = link.title.clone();
                out
            }
            M::Image(image) => {
                let mut out = Node::new(NodeType::Image);
                out.url = Some(image.url.clone());
                out.title = image.title.clone();
                out.alt = Some(image.alt.clone());
                out
            }
            M::LinkReference(reference) => {
                let mut out = self.parent(NodeType::LinkReference, &reference.children);
                out.identifier = Some(reference.identifier.clone());
                out.label = reference.label.clone();
                out.reference_type = Some(reference_type(&reference.reference_kind).into());
                out
            }
            M::ImageReference(reference) => {
                let mut out = Node::new(NodeType::ImageReference);
                out.alt = Some(reference.alt.clone());
                out.identifier = Some(reference.identifier.clone());
                out.label = reference.label.clone();
                out.reference_type = Some(reference_type(&reference.reference_kind).into());
                out
            }
            M::FootnoteDefinition(def) => {
                let mut out = self.parent(NodeType::FootnoteDefinition, &def.children);
                out.identifier = Some(def.identifier.clone());
                out.label = def.label.clone();
                out
            }
            M::FootnoteReference(reference) => {
                let mut out = Node::new(NodeType::FootnoteReference);
                out.identifier = Some(reference.identifier.clone());
                out.label = reference.label.clone();
                out
            }
            M::Table(table) => self.parent(NodeType::Table, &table.children),
            M::TableRow(row) => self.parent(NodeType::TableRow, &row.children),
            M::TableCell(cell) => self.parent(NodeType::TableCell, &cell.children),
            M::Yaml(yaml) => Node::literal(NodeType::Yaml, &yaml.value),
            M::Toml(toml) => Node::literal(NodeType::Toml, &toml.value),

            // MDX constructs are never enabled; keep their source as raw html.
            _ => Node::literal(NodeType::Html, self.slice(node)),
        };

        out.position = node.position().map(convert_position);
        out
    }

    fn parent(&self, node_type: NodeType, children: &[mdast::Node]) -> Node {
        Node::parent(
            node_type,
            children.iter().map(|child| self.convert(child)).collect(),
        )
    }

    fn slice(&self, node: &mdast::Node) -> &str {
        node.position()
            .and_then(|pos| self.source.get(pos.start.offset..pos.end.offset))
            .unwrap_or_default()
    }
}

fn convert_position(position: &markdown::unist::Position) -> Position {
    Position::new(
        Point::with_offset(
            position.start.line,
            position.start.column,
            position.start.offset,
        ),
        Point::with_offset(position.end.line, position.end.column, position.end.offset),
    )
}

fn reference_type(kind: &ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Shortcut => "shortcut",
        ReferenceKind::Collapsed => "collapsed",
        ReferenceKind::Full => "full",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(source: &str) -> Node {
        MarkdownProcessor::new()
            .parse(source, &Settings::new())
            .unwrap()
    }

    #[test]
    fn test_parse_simple_markdown() {
        let tree = parse("# Hello\n\nThis is a paragraph.");

        assert_eq!(tree.node_type, NodeType::Root);
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn test_parse_heading() {
        let tree = parse("# Level 1\n\n## Level 2");

        assert_eq!(tree.children[0].node_type, NodeType::Heading);
        assert_eq!(tree.children[0].depth, Some(1));
        assert_eq!(tree.children[1].depth, Some(2));
        assert_eq!(tree.children[1].text_content(), "Level 2");
    }

    #[test]
    fn test_parse_link() {
        let tree = parse("[Example](https://example.com \"Title\")");

        let link = &tree.children[0].children[0];
        assert_eq!(link.node_type, NodeType::Link);
        assert_eq!(link.url.as_deref(), Some("https://example.com"));
        assert_eq!(link.title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_parse_image() {
        let tree = parse("![Alt text](image.png)");

        let image = &tree.children[0].children[0];
        assert_eq!(image.node_type, NodeType::Image);
        assert_eq!(image.url.as_deref(), Some("image.png"));
        assert_eq!(image.alt.as_deref(), Some("Alt text"));
    }

    #[test]
    fn test_parse_list() {
        let tree = parse("- Item 1\n- Item 2\n- Item 3");

        let list = &tree.children[0];
        assert_eq!(list.node_type, NodeType::List);
        assert_eq!(list.ordered, Some(false));
        assert_eq!(list.spread, Some(false));
        assert_eq!(list.children.len(), 3);
        assert!(
            list.children
                .iter()
                .all(|item| item.node_type == NodeType::ListItem)
        );
    }

    #[test]
    fn test_parse_table() {
        let tree = parse("| a | b |\n| - | - |\n| 1 | 2 |");

        let table = &tree.children[0];
        assert_eq!(table.node_type, NodeType::Table);
        assert_eq!(table.children[0].node_type, NodeType::TableRow);
    }

    #[test]
    fn test_gfm_can_be_disabled() {
        let mut settings = Settings::new();
        settings.insert("gfm".into(), false.into());
        let tree = MarkdownProcessor::new()
            .parse("~~gone~~", &settings)
            .unwrap();

        assert_eq!(tree.children[0].children[0].node_type, NodeType::Text);
    }

    #[test]
    fn test_positions() {
        let tree = parse("Hello");

        let position = tree.children[0].position.unwrap();
        assert_eq!(position.start, Point::with_offset(1, 1, 0));
        assert_eq!(position.end, Point::with_offset(1, 6, 5));
    }

    #[rstest]
    #[case("md", true)]
    #[case("markdown", true)]
    #[case("MD", true)]
    #[case("txt", false)]
    fn test_extensions(#[case] extension: &str, #[case] expected: bool) {
        assert_eq!(MarkdownProcessor::new().can_parse(extension), expected);
    }
}
