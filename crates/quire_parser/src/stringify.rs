//! Markdown serialization.
//!
//! Output is canonical rather than source preserving: ATX headings, fenced
//! code, `***` rules, one space after list markers. Text that already uses
//! those conventions survives `parse` then `stringify` unchanged. Characters
//! in text that would otherwise start markup are written with a backslash.

use quire_tree::{Node, NodeType};

use crate::{ParseError, Settings};

/// Serializer options read from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkdownOptions {
    /// Unordered list marker, `*`, `-` or `+`.
    pub bullet: char,
    /// Emphasis marker, `*` or `_`.
    pub emphasis: char,
    /// Strong marker, `*` or `_`.
    pub strong: char,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            bullet: '*',
            emphasis: '*',
            strong: '*',
        }
    }
}

impl MarkdownOptions {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let marker = |key: &str, allowed: &[char], fallback: char| {
            settings
                .get(key)
                .and_then(|value| value.as_str())
                .and_then(|value| value.chars().next())
                .filter(|c| allowed.contains(c))
                .unwrap_or(fallback)
        };
        let defaults = Self::default();

        Self {
            bullet: marker("bullet", &['*', '-', '+'], defaults.bullet),
            emphasis: marker("emphasis", &['*', '_'], defaults.emphasis),
            strong: marker("strong", &['*', '_'], defaults.strong),
        }
    }
}

pub(crate) fn to_markdown(tree: &Node, options: &MarkdownOptions) -> Result<String, ParseError> {
    let serializer = Serializer { options };

    if tree.node_type == NodeType::Root {
        let body = serializer.blocks(&tree.children, "\n\n")?;
        return Ok(if body.is_empty() {
            body
        } else {
            format!("{}\n", body)
        });
    }

    if tree.node_type.is_parent() && !is_phrasing(tree.node_type) {
        serializer.block(tree)
    } else {
        serializer.phrasing(tree)
    }
}

fn is_phrasing(node_type: NodeType) -> bool {
    matches!(
        node_type,
        NodeType::Text
            | NodeType::Emphasis
            | NodeType::Strong
            | NodeType::Delete
            | NodeType::InlineCode
            | NodeType::InlineMath
            | NodeType::Break
            | NodeType::Link
            | NodeType::Image
            | NodeType::LinkReference
            | NodeType::ImageReference
            | NodeType::FootnoteReference
    )
}

struct Serializer<'o> {
    options: &'o MarkdownOptions,
}

impl Serializer<'_> {
    fn blocks(&self, children: &[Node], separator: &str) -> Result<String, ParseError> {
        let parts = children
            .iter()
            .map(|child| self.block(child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(separator))
    }

    fn block(&self, node: &Node) -> Result<String, ParseError> {
        let text = match node.node_type {
            NodeType::Paragraph => escape_line_starts(&self.inline(&node.children)?),
            NodeType::Heading => {
                let depth = node.depth.unwrap_or(1).clamp(1, 6) as usize;
                let content = self.inline(&node.children)?;
                if content.is_empty() {
                    "#".repeat(depth)
                } else {
                    format!("{} {}", "#".repeat(depth), content)
                }
            }
            NodeType::ThematicBreak => "***".to_string(),
            NodeType::Blockquote => {
                let inner = self.blocks(&node.children, "\n\n")?;
                prefix_lines(&inner, "> ", ">")
            }
            NodeType::List => self.list(node)?,
            NodeType::ListItem => self.list_item(node, &self.options.bullet.to_string())?,
            NodeType::Code => code_block(node),
            NodeType::Math => format!(
                "$$\n{}\n$$",
                node.value.as_deref().unwrap_or_default()
            ),
            NodeType::Html => node.value.clone().unwrap_or_default(),
            NodeType::Yaml => format!("---\n{}\n---", node.value.as_deref().unwrap_or_default()),
            NodeType::Toml => format!("+++\n{}\n+++", node.value.as_deref().unwrap_or_default()),
            NodeType::Definition => format!(
                "[{}]: {}{}",
                label(node),
                destination(node.url.as_deref().unwrap_or_default()),
                title(node)
            ),
            NodeType::FootnoteDefinition => {
                let content = self.blocks(&node.children, "\n\n")?;
                let marker = format!("[^{}]: ", label(node));
                indent_rest(&content, &marker, "    ")
            }
            NodeType::Table => self.table(node)?,
            NodeType::Root => self.blocks(&node.children, "\n\n")?,
            NodeType::TableRow | NodeType::TableCell => {
                return Err(ParseError::unsupported(node.node_type.as_str()));
            }
            _ => self.phrasing(node)?,
        };
        Ok(text)
    }

    fn list(&self, node: &Node) -> Result<String, ParseError> {
        let ordered = node.ordered.unwrap_or(false);
        let start = node.start.unwrap_or(1);
        let loose =
            node.spread == Some(true) || node.children.iter().any(|item| item.spread == Some(true));

        let mut items = Vec::with_capacity(node.children.len());
        for (index, item) in node.children.iter().enumerate() {
            let marker = if ordered {
                format!("{}.", start as usize + index)
            } else {
                self.options.bullet.to_string()
            };
            items.push(self.list_item(item, &marker)?);
        }

        Ok(items.join(if loose { "\n\n" } else { "\n" }))
    }

    fn list_item(&self, node: &Node, marker: &str) -> Result<String, ParseError> {
        let separator = if node.spread == Some(true) {
            "\n\n"
        } else {
            "\n"
        };
        let mut content = self.blocks(&node.children, separator)?;
        match node.checked {
            Some(true) => content.insert_str(0, "[x] "),
            Some(false) => content.insert_str(0, "[ ] "),
            None => {}
        }

        let first = format!("{} ", marker);
        let rest = " ".repeat(first.len());
        Ok(indent_rest(&content, &first, &rest).trim_end().to_string())
    }

    fn table(&self, node: &Node) -> Result<String, ParseError> {
        let mut lines = Vec::with_capacity(node.children.len() + 1);
        for (index, row) in node.children.iter().enumerate() {
            let cells = row
                .children
                .iter()
                .map(|cell| self.inline(&cell.children))
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(format!("| {} |", cells.join(" | ")));
            if index == 0 {
                let delimiter = vec!["-"; cells.len().max(1)];
                lines.push(format!("| {} |", delimiter.join(" | ")));
            }
        }
        Ok(lines.join("\n"))
    }

    fn inline(&self, children: &[Node]) -> Result<String, ParseError> {
        let mut out = String::new();
        for child in children {
            out.push_str(&self.phrasing(child)?);
        }
        Ok(out)
    }

    fn phrasing(&self, node: &Node) -> Result<String, ParseError> {
        let value = || node.value.as_deref().unwrap_or_default();
        let text = match node.node_type {
            NodeType::Text => escape_text(value()),
            NodeType::Html => value().to_string(),
            NodeType::Emphasis => {
                let marker = self.options.emphasis.to_string();
                format!("{}{}{}", marker, self.inline(&node.children)?, marker)
            }
            NodeType::Strong => {
                let marker = self.options.strong.to_string().repeat(2);
                format!("{}{}{}", marker, self.inline(&node.children)?, marker)
            }
            NodeType::Delete => format!("~~{}~~", self.inline(&node.children)?),
            NodeType::InlineCode => inline_code(value()),
            NodeType::InlineMath => format!("${}$", value()),
            NodeType::Break => "\\\n".to_string(),
            NodeType::Link => {
                let url = node.url.as_deref().unwrap_or_default();
                let content = self.inline(&node.children)?;
                if node.title.is_none() && is_autolink(url, &node.children) {
                    format!("<{}>", url)
                } else {
                    format!("[{}]({}{})", content, destination(url), title(node))
                }
            }
            NodeType::Image => format!(
                "![{}]({}{})",
                node.alt.as_deref().unwrap_or_default(),
                destination(node.url.as_deref().unwrap_or_default()),
                title(node)
            ),
            NodeType::LinkReference => {
                let content = self.inline(&node.children)?;
                reference(&format!("[{}]", content), node)
            }
            NodeType::ImageReference => reference(
                &format!("![{}]", node.alt.as_deref().unwrap_or_default()),
                node,
            ),
            NodeType::FootnoteReference => format!("[^{}]", label(node)),
            _ => return self.block(node),
        };
        Ok(text)
    }
}

/// Escapes characters that open inline markup anywhere in a line.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '*' | '_' | '[' | ']' | '`' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes line starts of a paragraph that would read as headings, quotes,
/// list items or setext underlines.
fn escape_line_starts(text: &str) -> String {
    text.split('\n')
        .map(escape_line_start)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str) -> String {
    let opens_block = |rest: &str| rest.is_empty() || rest.starts_with([' ', '\t']);
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let escape = match first {
        '#' | '>' => true,
        '-' | '+' => opens_block(chars.as_str()) || line.chars().all(|c| c == first),
        '=' => line.chars().all(|c| c == '='),
        '0'..='9' => {
            let digits = line.chars().take_while(char::is_ascii_digit).count();
            let rest = &line[digits..];
            if digits <= 9 && rest.starts_with(['.', ')']) && opens_block(&rest[1..]) {
                return format!("{}\\{}", &line[..digits], rest);
            }
            false
        }
        _ => false,
    };

    if escape {
        format!("\\{}", line)
    } else {
        line.to_string()
    }
}

fn code_block(node: &Node) -> String {
    let value = node.value.as_deref().unwrap_or_default();
    let fence = "`".repeat(longest_run(value, '`').max(2) + 1);
    let mut info = node.lang.clone().unwrap_or_default();
    if let Some(meta) = &node.meta {
        info.push(' ');
        info.push_str(meta);
    }
    if value.is_empty() {
        format!("{}{}\n{}", fence, info, fence)
    } else {
        format!("{}{}\n{}\n{}", fence, info, value, fence)
    }
}

fn inline_code(value: &str) -> String {
    let ticks = "`".repeat(longest_run(value, '`') + 1);
    if value.starts_with('`') || value.ends_with('`') {
        format!("{} {} {}", ticks, value, ticks)
    } else {
        format!("{}{}{}", ticks, value, ticks)
    }
}

fn longest_run(value: &str, target: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in value.chars() {
        if c == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn is_autolink(url: &str, children: &[Node]) -> bool {
    match children {
        [only] if only.node_type == NodeType::Text => {
            let text = only.value.as_deref().unwrap_or_default();
            (text == url || format!("mailto:{}", text) == url) && url.contains(':')
        }
        _ => false,
    }
}

fn destination(url: &str) -> String {
    if url.is_empty() || url.contains([' ', '<', '>']) || !balanced(url) {
        format!("<{}>", url.replace('<', "\\<").replace('>', "\\>"))
    } else {
        url.to_string()
    }
}

fn balanced(url: &str) -> bool {
    let mut depth: i64 = 0;
    for c in url.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn title(node: &Node) -> String {
    match &node.title {
        Some(title) => format!(" \"{}\"", title.replace('"', "\\\"")),
        None => String::new(),
    }
}

fn label(node: &Node) -> &str {
    node.label
        .as_deref()
        .or(node.identifier.as_deref())
        .unwrap_or_default()
}

fn reference(text: &str, node: &Node) -> String {
    match node.reference_type.as_deref() {
        Some("shortcut") => text.to_string(),
        Some("collapsed") => format!("{}[]", text),
        _ => format!("{}[{}]", text, label(node)),
    }
}

fn prefix_lines(text: &str, prefix: &str, empty: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                empty.to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_rest(text: &str, first: &str, rest: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                format!("{}{}", first, line)
            } else if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", rest, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MarkdownProcessor, Processor};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn round_trip(source: &str) -> String {
        let processor = MarkdownProcessor::new();
        let settings = Settings::new();
        let tree = processor.parse(source, &settings).unwrap();
        processor.stringify(&tree, &settings).unwrap()
    }

    #[rstest]
    #[case::heading_and_paragraph("# Hello\n\nSome *emphasis* and a [link](b.md).\n")]
    #[case::strong("A **strong** claim.\n")]
    #[case::tight_list("* one\n* two\n")]
    #[case::ordered_list("1. first\n2. second\n")]
    #[case::nested_list("* one\n  * nested\n* two\n")]
    #[case::blockquote("> quoted\n>\n> twice\n")]
    #[case::code("```rust\nfn main() {}\n```\n")]
    #[case::rule("a\n\n***\n\nb\n")]
    #[case::inline_code("Use `code` here.\n")]
    #[case::image("![alt](a.png \"Title\")\n")]
    #[case::autolink("See <https://example.com>.\n")]
    #[case::definition("[x]\n\n[x]: https://example.com\n")]
    #[case::delete("~~gone~~\n")]
    #[case::task_list("* [x] done\n* [ ] todo\n")]
    #[case::empty("")]
    #[case::escaped_emphasis("\\*not emphasis\\*\n")]
    #[case::escaped_ordered_marker("1\\. not a list\n")]
    #[case::escaped_parenthesis_marker("2\\) not a list\n")]
    #[case::escaped_brackets("a \\[b\\] c\n")]
    #[case::escaped_heading("\\# not a heading\n")]
    #[case::escaped_quote("\\> not a quote\n")]
    #[case::escaped_bullet("\\- not a list\n")]
    #[case::escaped_underscore("snake\\_case and \\`ticks\\`\n")]
    #[case::escaped_second_line("a\n\\+ b\n")]
    #[case::escaped_backslash("a \\\\ b\n")]
    fn test_round_trip(#[case] source: &str) {
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_loose_list() {
        assert_eq!(round_trip("* a\n\n* b\n"), "* a\n\n* b\n");
    }

    #[test]
    fn test_bullet_setting() {
        let processor = MarkdownProcessor::new();
        let mut settings = Settings::new();
        settings.insert("bullet".into(), "-".into());
        let tree = processor.parse("* a\n* b\n", &settings).unwrap();

        assert_eq!(processor.stringify(&tree, &settings).unwrap(), "- a\n- b\n");
    }

    #[rstest]
    #[case("# a", "\\# a")]
    #[case("-", "\\-")]
    #[case("---", "\\---")]
    #[case("===", "\\===")]
    #[case("-x", "-x")]
    #[case("10. a", "10\\. a")]
    #[case("2024.", "2024\\.")]
    #[case("3.5 apples", "3.5 apples")]
    #[case("plain", "plain")]
    fn test_escape_line_start(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(escape_line_start(line), expected);
    }

    #[test]
    fn test_fence_grows_around_backticks() {
        let node = Node::literal(NodeType::Code, "```\ninner\n```");
        assert_eq!(code_block(&node), "````\n```\ninner\n```\n````");
    }

    #[test]
    fn test_destination_escapes_spaces() {
        assert_eq!(destination("a b.md"), "<a b.md>");
        assert_eq!(destination(""), "<>");
        assert_eq!(destination("a(b).md"), "a(b).md");
        assert_eq!(destination("a)b"), "<a)b>");
    }

    #[test]
    fn test_table_row_alone_is_unsupported() {
        let row = Node::parent(NodeType::TableRow, vec![]);
        let result = to_markdown(&row, &MarkdownOptions::default());
        assert!(matches!(result, Err(ParseError::Unsupported(_))));
    }
}
