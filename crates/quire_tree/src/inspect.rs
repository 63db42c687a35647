//! Human readable tree dumps, used by the engine's inspect mode.

use serde_json::Value;

use crate::{Node, Position};

/// Renders `node` as an indented outline.
///
/// ```text
/// root[1] (1:1-1:8, 0-7)
/// └─0 heading[1] (1:1-1:8, 0-7)
///     │ depth: 1
///     └─0 text "Hello" (1:3-1:8, 2-7)
/// ```
pub fn inspect(node: &Node) -> String {
    let mut out = header(node);
    let fields = fields(node);
    let has_children = node.has_children();

    if !fields.is_empty() {
        let bar = if has_children { "│ " } else { "  " };
        for field in fields {
            out.push('\n');
            out.push_str(&indent(&field, bar, bar));
        }
    }

    let count = node.children.len();
    for (index, child) in node.children.iter().enumerate() {
        let last = index + 1 == count;
        let first = format!("{}{} ", if last { "└─" } else { "├─" }, index);
        let rest = format!(
            "{}{}",
            if last { " " } else { "│" },
            " ".repeat(first.chars().count() - 1)
        );
        out.push('\n');
        out.push_str(&indent(&inspect(child), &first, &rest));
    }

    out
}

fn header(node: &Node) -> String {
    let mut out = node.node_type.as_str().to_string();

    if node.node_type.is_parent() {
        out.push_str(&format!("[{}]", node.children.len()));
    }

    if let Some(value) = &node.value {
        out.push(' ');
        out.push_str(&Value::String(value.clone()).to_string());
    }

    if let Some(position) = &node.position {
        out.push_str(&format!(" ({})", format_position(position)));
    }

    out
}

fn format_position(position: &Position) -> String {
    match (position.start.offset, position.end.offset) {
        (Some(start), Some(end)) => format!("{}, {}-{}", position, start, end),
        _ => position.to_string(),
    }
}

fn fields(node: &Node) -> Vec<String> {
    let mut fields = Vec::new();
    let mut push = |name: &str, value: Value| fields.push(format!("{}: {}", name, value));

    if let Some(depth) = node.depth {
        push("depth", depth.into());
    }
    if let Some(ordered) = node.ordered {
        push("ordered", ordered.into());
    }
    if let Some(start) = node.start {
        push("start", start.into());
    }
    if let Some(spread) = node.spread {
        push("spread", spread.into());
    }
    if let Some(checked) = node.checked {
        push("checked", checked.into());
    }
    for (name, value) in [
        ("lang", &node.lang),
        ("meta", &node.meta),
        ("url", &node.url),
        ("title", &node.title),
        ("alt", &node.alt),
        ("identifier", &node.identifier),
        ("label", &node.label),
        ("referenceType", &node.reference_type),
    ] {
        if let Some(value) = value {
            push(name, Value::String(value.clone()));
        }
    }
    if let Some(data) = &node.data {
        push("data", Value::Object(data.clone()));
    }

    fields
}

fn indent(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::new();
    for (index, line) in text.lines().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push_str(if index == 0 { first } else { rest });
        out.push_str(line);
    }
    out
}
