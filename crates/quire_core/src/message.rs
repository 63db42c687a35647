//! Diagnostics attached to files.

use std::cmp::Ordering;
use std::fmt;

use quire_tree::{Node, NodeType, Point, Position};
use serde::{Deserialize, Serialize};

/// Severity level for messages.
///
/// The ordering puts fatal errors first, which is the order reports use.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fatal: the file could not be processed.
    Error,
    /// Warning: the file was processed but something should be reviewed.
    #[default]
    Warning,
    /// Informational.
    Info,
}

impl Severity {
    /// Returns true for fatal messages.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Label used by reporters.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a message applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Place {
    Point(Point),
    Position(Position),
}

impl Place {
    /// Returns the starting point.
    pub fn start(&self) -> Point {
        match self {
            Self::Point(point) => *point,
            Self::Position(position) => position.start,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(point) => point.fmt(f),
            Self::Position(position) => position.fmt(f),
        }
    }
}

/// A diagnostic on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Human readable reason.
    pub reason: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,

    /// Path of the file the message belongs to.
    #[serde(default)]
    pub file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    /// The plugin or component that emitted the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Underlying error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Types of the nodes enclosing the reported node, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<NodeType>,
}

impl Message {
    /// Creates a warning with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            severity: Severity::Warning,
            place: None,
            file: String::new(),
            rule_id: None,
            source: None,
            cause: None,
            note: None,
            url: None,
            ancestors: Vec::new(),
        }
    }

    /// Sets the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Places the message at `node`, when it has a position.
    pub fn at(mut self, node: &Node) -> Self {
        if let Some(position) = node.position {
            self.place = Some(Place::Position(position));
        }
        self
    }

    /// Sets the place.
    pub fn with_place(mut self, place: Place) -> Self {
        self.place = Some(place);
        self
    }

    /// Sets the source and rule id.
    pub fn with_origin(mut self, source: impl Into<String>, rule_id: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Sets the cause.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Sets the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the documentation url.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the ancestor node types.
    pub fn with_ancestors(mut self, ancestors: Vec<NodeType>) -> Self {
        self.ancestors = ancestors;
        self
    }

    /// Returns true if this message is fatal.
    pub fn is_fatal(&self) -> bool {
        self.severity.is_fatal()
    }

    fn line(&self) -> usize {
        self.place.map(|place| place.start().line).unwrap_or(0)
    }

    fn column(&self) -> usize {
        self.place.map(|place| place.start().column).unwrap_or(0)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.file.is_empty() {
            write!(f, "{}:", self.file)?;
        }
        match &self.place {
            Some(place) => write!(f, "{}: {}", place, self.reason),
            None => write!(f, "1:1: {}", self.reason),
        }
    }
}

/// Orders messages by line, column, severity (fatal first), source, rule id
/// and reason.
pub fn compare_messages(a: &Message, b: &Message) -> Ordering {
    a.line()
        .cmp(&b.line())
        .then_with(|| a.column().cmp(&b.column()))
        .then_with(|| a.severity.cmp(&b.severity))
        .then_with(|| compare_optional(&a.source, &b.source))
        .then_with(|| compare_optional(&a.rule_id, &b.rule_id))
        .then_with(|| a.reason.cmp(&b.reason))
}

fn compare_optional(a: &Option<String>, b: &Option<String>) -> Ordering {
    a.as_deref().unwrap_or("").cmp(b.as_deref().unwrap_or(""))
}

/// Sorts messages in place, see [`compare_messages`].
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(compare_messages);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(reason: &str, line: usize, column: usize) -> Message {
        Message::new(reason).with_place(Place::Point(Point::new(line, column)))
    }

    #[test]
    fn test_sort_by_place_then_severity() {
        let mut messages = vec![
            at("b", 2, 1),
            at("a", 1, 5),
            at("c", 1, 5).with_severity(Severity::Error),
            Message::new("unplaced"),
            at("d", 1, 5).with_severity(Severity::Info),
        ];

        sort_messages(&mut messages);

        let reasons: Vec<_> = messages.iter().map(|m| m.reason.as_str()).collect();
        assert_eq!(reasons, vec!["unplaced", "c", "a", "d", "b"]);
    }

    #[test]
    fn test_sort_by_source_and_rule() {
        let mut messages = vec![
            at("x", 1, 1).with_origin("b", "r"),
            at("x", 1, 1).with_origin("a", "s"),
            at("x", 1, 1).with_origin("a", "r"),
        ];

        sort_messages(&mut messages);

        let keys: Vec<_> = messages
            .iter()
            .map(|m| format!("{}/{}", m.source.as_deref().unwrap(), m.rule_id.as_deref().unwrap()))
            .collect();
        assert_eq!(keys, vec!["a/r", "a/s", "b/r"]);
    }

    #[test]
    fn test_display() {
        let mut message = Message::new("Cannot find file `c.md`").with_place(Place::Position(
            Position::new(Point::new(1, 1), Point::new(1, 12)),
        ));
        message.file = "a.md".to_string();

        assert_eq!(message.to_string(), "a.md:1:1-1:12: Cannot find file `c.md`");
    }

    #[test]
    fn test_at_node_without_position() {
        let message = Message::new("x").at(&Node::new(NodeType::Link));
        assert_eq!(message.place, None);
    }
}
