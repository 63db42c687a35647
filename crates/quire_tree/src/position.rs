//! Point and position types for source locations.
//!
//! These follow unist: lines and columns are 1-indexed, offsets are
//! 0-indexed byte offsets into the source text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single place in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset (0-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Point {
    /// Creates a new point without an offset.
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            offset: None,
        }
    }

    /// Creates a new point with a byte offset.
    #[inline]
    pub const fn with_offset(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset: Some(offset),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A range in source text, from `start` (inclusive) to `end` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Start point.
    pub start: Point,
    /// End point.
    pub end: Point,
}

impl Position {
    /// Creates a new position.
    #[inline]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Returns true if this position covers a single place.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_display() {
        assert_eq!(Point::new(3, 7).to_string(), "3:7");
    }

    #[test]
    fn test_position_display() {
        let position = Position::new(Point::new(1, 1), Point::with_offset(1, 8, 7));
        assert_eq!(position.to_string(), "1:1-1:8");
        assert!(!position.is_empty());
    }

    #[test]
    fn test_point_ordering() {
        assert!(Point::new(1, 9) < Point::new(2, 1));
        assert!(Point::new(2, 1) < Point::new(2, 3));
    }

    #[test]
    fn test_offset_is_optional_in_json() {
        let point: Point = serde_json::from_str(r#"{"line":2,"column":4}"#).unwrap();
        assert_eq!(point, Point::new(2, 4));

        let json = serde_json::to_string(&Point::with_offset(1, 1, 0)).unwrap();
        assert_eq!(json, r#"{"line":1,"column":1,"offset":0}"#);
    }
}
