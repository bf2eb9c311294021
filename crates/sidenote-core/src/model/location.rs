use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A zero-based line/column position inside a text document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// An inclusive pair of positions. Serialized as a two-element array
/// `[start, end]` to match the sidecar wire format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(from = "(Position, Position)", into = "(Position, Position)")]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Span covering an entire document of `line_count` lines.
    #[must_use]
    pub fn whole_document(line_count: u32) -> Self {
        Self {
            start: Position::new(0, 0),
            end: Position::new(line_count.saturating_sub(1), 0),
        }
    }
}

impl From<(Position, Position)> for Range {
    fn from((start, end): (Position, Position)) -> Self {
        Self { start, end }
    }
}

impl From<Range> for (Position, Position) {
    fn from(range: Range) -> Self {
        (range.start, range.end)
    }
}

/// The identity of an annotation: the annotated file plus the exact range.
///
/// A `Location` is the registry key — at most one thread exists per exact
/// `(path, range)` pair. Range equality participates in identity, so two
/// threads on the same file with different ranges coexist.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Location {
    pub path: PathBuf,
    pub range: Range,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, range: Range) -> Self {
        Self {
            path: path.into(),
            range,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}.{}-{}.{}",
            self.path.display(),
            self.range.start.line,
            self.range.start.character,
            self.range.end.line,
            self.range.end.character
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Location, Position, Range};

    #[test]
    fn range_serializes_as_position_pair() {
        let range = Range::new(Position::new(2, 0), Position::new(4, 7));
        let json = serde_json::to_string(&range).expect("serialize");
        assert_eq!(
            json,
            r#"[{"line":2,"character":0},{"line":4,"character":7}]"#
        );

        let back: Range = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, range);
    }

    #[test]
    fn location_wire_shape() {
        let loc = Location::new("src/a.txt", Range::new(Position::new(0, 0), Position::new(0, 1)));
        let json = serde_json::to_value(&loc).expect("serialize");
        assert_eq!(json["path"], "src/a.txt");
        assert!(json["range"].is_array());
        assert_eq!(json["range"][0]["line"], 0);
        assert_eq!(json["range"][1]["character"], 1);
    }

    #[test]
    fn identity_includes_the_full_range() {
        let a = Location::new("a.txt", Range::new(Position::new(0, 0), Position::new(0, 1)));
        let b = Location::new("a.txt", Range::new(Position::new(0, 0), Position::new(0, 2)));
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn whole_document_spans_first_to_last_line() {
        let range = Range::whole_document(10);
        assert_eq!(range.start, Position::new(0, 0));
        assert_eq!(range.end, Position::new(9, 0));

        // An empty document still yields a valid (degenerate) range.
        let empty = Range::whole_document(0);
        assert_eq!(empty.start, empty.end);
    }
}
