use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::comment::{Comment, CommentId, CommentLabel};
use super::location::Location;

/// The three thread lifecycle states.
///
/// `draft -> open <-> resolved`; deletion is terminal and not represented
/// (a deleted thread is simply removed from the registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Draft,
    #[default]
    Open,
    Resolved,
}

impl ThreadStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Resolved => "resolved",
        }
    }

    /// The comment label this status denormalizes to.
    #[must_use]
    pub const fn label(self) -> CommentLabel {
        match self {
            Self::Draft => CommentLabel::Pending,
            Self::Open => CommentLabel::Open,
            Self::Resolved => CommentLabel::Resolved,
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a thread status from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    pub got: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid thread status: '{}'", self.got)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ThreadStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseStatusError { got: s.to_string() }),
        }
    }
}

/// An annotation thread anchored to one file range.
///
/// Comments are kept in insertion order (conversation order). A thread
/// with zero comments is meaningless; the engine deletes it rather than
/// ever persisting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub location: Location,
    pub status: ThreadStatus,
    pub comments: Vec<Comment>,
}

impl Thread {
    #[must_use]
    pub const fn new(location: Location, status: ThreadStatus) -> Self {
        Self {
            location,
            status,
            comments: Vec::new(),
        }
    }

    pub fn push_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    #[must_use]
    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn comment_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == id)
    }

    /// Remove the comment with the given id. Returns whether it existed.
    pub fn remove_comment(&mut self, id: CommentId) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != id);
        self.comments.len() != before
    }

    /// Transition to `status` and rewrite every comment's label to match.
    ///
    /// Labels are denormalized thread state; this is the single place that
    /// keeps them consistent, so callers never touch labels directly when
    /// changing status.
    pub fn set_status(&mut self, status: ThreadStatus) {
        self.status = status;
        let label = status.label();
        for comment in &mut self.comments {
            comment.label = Some(label);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}
