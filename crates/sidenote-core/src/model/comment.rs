use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Session-local comment identifier.
///
/// Allocated by the registry's monotonically increasing counter; unique
/// within the running session, never reused, and not stable across
/// restarts (ids are reassigned when the sidecar file is reloaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a comment is displayed read-only or has an open editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentMode {
    #[default]
    Viewing,
    Editing,
}

/// The status tag shown on each comment.
///
/// Denormalized from the owning thread's status for display: every
/// status-changing operation rewrites the label on all comments in the
/// thread so it is never stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentLabel {
    Open,
    Pending,
    Resolved,
}

impl CommentLabel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for CommentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a label from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLabelError {
    pub got: String,
}

impl fmt::Display for ParseLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid label: '{}'", self.got)
    }
}

impl std::error::Error for ParseLabelError {}

impl FromStr for CommentLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseLabelError { got: s.to_string() }),
        }
    }
}

/// One authored message inside a thread.
///
/// `saved_body` and `mode` are session-transient editing state and never
/// reach the sidecar file; `label` may be absent for legacy data written
/// before labels existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub body: String,
    /// Last committed text, restored on cancel-edit.
    pub saved_body: String,
    pub mode: CommentMode,
    /// Display name resolved from configuration at creation time.
    pub author: String,
    pub label: Option<CommentLabel>,
}

impl Comment {
    #[must_use]
    pub fn new(
        id: CommentId,
        body: impl Into<String>,
        author: impl Into<String>,
        label: Option<CommentLabel>,
    ) -> Self {
        let body = body.into();
        Self {
            id,
            saved_body: body.clone(),
            body,
            mode: CommentMode::Viewing,
            author: author.into(),
            label,
        }
    }

    /// Open an editor on this comment. Local-only: nothing is persisted
    /// until the edit is explicitly saved.
    pub fn begin_edit(&mut self) {
        self.mode = CommentMode::Editing;
    }

    /// Commit `body` as the new text and leave edit mode.
    pub fn commit_edit(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.saved_body = self.body.clone();
        self.mode = CommentMode::Viewing;
    }

    /// Discard the in-progress edit, restoring the last committed text.
    pub fn cancel_edit(&mut self) {
        self.body = self.saved_body.clone();
        self.mode = CommentMode::Viewing;
    }
}
