//! Configuration surface and sidecar placement.
//!
//! The host supplies configuration values; the engine only reads them.
//! There is no config-file parsing here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The shipped default for the author setting. Leaving it in place is the
/// "missing configuration" condition: the engine warns and attributes
/// comments to [`FALLBACK_AUTHOR`] instead.
pub const AUTHOR_PLACEHOLDER: &str = "Author";

/// Attribution used when no real author name is configured.
pub const FALLBACK_AUTHOR: &str = "Unknown";

fn default_filename() -> String {
    "comments.json".to_string()
}

fn default_author() -> String {
    AUTHOR_PLACEHOLDER.to_string()
}

/// Engine configuration, host-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sidecar file name, joined onto the resolved store directory.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Display name stamped onto new comments.
    #[serde(default = "default_author")]
    pub author: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            author: default_author(),
        }
    }
}

/// The configured author was left unset or at the placeholder.
#[derive(Debug, thiserror::Error)]
#[error("author is not configured (found '{configured}'); set it so comments carry your name")]
pub struct MissingAuthorError {
    pub configured: String,
}

impl EngineConfig {
    /// The author name to stamp onto comments, or an error when it was
    /// never configured. The error is recoverable: callers warn and fall
    /// back to [`FALLBACK_AUTHOR`].
    ///
    /// # Errors
    ///
    /// [`MissingAuthorError`] when the author is empty or still the
    /// placeholder.
    pub fn resolved_author(&self) -> Result<&str, MissingAuthorError> {
        let author = self.author.trim();
        if author.is_empty() || author == AUTHOR_PLACEHOLDER {
            return Err(MissingAuthorError {
                configured: self.author.clone(),
            });
        }
        Ok(author)
    }
}

/// Where the sidecar file lives: the documented two-branch policy.
///
/// With a workspace open, the sidecar sits at the workspace root. With a
/// single file opened outside any workspace, it sits next to that file in
/// the same directory. Resolved once at startup and re-resolved when the
/// workspace root changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    WorkspaceRoot(PathBuf),
    BesideActiveFile(PathBuf),
}

impl StoreLocation {
    /// Apply the two-branch policy. Returns `None` when there is neither
    /// a workspace nor an active file to anchor to.
    #[must_use]
    pub fn resolve(workspace_root: Option<&Path>, active_file: Option<&Path>) -> Option<Self> {
        if let Some(root) = workspace_root {
            return Some(Self::WorkspaceRoot(root.to_path_buf()));
        }
        active_file
            .and_then(Path::parent)
            .map(|dir| Self::BesideActiveFile(dir.to_path_buf()))
    }

    /// The directory holding the sidecar file.
    #[must_use]
    pub fn dir(&self) -> &Path {
        match self {
            Self::WorkspaceRoot(dir) | Self::BesideActiveFile(dir) => dir,
        }
    }

    /// Full sidecar path for the configured file name.
    #[must_use]
    pub fn sidecar_path(&self, filename: &str) -> PathBuf {
        self.dir().join(filename)
    }
}
