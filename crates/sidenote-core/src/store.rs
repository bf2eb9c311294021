//! Sidecar persistence codec.
//!
//! Serializes the full thread collection to one JSON file and back.
//! Guarantees:
//!
//! - An absent file loads as the empty collection, not an error.
//! - Writes replace the file atomically (temp file + rename), so a reader
//!   never observes a partially written sidecar.
//! - Every save writes the *entire* collection; there is no incremental
//!   or append format.
//! - Session-transient state (`mode`, `saved_body`, comment ids) never
//!   reaches the wire.
//!
//! # Wire format
//!
//! UTF-8 JSON, array at top level:
//!
//! ```json
//! [
//!   {
//!     "location": { "path": "a.txt", "range": [{"line":0,"character":0},{"line":0,"character":1}] },
//!     "status": "open",
//!     "comments": [ { "body": "fix this", "author": "alice", "label": "open" } ]
//!   }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::{CommentLabel, Location, Thread, ThreadStatus};
use crate::watch::Fingerprint;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors crossing the store boundary.
///
/// Nothing here may escape the engine: `Corrupt` and `Read` recover to an
/// empty registry, `Write` surfaces a user-visible warning while the
/// in-memory state is retained.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The sidecar file exists but does not parse as the expected JSON.
    #[error("corrupt sidecar file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The sidecar file exists but could not be read.
    #[error("failed to read sidecar file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or renaming the sidecar file failed.
    #[error("failed to write sidecar file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The thread collection failed to serialize.
    #[error("failed to serialize sidecar for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// Wire form of one comment: body, author, and denormalized label only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub body: String,
    pub author: String,
    /// Absent for legacy data written before labels existed.
    #[serde(default)]
    pub label: Option<CommentLabel>,
}

/// Wire form of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub location: Location,
    #[serde(default)]
    pub status: ThreadStatus,
    pub comments: Vec<CommentRecord>,
}

impl From<&Thread> for ThreadRecord {
    fn from(thread: &Thread) -> Self {
        Self {
            location: thread.location.clone(),
            status: thread.status,
            comments: thread
                .comments
                .iter()
                .map(|c| CommentRecord {
                    body: c.body.clone(),
                    author: c.author.clone(),
                    label: c.label,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The persistence codec for one sidecar file.
///
/// Holds no open file handle; every operation opens, acts, and closes.
#[derive(Debug, Clone)]
pub struct SidecarStore {
    path: PathBuf,
}

impl SidecarStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the sidecar file.
    ///
    /// An absent file is the empty collection. A present-but-unparsable
    /// file is [`StoreError::Corrupt`]; the caller recovers with an empty
    /// registry and must not overwrite the file until the next explicit
    /// mutation, so a transient problem cannot destroy user data.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the file exists but cannot be read,
    /// [`StoreError::Corrupt`] if it cannot be parsed.
    pub fn load(&self) -> Result<Vec<ThreadRecord>, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no sidecar file, starting empty");
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Serialize the full collection and atomically replace the sidecar
    /// file. Returns the fingerprint of the bytes written, which the watch
    /// guard uses to recognize (and discard) the resulting change event.
    ///
    /// # Errors
    ///
    /// [`StoreError::Serialize`] if encoding fails, [`StoreError::Write`]
    /// if the temp-file write or rename fails. On error the previous file
    /// content is left intact.
    pub fn save<'a, I>(&self, threads: I) -> Result<Fingerprint, StoreError>
    where
        I: IntoIterator<Item = &'a Thread>,
    {
        let records: Vec<ThreadRecord> = threads.into_iter().map(ThreadRecord::from).collect();
        let body =
            serde_json::to_vec_pretty(&records).map_err(|source| StoreError::Serialize {
                path: self.path.clone(),
                source,
            })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &body).map_err(|source| StoreError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(
            path = %self.path.display(),
            threads = records.len(),
            "sidecar written"
        );
        Ok(Fingerprint::of(&body))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
