//! The in-memory authoritative thread collection.
//!
//! Keyed by [`Location`] (path + exact range), so at most one thread
//! exists per location; an exact-key collision on [`upsert`] is
//! last-write-wins. Iteration order is the key order of the underlying
//! `BTreeMap` — deterministic, which is all the sidecar format requires.
//!
//! The registry also owns the comment-id counter. Scoping the counter to
//! the registry instance (rather than process-global state) keeps ids
//! monotonic for the session while letting independent registries — e.g.
//! in tests — allocate without interfering.
//!
//! [`upsert`]: ThreadRegistry::upsert

use std::collections::BTreeMap;

use crate::model::{Comment, CommentId, CommentLabel, Location, Thread};
use crate::store::ThreadRecord;

/// Authoritative collection of threads plus the session id allocator.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: BTreeMap<Location, Thread>,
    next_comment_id: u64,
}

impl ThreadRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threads: BTreeMap::new(),
            next_comment_id: 0,
        }
    }

    /// Allocate the next session-local comment id. Ids are never reused,
    /// including across [`reload`](Self::reload).
    pub fn allocate_comment_id(&mut self) -> CommentId {
        self.next_comment_id += 1;
        CommentId(self.next_comment_id)
    }

    /// Build a comment with a freshly allocated id.
    pub fn new_comment(
        &mut self,
        body: impl Into<String>,
        author: impl Into<String>,
        label: Option<CommentLabel>,
    ) -> Comment {
        let id = self.allocate_comment_id();
        Comment::new(id, body, author, label)
    }

    #[must_use]
    pub fn get(&self, location: &Location) -> Option<&Thread> {
        self.threads.get(location)
    }

    pub fn get_mut(&mut self, location: &Location) -> Option<&mut Thread> {
        self.threads.get_mut(location)
    }

    /// Insert or replace by location key.
    pub fn upsert(&mut self, thread: Thread) {
        self.threads.insert(thread.location.clone(), thread);
    }

    /// Remove and return the thread at `location`, if any.
    pub fn remove(&mut self, location: &Location) -> Option<Thread> {
        self.threads.remove(location)
    }

    /// Replace the entire collection from wire records.
    ///
    /// Comments are materialized with fresh ids and `Viewing` mode.
    /// Records with zero comments are dropped — an empty thread is
    /// meaningless and is never retained, wherever it came from.
    pub fn reload<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ThreadRecord>,
    {
        self.threads.clear();
        for record in records {
            if record.comments.is_empty() {
                tracing::warn!(
                    location = %record.location,
                    "dropping persisted thread with no comments"
                );
                continue;
            }
            let mut thread = Thread::new(record.location, record.status);
            for comment in record.comments {
                let id = self.allocate_comment_id();
                thread.push_comment(Comment::new(id, comment.body, comment.author, comment.label));
            }
            self.threads.insert(thread.location.clone(), thread);
        }
        tracing::debug!(threads = self.threads.len(), "registry rebuilt");
    }

    /// Snapshot iterator for serialization.
    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

impl<'a> IntoIterator for &'a ThreadRegistry {
    type Item = &'a Thread;
    type IntoIter = std::collections::btree_map::Values<'a, Location, Thread>;

    fn into_iter(self) -> Self::IntoIter {
        self.threads.values()
    }
}
