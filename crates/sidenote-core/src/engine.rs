//! The annotation engine: mutation handlers and the write/watch loop.
//!
//! Control flow, in both directions:
//!
//! - UI action → mutation handler edits the registry → the store writes
//!   the full collection → the watch guard recognizes the resulting file
//!   event as a self-write and discards it.
//! - External edit → the watch guard sees an unfamiliar fingerprint →
//!   every rendered thread is disposed, the registry is rebuilt from the
//!   file, and the UI is re-rendered.
//!
//! Entry points are infallible at the host boundary: nothing in here may
//! terminate the host. Failures are caught where they occur, logged, and
//! surfaced through [`AnnotationUi::warn`] when the user initiated the
//! action. A failed save keeps the in-memory registry intact; the next
//! successful mutation writes the full state again.
//!
//! Everything runs on the host's single event loop; handlers run to
//! completion before the next event, so the registry needs no locking.

use std::collections::BTreeMap;

use crate::config::{EngineConfig, StoreLocation, FALLBACK_AUTHOR};
use crate::model::{Comment, CommentId, CommentMode, Location, Range, Thread, ThreadStatus};
use crate::registry::ThreadRegistry;
use crate::store::SidecarStore;
use crate::ui::AnnotationUi;
use crate::watch::{WatchBackend, WatchEvent, WatchGuard, WatchVerdict};

/// The commentable ranges the engine offers for a document: exactly one,
/// covering the entire document. Hosts wire this into their
/// range-provider callback.
#[must_use]
pub fn commenting_ranges(line_count: u32) -> Vec<Range> {
    vec![Range::whole_document(line_count)]
}

/// The annotation-store synchronization engine.
///
/// Owns the registry (authoritative data), the sidecar store, the watch
/// guard, and the map of rendered-thread handles. `U` is the host's
/// annotation UI; `W` its file-watch factory.
pub struct AnnotationEngine<U: AnnotationUi, W: WatchBackend> {
    config: EngineConfig,
    store: SidecarStore,
    registry: ThreadRegistry,
    guard: WatchGuard,
    backend: W,
    ui: U,
    handles: BTreeMap<Location, U::Handle>,
}

impl<U: AnnotationUi, W: WatchBackend> AnnotationEngine<U, W> {
    /// Build an engine storing its sidecar at `location` under the
    /// configured file name. Call [`start`](Self::start) next.
    pub fn new(config: EngineConfig, location: &StoreLocation, ui: U, backend: W) -> Self {
        let store = SidecarStore::new(location.sidecar_path(&config.filename));
        Self {
            config,
            store,
            registry: ThreadRegistry::new(),
            guard: WatchGuard::new(),
            backend,
            ui,
            handles: BTreeMap::new(),
        }
    }

    /// Arm the watch and load whatever the sidecar file currently holds.
    pub fn start(&mut self) {
        self.guard.begin_watch(&mut self.backend, self.store.path());
        self.reload();
    }

    /// Point the engine at a new store location (the workspace root
    /// changed). Re-arms the watch on the new path and reloads from it.
    pub fn relocate(&mut self, location: &StoreLocation) {
        let path = location.sidecar_path(&self.config.filename);
        tracing::info!(path = %path.display(), "store location changed");
        self.store = SidecarStore::new(path);
        self.start();
    }

    // -----------------------------------------------------------------------
    // Mutation handlers
    // -----------------------------------------------------------------------

    /// Create a thread at `location` with its first comment.
    ///
    /// The thread opens directly unless `draft` is requested. An exact
    /// location collision is last-write-wins: the previous thread's
    /// rendering is disposed and replaced.
    pub fn create_thread(&mut self, location: Location, text: &str, draft: bool) {
        let status = if draft {
            ThreadStatus::Draft
        } else {
            ThreadStatus::Open
        };
        let author = self.resolve_author();
        let comment = self
            .registry
            .new_comment(text, author, Some(status.label()));

        let mut thread = Thread::new(location.clone(), status);
        thread.push_comment(comment);

        if let Some(old) = self.handles.remove(&location) {
            self.ui.dispose(old);
        }
        let handle = self.ui.create_thread(&thread);
        self.handles.insert(location, handle);

        self.registry.upsert(thread);
        self.persist();
    }

    /// Append a comment to an existing thread.
    ///
    /// On a draft thread the comment is labelled `pending` and stays
    /// UI-local — nothing is persisted until the draft is finished.
    pub fn reply(&mut self, location: &Location, text: &str) {
        let Some(status) = self.registry.get(location).map(|t| t.status) else {
            tracing::debug!(location = %location, "reply on unknown thread ignored");
            return;
        };

        let author = self.resolve_author();
        let label = status.label();
        let comment = self.registry.new_comment(text, author, Some(label));
        if let Some(thread) = self.registry.get_mut(location) {
            thread.push_comment(comment);
        }

        if status == ThreadStatus::Draft {
            return;
        }
        self.persist();
    }

    /// Put a thread into draft state and append the pending comment.
    /// Nothing is persisted: draft content is UI-local until finished.
    pub fn start_draft(&mut self, location: &Location, text: &str) {
        let author = self.resolve_author();
        let comment = self
            .registry
            .new_comment(text, author, Some(ThreadStatus::Draft.label()));
        let Some(thread) = self.registry.get_mut(location) else {
            tracing::debug!(location = %location, "start_draft on unknown thread ignored");
            return;
        };
        // Existing comments keep their labels while the draft is open;
        // the label invariant applies once the thread leaves draft.
        thread.status = ThreadStatus::Draft;
        thread.push_comment(comment);
    }

    /// Finish a draft: optionally append a final comment, open the
    /// thread, relabel every comment, collapse the rendering, persist.
    pub fn finish_draft(&mut self, location: &Location, text: Option<&str>) {
        let Some(status) = self.registry.get(location).map(|t| t.status) else {
            tracing::debug!(location = %location, "finish_draft on unknown thread ignored");
            return;
        };
        if status != ThreadStatus::Draft {
            tracing::debug!(location = %location, %status, "finish_draft on non-draft ignored");
            return;
        }

        let final_comment = match text {
            Some(text) if !text.is_empty() => {
                let author = self.resolve_author();
                Some(
                    self.registry
                        .new_comment(text, author, Some(ThreadStatus::Open.label())),
                )
            }
            _ => None,
        };

        if let Some(thread) = self.registry.get_mut(location) {
            if let Some(comment) = final_comment {
                thread.push_comment(comment);
            }
            thread.set_status(ThreadStatus::Open);
        }

        if let Some(handle) = self.handles.get_mut(location) {
            self.ui.collapse(handle);
        }
        self.persist();
    }

    /// Mark a thread resolved. Relabels every comment.
    pub fn resolve(&mut self, location: &Location) {
        self.set_status(location, ThreadStatus::Resolved);
    }

    /// Reopen a resolved thread. Relabels every comment.
    pub fn unresolve(&mut self, location: &Location) {
        self.set_status(location, ThreadStatus::Open);
    }

    fn set_status(&mut self, location: &Location, status: ThreadStatus) {
        let Some(thread) = self.registry.get_mut(location) else {
            tracing::debug!(location = %location, "status change on unknown thread ignored");
            return;
        };
        thread.set_status(status);
        self.persist();
    }

    /// Open an editor on a comment. Local until explicitly saved.
    pub fn edit_comment(&mut self, location: &Location, id: CommentId) {
        if let Some(comment) = self.comment_mut(location, id) {
            comment.begin_edit();
        }
    }

    /// Commit an in-progress edit with the editor's text and persist.
    pub fn save_comment(&mut self, location: &Location, id: CommentId, body: &str) {
        let Some(comment) = self.comment_mut(location, id) else {
            return;
        };
        if comment.mode != CommentMode::Editing {
            tracing::debug!(location = %location, %id, "save for a comment not being edited");
            return;
        }
        comment.commit_edit(body);
        self.persist();
    }

    /// Discard an in-progress edit, restoring the last committed text.
    pub fn cancel_edit(&mut self, location: &Location, id: CommentId) {
        if let Some(comment) = self.comment_mut(location, id) {
            comment.cancel_edit();
        }
    }

    /// Delete one comment. Deleting the last comment deletes the thread:
    /// an empty thread is never retained or persisted.
    pub fn delete_comment(&mut self, location: &Location, id: CommentId) {
        let Some(thread) = self.registry.get_mut(location) else {
            tracing::debug!(location = %location, "delete_comment on unknown thread ignored");
            return;
        };
        if !thread.remove_comment(id) {
            tracing::debug!(location = %location, %id, "delete of unknown comment ignored");
            return;
        }
        if thread.is_empty() {
            self.delete_thread(location);
            return;
        }
        self.persist();
    }

    /// Delete a whole thread: registry removal, UI disposal, persist.
    pub fn delete_thread(&mut self, location: &Location) {
        if self.registry.remove(location).is_none() {
            tracing::debug!(location = %location, "delete of unknown thread ignored");
            return;
        }
        if let Some(handle) = self.handles.remove(location) {
            self.ui.dispose(handle);
        }
        self.persist();
    }

    // -----------------------------------------------------------------------
    // Watch loop
    // -----------------------------------------------------------------------

    /// Host entry point for file events on the sidecar path.
    pub fn on_watch_event(&mut self, event: WatchEvent) {
        match self.guard.classify(event) {
            WatchVerdict::SelfWrite => {}
            WatchVerdict::Refresh => {
                tracing::info!(?event, "external change to sidecar file");
                self.reload();
            }
        }
    }

    /// Full refresh: dispose every rendered thread, rebuild the registry
    /// from disk, re-render.
    ///
    /// A corrupt or unreadable file loads as empty. The file itself is
    /// left untouched — only the next explicit mutation overwrites it, so
    /// a transient problem cannot destroy unrecovered data.
    pub fn reload(&mut self) {
        for (_, handle) in std::mem::take(&mut self.handles) {
            self.ui.dispose(handle);
        }

        let records = match self.store.load() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "sidecar unreadable; starting from an empty registry");
                Vec::new()
            }
        };
        self.registry.reload(records);

        for thread in &self.registry {
            let handle = self.ui.create_thread(thread);
            self.handles.insert(thread.location.clone(), handle);
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Serialize the entire registry to the sidecar file and remember the
    /// written fingerprint. A failed write is surfaced to the user; the
    /// registry keeps the unsaved state.
    fn persist(&mut self) {
        match self.store.save(&self.registry) {
            Ok(fingerprint) => self.guard.note_write(fingerprint),
            Err(e) => {
                tracing::error!(error = %e, "failed to persist annotations");
                self.ui.warn(&format!("Failed to save comments: {e}"));
            }
        }
    }

    fn resolve_author(&mut self) -> String {
        match self.config.resolved_author() {
            Ok(author) => author.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "using fallback author");
                self.ui.warn(
                    "Please set the author setting to your name so it appears on your comments",
                );
                FALLBACK_AUTHOR.to_string()
            }
        }
    }

    fn comment_mut(&mut self, location: &Location, id: CommentId) -> Option<&mut Comment> {
        let comment = self
            .registry
            .get_mut(location)
            .and_then(|thread| thread.comment_mut(id));
        if comment.is_none() {
            tracing::debug!(location = %location, %id, "unknown comment ignored");
        }
        comment
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn registry(&self) -> &ThreadRegistry {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &SidecarStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn ui(&self) -> &U {
        &self.ui
    }

    /// Whether external-change detection is active.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.guard.is_watching()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
