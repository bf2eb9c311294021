//! Watch guard: external-change detection with self-write suppression.
//!
//! The engine's own saves modify the very file it watches, so a naive
//! watcher would refresh (and re-render every thread) after each write —
//! or worse, loop. The guard distinguishes the engine's writes from real
//! external edits by content fingerprint: [`SidecarStore::save`] reports
//! the blake3 hash of the bytes it wrote, and an observed change whose
//! on-disk bytes hash to that same value is discarded.
//!
//! Fingerprints are preferred over a suppression timer because a timer is
//! a race: a fast external writer landing inside the blind window would be
//! lost. A fingerprint match is also harmless to suppress late — an
//! external write with byte-identical content would rebuild an identical
//! registry anyway.
//!
//! The guard owns at most one live watch handle. Re-arming drops the old
//! handle before acquiring the new one, so refresh events are never
//! delivered twice.
//!
//! [`SidecarStore::save`]: crate::store::SidecarStore::save

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// blake3 hash of sidecar file content.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.0.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Host seam
// ---------------------------------------------------------------------------

/// File-change kinds the host watcher reports for the sidecar path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Created,
    Changed,
    Deleted,
}

/// The underlying file watch could not be established.
///
/// Non-fatal: the engine keeps working for in-session mutations with
/// external-change detection disabled (e.g. a single file opened outside
/// any watchable workspace root).
#[derive(Debug, thiserror::Error)]
#[error("cannot watch {}: {reason}", path.display())]
pub struct WatchSetupError {
    pub path: PathBuf,
    pub reason: String,
}

/// A live watch subscription. Dropping the handle releases it.
pub trait WatchHandle {}

/// Host-implemented factory for file watches.
///
/// The host owns the actual OS watcher and delivers its events back into
/// the engine on the event loop (`AnnotationEngine::on_watch_event`).
pub trait WatchBackend {
    /// Establish a watch on `path`.
    ///
    /// # Errors
    ///
    /// [`WatchSetupError`] if the path cannot be watched.
    fn watch(&mut self, path: &Path) -> Result<Box<dyn WatchHandle>, WatchSetupError>;
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

/// What to do with an observed file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchVerdict {
    /// A real external change: rebuild the registry from disk.
    Refresh,
    /// The echo of the engine's own save: discard.
    SelfWrite,
}

/// Owns the watch subscription and the last-written fingerprint.
pub struct WatchGuard {
    handle: Option<Box<dyn WatchHandle>>,
    path: Option<PathBuf>,
    last_written: Option<Fingerprint>,
}

impl WatchGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handle: None,
            path: None,
            last_written: None,
        }
    }

    /// (Re)establish the watch on `path`.
    ///
    /// Idempotent and callable repeatedly during the process lifetime
    /// (the sidecar path moves when the workspace root changes). Any
    /// previous handle is released before the new one is acquired.
    /// Setup failure degrades to no external-change detection.
    pub fn begin_watch(&mut self, backend: &mut dyn WatchBackend, path: &Path) {
        // Release first: two live watches would deliver duplicate events.
        self.handle = None;

        match backend.watch(path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "watching sidecar file");
                self.handle = Some(handle);
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "watch unavailable; external changes will not be detected"
                );
            }
        }
        self.path = Some(path.to_path_buf());
    }

    /// Whether a live watch subscription exists.
    #[must_use]
    pub const fn is_watching(&self) -> bool {
        self.handle.is_some()
    }

    /// Record the fingerprint of a completed save so the resulting change
    /// event can be recognized as the engine's own.
    pub fn note_write(&mut self, fingerprint: Fingerprint) {
        self.last_written = Some(fingerprint);
    }

    /// Classify an observed event as an external change or a self-write.
    ///
    /// Delete events always refresh (the file became empty from the
    /// engine's point of view; the engine never deletes the sidecar
    /// itself). Create/change events are fingerprinted against the last
    /// write; anything else is external.
    pub fn classify(&mut self, event: WatchEvent) -> WatchVerdict {
        match event {
            WatchEvent::Deleted => {
                self.last_written = None;
                WatchVerdict::Refresh
            }
            WatchEvent::Created | WatchEvent::Changed => {
                if let (Some(last_written), Some(path)) = (self.last_written, self.path.as_deref())
                {
                    // A read failure here means the file vanished between
                    // the event and the read: treat it as external.
                    if let Ok(bytes) = fs::read(path) {
                        if Fingerprint::of(&bytes) == last_written {
                            tracing::debug!(path = %path.display(), "self-write suppressed");
                            return WatchVerdict::SelfWrite;
                        }
                    }
                }
                // Once an external change is accepted the fingerprint is
                // stale: a later revert to the engine's last-written bytes
                // is an external edit too, and must not be suppressed.
                self.last_written = None;
                WatchVerdict::Refresh
            }
        }
    }
}

impl Default for WatchGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard")
            .field("path", &self.path)
            .field("watching", &self.handle.is_some())
            .field("last_written", &self.last_written)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{
        Fingerprint, WatchBackend, WatchEvent, WatchGuard, WatchHandle, WatchSetupError,
        WatchVerdict,
    };
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeHandle {
        live: Arc<AtomicUsize>,
    }

    impl WatchHandle for FakeHandle {}

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Counts live handles; optionally refuses to watch.
    struct FakeBackend {
        live: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                live: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }
        }
    }

    impl WatchBackend for FakeBackend {
        fn watch(&mut self, path: &Path) -> Result<Box<dyn WatchHandle>, WatchSetupError> {
            if self.fail {
                return Err(WatchSetupError {
                    path: path.to_path_buf(),
                    reason: "path outside watchable root".into(),
                });
            }
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeHandle {
                live: Arc::clone(&self.live),
            }))
        }
    }

    fn guarded_file(content: &[u8]) -> (WatchGuard, FakeBackend, tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.json");
        fs::write(&path, content).expect("write");

        let mut backend = FakeBackend::new();
        let mut guard = WatchGuard::new();
        guard.begin_watch(&mut backend, &path);
        (guard, backend, dir, path)
    }

    #[test]
    fn fingerprint_equality_tracks_content() {
        assert_eq!(Fingerprint::of(b"[]"), Fingerprint::of(b"[]"));
        assert_ne!(Fingerprint::of(b"[]"), Fingerprint::of(b"[{}]"));
    }

    #[test]
    fn change_with_no_prior_write_refreshes() {
        let (mut guard, _backend, _dir, _path) = guarded_file(b"[]");
        assert_eq!(guard.classify(WatchEvent::Changed), WatchVerdict::Refresh);
    }

    #[test]
    fn own_write_is_suppressed() {
        let (mut guard, _backend, _dir, path) = guarded_file(b"[]");

        let body = b"[{\"x\":1}]";
        fs::write(&path, body).expect("write");
        guard.note_write(Fingerprint::of(body));

        assert_eq!(guard.classify(WatchEvent::Changed), WatchVerdict::SelfWrite);
        // The same write may fire both a create and a change event.
        assert_eq!(guard.classify(WatchEvent::Created), WatchVerdict::SelfWrite);
    }

    #[test]
    fn external_overwrite_after_own_write_refreshes() {
        let (mut guard, _backend, _dir, path) = guarded_file(b"[]");

        guard.note_write(Fingerprint::of(b"[]"));
        fs::write(&path, b"[1,2,3]").expect("external write");

        assert_eq!(guard.classify(WatchEvent::Changed), WatchVerdict::Refresh);
    }

    #[test]
    fn revert_to_own_bytes_after_external_change_refreshes() {
        let (mut guard, _backend, _dir, path) = guarded_file(b"[]");

        let own = b"[{\"x\":1}]";
        fs::write(&path, own).expect("write");
        guard.note_write(Fingerprint::of(own));

        // An external overwrite is accepted as a refresh.
        fs::write(&path, b"[2]").expect("external write");
        assert_eq!(guard.classify(WatchEvent::Changed), WatchVerdict::Refresh);

        // Reverting the file to the engine's last-written bytes (say a
        // `git checkout` of the sidecar) is an external edit as well.
        fs::write(&path, own).expect("revert");
        assert_eq!(guard.classify(WatchEvent::Changed), WatchVerdict::Refresh);
    }

    #[test]
    fn delete_always_refreshes() {
        let (mut guard, _backend, _dir, path) = guarded_file(b"[]");

        guard.note_write(Fingerprint::of(b"[]"));
        fs::remove_file(&path).expect("remove");

        assert_eq!(guard.classify(WatchEvent::Deleted), WatchVerdict::Refresh);
        // A recreate after deletion is external even with the old content.
        fs::write(&path, b"[]").expect("recreate");
        assert_eq!(guard.classify(WatchEvent::Created), WatchVerdict::Refresh);
    }

    #[test]
    fn begin_watch_releases_the_previous_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.json");

        let mut backend = FakeBackend::new();
        let mut guard = WatchGuard::new();

        guard.begin_watch(&mut backend, &path);
        assert_eq!(backend.live.load(Ordering::SeqCst), 1);

        // Re-arm on a new path: exactly one handle stays live.
        let moved = dir.path().join("elsewhere.json");
        guard.begin_watch(&mut backend, &moved);
        assert_eq!(backend.live.load(Ordering::SeqCst), 1);
        assert!(guard.is_watching());
    }

    #[test]
    fn setup_failure_degrades_without_a_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.json");

        let mut backend = FakeBackend::new();
        backend.fail = true;

        let mut guard = WatchGuard::new();
        guard.begin_watch(&mut backend, &path);
        assert!(!guard.is_watching());

        // Classification still works: events the host somehow delivers
        // are treated as external.
        assert_eq!(guard.classify(WatchEvent::Changed), WatchVerdict::Refresh);
    }

    #[test]
    fn rearm_after_failure_recovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.json");

        let mut backend = FakeBackend::new();
        backend.fail = true;
        let mut guard = WatchGuard::new();
        guard.begin_watch(&mut backend, &path);
        assert!(!guard.is_watching());

        backend.fail = false;
        guard.begin_watch(&mut backend, &path);
        assert!(guard.is_watching());
        assert_eq!(backend.live.load(Ordering::SeqCst), 1);
    }
}
