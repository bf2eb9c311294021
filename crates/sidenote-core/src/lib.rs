//! sidenote-core: the annotation-store synchronization engine.
//!
//! Keeps an in-memory registry of comment threads consistent with one
//! on-disk JSON sidecar file, across user mutations, external edits to
//! the file, and the feedback loop created by the engine's own writes
//! landing in its own file watcher.
//!
//! This is an embedded engine: the host supplies the annotation UI (via
//! [`ui::AnnotationUi`]), the file watcher (via [`watch::WatchBackend`]),
//! and configuration values, and forwards user actions into
//! [`engine::AnnotationEngine`] entry points.
//!
//! # Conventions
//!
//! - **Errors**: per-module `thiserror` enums; nothing propagates past
//!   the engine boundary — failures are logged and, where user-initiated,
//!   surfaced through the UI adapter.
//! - **Logging**: `tracing` macros with structured fields. The library
//!   installs no subscriber.

pub mod config;
pub mod engine;
pub mod model;
pub mod registry;
pub mod store;
pub mod ui;
pub mod watch;

pub use config::{EngineConfig, StoreLocation};
pub use engine::{commenting_ranges, AnnotationEngine};
pub use model::{
    Comment, CommentId, CommentLabel, CommentMode, Location, Position, Range, Thread, ThreadStatus,
};
pub use registry::ThreadRegistry;
pub use store::{SidecarStore, StoreError};
pub use ui::AnnotationUi;
pub use watch::{Fingerprint, WatchBackend, WatchEvent, WatchGuard, WatchHandle, WatchSetupError};
