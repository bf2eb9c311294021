//! Shared test doubles: a recording UI adapter and a stub watch backend.

use sidenote_core::config::{EngineConfig, StoreLocation};
use sidenote_core::engine::AnnotationEngine;
use sidenote_core::model::Thread;
use sidenote_core::ui::AnnotationUi;
use sidenote_core::watch::{WatchBackend, WatchHandle, WatchSetupError};
use std::path::Path;

/// UI adapter that records every call the engine makes.
#[derive(Default)]
pub struct RecordingUi {
    next_handle: u64,
    pub created: Vec<u64>,
    pub disposed: Vec<u64>,
    pub collapsed: Vec<u64>,
    pub warnings: Vec<String>,
}

impl AnnotationUi for RecordingUi {
    type Handle = u64;

    fn create_thread(&mut self, _thread: &Thread) -> u64 {
        self.next_handle += 1;
        self.created.push(self.next_handle);
        self.next_handle
    }

    fn collapse(&mut self, handle: &mut u64) {
        self.collapsed.push(*handle);
    }

    fn dispose(&mut self, handle: u64) {
        self.disposed.push(handle);
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

pub struct StubHandle;

impl WatchHandle for StubHandle {}

/// Watch backend that always succeeds; the tests deliver events by
/// calling `on_watch_event` directly, as the host would.
#[derive(Default)]
pub struct StubWatch;

impl WatchBackend for StubWatch {
    fn watch(&mut self, _path: &Path) -> Result<Box<dyn WatchHandle>, WatchSetupError> {
        Ok(Box::new(StubHandle))
    }
}

/// Engine rooted at `dir` with a started watch and an initial load.
pub fn engine_at(dir: &Path, author: &str) -> AnnotationEngine<RecordingUi, StubWatch> {
    let config = EngineConfig {
        filename: "comments.json".into(),
        author: author.into(),
    };
    let location = StoreLocation::WorkspaceRoot(dir.to_path_buf());
    let mut engine = AnnotationEngine::new(config, &location, RecordingUi::default(), StubWatch);
    engine.start();
    engine
}
