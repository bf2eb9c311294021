//! The annotation UI adapter seam.
//!
//! The host renders threads; the engine only pushes. Handles returned by
//! [`AnnotationUi::create_thread`] are opaque display projections —
//! synchronized one-way from the registry, never read back.

use crate::model::Thread;

/// Calls the core makes into the host's annotation UI.
pub trait AnnotationUi {
    /// Opaque handle to one rendered thread.
    type Handle;

    /// Render a thread and return its handle.
    fn create_thread(&mut self, thread: &Thread) -> Self::Handle;

    /// Collapse a rendered thread (after a draft is finished).
    fn collapse(&mut self, handle: &mut Self::Handle);

    /// Tear down a rendered thread.
    fn dispose(&mut self, handle: Self::Handle);

    /// Show a user-visible warning (configuration problems, failed
    /// writes). Must not panic or block.
    fn warn(&mut self, message: &str);
}
