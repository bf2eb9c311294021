//! Plain data records for annotation threads.
//!
//! These types are the authoritative in-memory representation. UI handles
//! rendered by the host are one-way projections of this model and are never
//! read back.

pub mod comment;
pub mod location;
pub mod thread;

pub use comment::{Comment, CommentId, CommentLabel, CommentMode};
pub use location::{Location, Position, Range};
pub use thread::{Thread, ThreadStatus};
