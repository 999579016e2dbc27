//! Mirroring of build output into a vault plugin folder.
//!
//! [`sync_once`] is the stateless copy step; [`WatchSession`] wraps it with a
//! filesystem watcher that repeats the copy for every changed file.

pub mod files;
pub mod session;

pub use files::{SyncEvent, SyncKind, WATCH_SET, copy_if_changed, files_equal, sync_once};
pub use session::WatchSession;
