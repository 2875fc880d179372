//! # Directory Watcher
//!
//! Watches project roots recursively and reports the changes that can alter
//! the set of folders below them: creations and deletions. Renames are
//! reported as a deletion of the old path followed by a creation of the new
//! one; content modifications and access events are dropped at the source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  roots ──► notify::RecommendedWatcher ──► ChangeEvent           │
//! │                                               │                 │
//! │                                               ▼                 │
//! │                                     mpsc::Receiver (consumer)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod watcher;

pub use error::{Result, WatcherError};
pub use event::{ChangeEvent, ChangeKind};
pub use watcher::DirectoryWatcher;
