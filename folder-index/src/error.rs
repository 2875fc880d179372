//! Error types for the folder index.

use thiserror::Error;

/// Result type alias for folder index operations.
pub type Result<T> = std::result::Result<T, FolderIndexError>;

/// Errors that can occur while building or navigating the folder index.
///
/// Scans never return these: per-directory failures are logged and the
/// affected subtree contributes nothing. They surface from setup and from
/// host collaborators only.
#[derive(Error, Debug)]
pub enum FolderIndexError {
    /// A project root could not be described.
    #[error("invalid project root: {0}")]
    InvalidRoot(String),

    /// A settings document could not be used.
    #[error("settings error: {0}")]
    Settings(String),

    /// A host call did not finish in time.
    #[error("timed out reading {0}")]
    Timeout(String),

    /// The host failed to reveal a folder.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Root URI could not be parsed.
    #[error("invalid root uri: {0}")]
    Url(#[from] url::ParseError),

    /// Directory watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] jumpto_directory_watcher::WatcherError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
