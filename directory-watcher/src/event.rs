//! Change events from directory watching.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};

/// A creation or deletion somewhere below a watched root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The kind of change.
    pub kind: ChangeKind,

    /// Absolute path of the created or deleted entry.
    pub path: PathBuf,

    /// When the event was observed.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create a new change event stamped with the current time.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Created, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Deleted, path)
    }

    /// Whether the changed path lies at or below `root`.
    ///
    /// Comparison is per path component, so `/work/app` does not contain
    /// `/work/application`.
    pub fn is_under(&self, root: &Path) -> bool {
        self.path.starts_with(root)
    }

    /// Translate a raw notify event into zero or more change events.
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        match event.kind {
            // Both halves of the rename arrive together: old path first.
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let mut paths = event.paths.into_iter();
                paths
                    .next()
                    .map(Self::deleted)
                    .into_iter()
                    .chain(paths.next().map(Self::created))
                    .collect()
            }
            // The platform could not tell which side of the rename this is.
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
                .paths
                .into_iter()
                .map(|path| {
                    if path.exists() {
                        Self::created(path)
                    } else {
                        Self::deleted(path)
                    }
                })
                .collect(),
            kind => match ChangeKind::from_notify(kind) {
                Some(kind) => event
                    .paths
                    .into_iter()
                    .map(|path| Self::new(kind, path))
                    .collect(),
                None => Vec::new(),
            },
        }
    }
}

/// Kind of change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Entry was created (or renamed into place).
    Created,

    /// Entry was deleted (or renamed away).
    Deleted,
}

impl ChangeKind {
    /// Map a notify event kind, dropping kinds that cannot change which
    /// folders exist.
    pub fn from_notify(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(Self::Deleted),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Self::Created),
            _ => None,
        }
    }
}
