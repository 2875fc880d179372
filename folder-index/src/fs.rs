//! Filesystem access provided by the host.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name of the child.
    pub name: String,

    /// Whether the child is (or, for a symlink, points at) a directory.
    pub is_dir: bool,

    /// Whether the child itself is a symbolic link.
    pub is_symlink: bool,
}

impl DirEntry {
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            is_symlink: false,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            is_symlink: false,
        }
    }

    pub fn symlink(name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
            is_symlink: true,
        }
    }
}

/// Directory listing capability.
#[async_trait]
pub trait HostFs: Send + Sync {
    /// List the children of `path` with their types. Order is unspecified.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
}

/// [`HostFs`] over the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl HostFs for LocalFs {
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(path).await?;

        while let Some(entry) = reader.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                debug!("Skipping non UTF-8 entry in {}", path.display());
                continue;
            };

            // Type of the entry itself; symlinks are not followed here.
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!("Error accessing {}: {e}", entry.path().display());
                    continue;
                }
            };

            let is_symlink = file_type.is_symlink();
            let is_dir = if is_symlink {
                tokio::fs::metadata(entry.path())
                    .await
                    .is_ok_and(|metadata| metadata.is_dir())
            } else {
                file_type.is_dir()
            };

            entries.push(DirEntry {
                name,
                is_dir,
                is_symlink,
            });
        }

        Ok(entries)
    }
}
