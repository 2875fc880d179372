//! Recursive folder scanning.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::FolderIndexSettings;
use crate::error::{FolderIndexError, Result};
use crate::exclude::ExclusionMatcher;
use crate::fs::{DirEntry, HostFs};
use crate::root::ProjectRoot;
use crate::scm::ScmIgnoreOracle;

/// Knobs for a single scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Log every pruned or unreadable directory.
    pub verbose: bool,

    /// Upper bound for each directory listing and ignore query.
    pub io_timeout: Option<Duration>,
}

impl From<&FolderIndexSettings> for ScanOptions {
    fn from(settings: &FolderIndexSettings) -> Self {
        Self {
            verbose: settings.verbose_logging,
            io_timeout: settings.io_timeout(),
        }
    }
}

/// A subdirectory waiting to be visited.
struct Candidate {
    path: PathBuf,
    relative: String,
}

/// Depth-first folder walk of one project root.
///
/// Hidden directories (name starts with `.`), symlinked directories,
/// SCM-ignored directories and directories matching an exclusion rule are
/// pruned together with everything below them. A directory is only reported
/// once it has been listed successfully; an unreadable directory and its
/// subtree contribute nothing and the walk carries on with its siblings.
pub struct DirectoryScanner<'a> {
    fs: &'a dyn HostFs,
    scm: &'a dyn ScmIgnoreOracle,
    matcher: &'a ExclusionMatcher,
    options: ScanOptions,
}

impl<'a> DirectoryScanner<'a> {
    pub fn new(
        fs: &'a dyn HostFs,
        scm: &'a dyn ScmIgnoreOracle,
        matcher: &'a ExclusionMatcher,
        options: ScanOptions,
    ) -> Self {
        Self {
            fs,
            scm,
            matcher,
            options,
        }
    }

    /// Relative paths of every folder under `root`, parent before child.
    ///
    /// Sibling order follows the host's listing order, which is not sorted.
    pub async fn scan(&self, root: &ProjectRoot) -> Vec<String> {
        let start = Instant::now();
        let mut folders = Vec::new();

        let entries = match self.list(root.path()).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Error scanning directory {}: {e}", root.path().display());
                return folders;
            }
        };

        let mut pending = candidates(root.path(), "", entries);
        while let Some(candidate) = pending.pop() {
            if self.is_pruned(&candidate).await {
                continue;
            }

            let entries = match self.list(&candidate.path).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Error scanning directory {}: {e}", candidate.path.display());
                    continue;
                }
            };

            pending.extend(candidates(&candidate.path, &candidate.relative, entries));
            folders.push(candidate.relative);
        }

        info!(
            "Scanned {} in {:?}: {} folders",
            root.name(),
            start.elapsed(),
            folders.len()
        );
        folders
    }

    async fn is_pruned(&self, candidate: &Candidate) -> bool {
        if self.is_ignored(&candidate.path).await {
            if self.options.verbose {
                debug!("Skipping {} (ignored by source control)", candidate.relative);
            }
            return true;
        }

        if self.matcher.is_excluded(&candidate.relative) {
            if self.options.verbose {
                debug!("Skipping {} due to exclusion", candidate.relative);
            }
            return true;
        }

        false
    }

    async fn is_ignored(&self, path: &Path) -> bool {
        match self.options.io_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.scm.is_ignored(path)).await {
                Ok(ignored) => ignored,
                Err(_) => {
                    warn!("Ignore check timed out for {}", path.display());
                    false
                }
            },
            None => self.scm.is_ignored(path).await,
        }
    }

    async fn list(&self, path: &Path) -> Result<Vec<DirEntry>> {
        match self.options.io_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fs.read_dir(path))
                .await
                .map_err(|_| FolderIndexError::Timeout(path.display().to_string()))?,
            None => self.fs.read_dir(path).await,
        }
    }
}

/// Subdirectories of `parent` worth visiting, reversed so that popping the
/// stack visits them in listing order.
fn candidates(parent: &Path, parent_relative: &str, entries: Vec<DirEntry>) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = entries
        .into_iter()
        .filter(|entry| entry.is_dir && !entry.is_symlink && !entry.name.starts_with('.'))
        .map(|entry| Candidate {
            path: parent.join(&entry.name),
            relative: if parent_relative.is_empty() {
                entry.name
            } else {
                format!("{parent_relative}/{}", entry.name)
            },
        })
        .collect();
    candidates.reverse();
    candidates
}
