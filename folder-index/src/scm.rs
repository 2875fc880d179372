//! Source-control ignore checks.
//!
//! The oracle answers a single question, whether version control ignores a
//! path, and must never fail: any internal problem is reported as "not
//! ignored" so a broken oracle cannot hide the whole tree.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use git2::Repository;
use tracing::{debug, warn};

/// Capability answering whether source control ignores a path.
#[async_trait]
pub trait ScmIgnoreOracle: Send + Sync {
    /// Whether `path` (absolute) is ignored. Returns `false` on any failure.
    async fn is_ignored(&self, path: &Path) -> bool;
}

/// Fallback used when no source-control integration is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScm;

#[async_trait]
impl ScmIgnoreOracle for NoScm {
    async fn is_ignored(&self, _path: &Path) -> bool {
        false
    }
}

/// An open repository keyed by its canonical working directory.
struct OpenRepository {
    workdir: PathBuf,
    repo: Repository,
}

/// Ignore checks against the rules of the enclosing git repository.
///
/// Repositories are discovered lazily from the queried paths and kept open
/// for later queries. Paths are canonicalized first, so a root reached
/// through a symlink shares the repository of its target. A path outside
/// any repository is not ignored.
#[derive(Clone, Default)]
pub struct GitIgnoreOracle {
    repositories: Arc<Mutex<Vec<OpenRepository>>>,
}

impl GitIgnoreOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(repositories: &Mutex<Vec<OpenRepository>>, path: &Path) -> bool {
        let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut repositories = repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let idx = match find_enclosing(&repositories, &path) {
            Some(idx) => idx,
            None => match Repository::discover(&path) {
                Ok(repo) => {
                    let Some(workdir) = repo.workdir() else {
                        return false;
                    };
                    let workdir =
                        dunce::canonicalize(workdir).unwrap_or_else(|_| workdir.to_path_buf());
                    match repositories.iter().position(|open| open.workdir == workdir) {
                        Some(idx) => idx,
                        None => {
                            debug!("Opened git repository at {}", workdir.display());
                            repositories.push(OpenRepository { workdir, repo });
                            repositories.len() - 1
                        }
                    }
                }
                Err(e) => {
                    debug!("No git repository for {}: {}", path.display(), e.message());
                    return false;
                }
            },
        };

        let open = &repositories[idx];
        let Ok(relative) = path.strip_prefix(&open.workdir) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }

        match open.repo.is_path_ignored(relative) {
            Ok(ignored) => ignored,
            Err(e) => {
                warn!("Git ignore check failed for {}: {e}", path.display());
                false
            }
        }
    }

    /// Number of repositories held open.
    pub fn open_repositories(&self) -> usize {
        self.repositories
            .lock()
            .map(|repos| repos.len())
            .unwrap_or_default()
    }
}

/// Index of the innermost open repository containing `path`.
fn find_enclosing(repositories: &[OpenRepository], path: &Path) -> Option<usize> {
    repositories
        .iter()
        .enumerate()
        .filter(|(_, open)| path.starts_with(&open.workdir))
        .max_by_key(|(_, open)| open.workdir.components().count())
        .map(|(idx, _)| idx)
}

impl std::fmt::Debug for GitIgnoreOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitIgnoreOracle")
            .field("open_repositories", &self.open_repositories())
            .finish()
    }
}

#[async_trait]
impl ScmIgnoreOracle for GitIgnoreOracle {
    async fn is_ignored(&self, path: &Path) -> bool {
        let repositories = Arc::clone(&self.repositories);
        let path = path.to_path_buf();

        match tokio::task::spawn_blocking(move || Self::check(&repositories, &path)).await {
            Ok(ignored) => ignored,
            Err(e) => {
                warn!("Git ignore check did not complete: {e}");
                false
            }
        }
    }
}
