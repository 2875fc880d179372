//! Project roots.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FolderIndexError, Result};

/// A top-level directory the host treats as one unit of workspace.
///
/// `id` is the stable cache key (a `file://` URI for local roots), `name` is
/// what users see, and `path` is where the filesystem is read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRoot {
    id: String,
    name: String,
    path: PathBuf,
}

impl ProjectRoot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
        }
    }

    /// Describe a local directory. The path must be absolute.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let url = Url::from_directory_path(&path)
            .map_err(|()| FolderIndexError::InvalidRoot(path.display().to_string()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(url.to_string(), name, path))
    }

    /// Describe a root the host identifies by a `file://` URI.
    pub fn from_uri(uri: &str, name: impl Into<String>) -> Result<Self> {
        let url = Url::parse(uri)?;
        let path = url
            .to_file_path()
            .map_err(|()| FolderIndexError::InvalidRoot(uri.to_string()))?;

        Ok(Self::new(uri, name, path))
    }

    /// Replace the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` is this root or lies below it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }

    /// Absolute location of a slash-separated relative folder path.
    pub fn join(&self, relative_path: &str) -> PathBuf {
        relative_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.path.clone(), |path, segment| path.join(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_path_derives_id_and_name() {
        let root = ProjectRoot::from_path("/work/app").unwrap();

        assert_eq!(root.id(), "file:///work/app/");
        assert_eq!(root.name(), "app");
        assert_eq!(root.path(), Path::new("/work/app"));
    }

    #[test]
    fn test_from_path_rejects_relative_paths() {
        assert!(matches!(
            ProjectRoot::from_path("relative/dir"),
            Err(FolderIndexError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_from_uri() {
        let root = ProjectRoot::from_uri("file:///work/lib", "lib").unwrap();

        assert_eq!(root.path(), Path::new("/work/lib"));
        assert_eq!(root.id(), "file:///work/lib");
        assert!(ProjectRoot::from_uri("not a uri", "x").is_err());
    }

    #[test]
    fn test_contains_and_join() {
        let root = ProjectRoot::new("file:///work/app/", "app", "/work/app");

        assert!(root.contains(Path::new("/work/app/src/main")));
        assert!(!root.contains(Path::new("/work/application")));
        assert_eq!(root.join("src/main"), PathBuf::from("/work/app/src/main"));
        assert_eq!(root.join(""), PathBuf::from("/work/app"));
    }
}
