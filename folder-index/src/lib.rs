//! # Folder Index
//!
//! Builds the list of folders a user can jump to inside one or more open
//! project roots. Folders are found by a depth-first scan that prunes hidden,
//! symlinked, source-control-ignored and user-excluded subtrees; results are
//! cached per root with a configurable lifetime and invalidated by filesystem
//! changes, root removal and settings changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Folder Index Service                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ChangeEvent ──► DirectoryCache ◄── get_directories(roots)      │
//! │                        │ miss                                   │
//! │                        ▼                                        │
//! │               DirectoryScanner ──► HostFs                       │
//! │                 │          │                                    │
//! │                 ▼          ▼                                    │
//! │      ScmIgnoreOracle   ExclusionMatcher                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The host supplies the filesystem, the ignore oracle, the settings and the
//! UI; everything is injected through traits so the core runs without one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jumpto_folder_index::{FolderIndexService, ProjectRoot};
//!
//! let service = FolderIndexService::builder()
//!     .roots(vec![ProjectRoot::from_path("/work/app")?])
//!     .build();
//!
//! let folders = service.get_active_directories().await;
//! ```

pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod exclude;
pub mod fs;
pub mod host;
pub mod navigator;
pub mod root;
pub mod scanner;
pub mod scm;
pub mod service;

pub use cache::{CacheSnapshot, DirectoryCache, MemoryCache, is_valid};
pub use command::{CommandOutcome, FindFolderCommand, Presenter};
pub use config::{ConfigChange, ConfigProvider, ExclusionRules, FolderIndexSettings, JsonSettings};
pub use error::{FolderIndexError, Result};
pub use exclude::{ExclusionMatcher, is_excluded};
pub use fs::{DirEntry, HostFs, LocalFs};
pub use host::HostEnvironment;
pub use navigator::{ROOT_SEPARATOR, Selection, resolve};
pub use root::ProjectRoot;
pub use scanner::{DirectoryScanner, ScanOptions};
pub use scm::{GitIgnoreOracle, NoScm, ScmIgnoreOracle};
pub use service::{FolderIndexService, FolderIndexServiceBuilder};

// Re-export from dependencies for convenience
pub use jumpto_directory_watcher::{ChangeEvent, ChangeKind, DirectoryWatcher};
