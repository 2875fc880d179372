//! The "find folder" command: list, pick, reveal.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::navigator::resolve;
use crate::root::ProjectRoot;
use crate::service::FolderIndexService;

pub const PICKER_TITLE: &str = "Find Folder";
pub const NO_ROOTS_MESSAGE: &str = "No workspace folder is open";
pub const NO_FOLDERS_MESSAGE: &str = "No directories found";

/// UI capabilities the host lends to the command.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn show_error(&self, message: &str);

    async fn show_info(&self, message: &str);

    /// Let the user pick one item. `None` when the pick was dismissed.
    async fn pick(&self, title: &str, items: Vec<String>) -> Option<String>;

    /// Focus `relative_path` of `root` in the host's own UI.
    async fn reveal(&self, root: &ProjectRoot, relative_path: &str) -> Result<()>;
}

/// How a run of the command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// No project root was open.
    NoRoots,

    /// Roots were open but contained no folders.
    NoFolders,

    /// The user dismissed the picker.
    Cancelled,

    /// A folder was revealed.
    Revealed {
        root_id: String,
        relative_path: String,
    },
}

/// Lists folders of the active roots, lets the user pick one and reveals it.
pub struct FindFolderCommand {
    service: Arc<FolderIndexService>,
    presenter: Arc<dyn Presenter>,
}

impl FindFolderCommand {
    pub fn new(service: Arc<FolderIndexService>, presenter: Arc<dyn Presenter>) -> Self {
        Self { service, presenter }
    }

    pub async fn run(&self) -> Result<CommandOutcome> {
        let roots = self.service.roots().await;
        if roots.is_empty() {
            self.presenter.show_error(NO_ROOTS_MESSAGE).await;
            return Ok(CommandOutcome::NoRoots);
        }

        let folders = self.service.get_directories(&roots).await;
        if folders.is_empty() {
            // Nothing found is more likely stale state than an empty tree.
            self.service.clear_cache().await;
            self.presenter.show_info(NO_FOLDERS_MESSAGE).await;
            return Ok(CommandOutcome::NoFolders);
        }

        debug!("Offering {} folders", folders.len());
        let Some(selected) = self.presenter.pick(PICKER_TITLE, folders).await else {
            return Ok(CommandOutcome::Cancelled);
        };

        let Some(selection) = resolve(&selected, &roots) else {
            return Ok(CommandOutcome::Cancelled);
        };

        self.presenter
            .reveal(selection.root, &selection.relative_path)
            .await?;
        info!(
            "Revealed {} in {}",
            selection.relative_path,
            selection.root.name()
        );

        Ok(CommandOutcome::Revealed {
            root_id: selection.root.id().to_string(),
            relative_path: selection.relative_path,
        })
    }
}
