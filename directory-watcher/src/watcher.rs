//! Directory watcher implementation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{Result, WatcherError};
use crate::event::ChangeEvent;

/// Default capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Watches project roots recursively and forwards creations and deletions.
///
/// Events are delivered on a bounded channel; the receiving half is handed
/// out once through [`DirectoryWatcher::take_events`]. Stopping (or dropping)
/// the watcher disposes the underlying notify watcher, after which no further
/// events are produced.
pub struct DirectoryWatcher {
    /// Watched roots.
    roots: BTreeSet<PathBuf>,

    /// Internal notify watcher, present while running.
    watcher: Option<RecommendedWatcher>,

    /// Event sender.
    event_tx: mpsc::Sender<ChangeEvent>,

    /// Event receiver, until a consumer takes it.
    event_rx: Option<mpsc::Receiver<ChangeEvent>>,
}

impl DirectoryWatcher {
    /// Create a new directory watcher.
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_CAPACITY)
    }

    /// Create a watcher whose event channel holds at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));

        Self {
            roots: BTreeSet::new(),
            watcher: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Add a root to watch. Takes effect immediately when running.
    pub fn add(&mut self, root: impl Into<PathBuf>) -> Result<()> {
        let root = root.into();

        let metadata = std::fs::metadata(&root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                WatcherError::DirectoryNotFound(root.display().to_string())
            }
            _ => WatcherError::Io(e),
        })?;
        if !metadata.is_dir() {
            return Err(WatcherError::NotADirectory(root.display().to_string()));
        }

        if self.roots.contains(&root) {
            return Err(WatcherError::AlreadyWatching(root.display().to_string()));
        }

        if let Some(ref mut w) = self.watcher {
            w.watch(&root, RecursiveMode::Recursive)?;
            debug!("Started watching: {}", root.display());
        }

        info!("Adding root to watch: {}", root.display());
        self.roots.insert(root);
        Ok(())
    }

    /// Remove a root from watching.
    pub fn remove(&mut self, root: &Path) -> Result<()> {
        if !self.roots.remove(root) {
            return Err(WatcherError::NotWatching(root.display().to_string()));
        }

        if let Some(ref mut w) = self.watcher {
            if let Err(e) = w.unwatch(root) {
                warn!("Failed to unwatch {}: {e}", root.display());
            }
        }

        info!("Removed root from watch: {}", root.display());
        Ok(())
    }

    /// Start watching all registered roots.
    pub fn start(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let event_tx = self.event_tx.clone();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in ChangeEvent::from_notify(event) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            debug!("Dropping change event, no consumer: {e}");
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {e}");
                }
            },
        )?;

        for root in &self.roots {
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => debug!("Started watching: {}", root.display()),
                Err(e) => warn!("Failed to watch {}: {e}", root.display()),
            }
        }

        self.watcher = Some(watcher);
        info!("Directory watcher started for {} roots", self.roots.len());
        Ok(())
    }

    /// Stop watching. No further events are produced until restarted.
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            for root in &self.roots {
                let _ = watcher.unwatch(root);
            }
            info!("Directory watcher stopped");
        }
    }

    /// Check if the watcher is running.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Watched roots, in path order.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.iter().cloned().collect()
    }

    /// Take the event receiver. Returns `None` once it has been taken.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ChangeEvent>> {
        self.event_rx.take()
    }

    /// A sender feeding the same channel, for hosts with their own event source.
    pub fn sender(&self) -> mpsc::Sender<ChangeEvent> {
        self.event_tx.clone()
    }
}

impl Default for DirectoryWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
