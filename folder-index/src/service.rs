//! Folder index service: cache-first folder listings for project roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use jumpto_directory_watcher::ChangeEvent;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheSnapshot, DirectoryCache, MemoryCache};
use crate::config::{
    CACHE_TTL_KEY, ConfigChange, ConfigProvider, FILES_EXCLUDE_KEY, FolderIndexSettings,
    SEARCH_EXCLUDE_KEY,
};
use crate::exclude::ExclusionMatcher;
use crate::fs::{HostFs, LocalFs};
use crate::host::HostEnvironment;
use crate::navigator::{prefixed_entry, root_entry};
use crate::root::ProjectRoot;
use crate::scanner::{DirectoryScanner, ScanOptions};
use crate::scm::{NoScm, ScmIgnoreOracle};

/// Orchestrates scanning and caching for the active project roots.
///
/// All collaborators are injected; the service owns no global state. Scans of
/// the same root are not serialized: overlapping requests may scan twice and
/// the cache keeps whichever result lands last.
pub struct FolderIndexService {
    /// Snapshots by root id.
    cache: Arc<dyn DirectoryCache>,

    /// Directory listings.
    fs: Arc<dyn HostFs>,

    /// Source-control ignore checks.
    scm: Arc<dyn ScmIgnoreOracle>,

    /// Host settings, read on every request.
    config: Arc<dyn ConfigProvider>,

    /// Editor family, for log output.
    environment: HostEnvironment,

    /// Roots currently open in the host.
    roots: RwLock<Vec<ActiveRoot>>,
}

/// An open root plus its symlink-free location, when that differs.
struct ActiveRoot {
    root: ProjectRoot,
    canonical: Option<PathBuf>,
}

impl ActiveRoot {
    fn new(root: ProjectRoot) -> Self {
        let canonical = dunce::canonicalize(root.path())
            .ok()
            .filter(|canonical| canonical.as_path() != root.path());
        Self { root, canonical }
    }

    /// Change events may carry either the path the host opened or the
    /// resolved one.
    fn contains(&self, path: &Path) -> bool {
        self.root.contains(path)
            || self
                .canonical
                .as_deref()
                .is_some_and(|canonical| path.starts_with(canonical))
    }
}

impl FolderIndexService {
    /// Create a new service builder.
    pub fn builder() -> FolderIndexServiceBuilder {
        FolderIndexServiceBuilder::new()
    }

    /// Current settings with defaults applied.
    pub fn settings(&self) -> FolderIndexSettings {
        FolderIndexSettings::resolve(self.config.as_ref())
    }

    pub fn environment(&self) -> HostEnvironment {
        self.environment
    }

    /// Replace the active roots, dropping snapshots of roots that went away.
    ///
    /// Returns the removed roots.
    pub async fn set_roots(&self, roots: Vec<ProjectRoot>) -> Vec<ProjectRoot> {
        let active = roots.iter().cloned().map(ActiveRoot::new).collect();
        let previous = std::mem::replace(&mut *self.roots.write().await, active);
        let removed: Vec<ProjectRoot> = previous
            .into_iter()
            .map(|old| old.root)
            .filter(|old| !roots.iter().any(|root| root.id() == old.id()))
            .collect();

        self.roots_changed(&removed).await;
        removed
    }

    /// Drop snapshots of roots the host no longer has open.
    pub async fn roots_changed(&self, removed: &[ProjectRoot]) {
        for root in removed {
            self.cache.delete(root.id()).await;
        }
        if !removed.is_empty() {
            info!("{} project roots removed", removed.len());
        }
    }

    pub async fn roots(&self) -> Vec<ProjectRoot> {
        self.roots
            .read()
            .await
            .iter()
            .map(|active| active.root.clone())
            .collect()
    }

    /// Display strings for every folder under `roots`, sorted.
    ///
    /// Roots are handled in order, each served from a valid snapshot or
    /// scanned and stored. With more than one root, entries carry the root
    /// name as a prefix and each root contributes an entry for itself.
    pub async fn get_directories(&self, roots: &[ProjectRoot]) -> Vec<String> {
        let settings = self.settings();
        let matcher = ExclusionMatcher::new(&settings.exclusion_rules());
        let multi_root = roots.len() > 1;

        let mut entries = Vec::new();
        for root in roots {
            let folders = self.folders_for_root(root, &settings, &matcher).await;
            if multi_root {
                entries.push(root_entry(root));
                entries.extend(folders.iter().map(|folder| prefixed_entry(root, folder)));
            } else {
                entries.extend(folders.iter().cloned());
            }
        }

        entries.sort();
        entries.dedup();
        entries
    }

    /// [`Self::get_directories`] over the active roots.
    pub async fn get_active_directories(&self) -> Vec<String> {
        let roots = self.roots().await;
        self.get_directories(&roots).await
    }

    async fn folders_for_root(
        &self,
        root: &ProjectRoot,
        settings: &FolderIndexSettings,
        matcher: &ExclusionMatcher,
    ) -> Vec<String> {
        if let Some(snapshot) = self.cache.get(root.id()).await {
            if snapshot.is_valid(Utc::now(), settings.cache_ttl_minutes) {
                if settings.verbose_logging {
                    debug!("Using cached directories for {}", root.name());
                }
                return snapshot.directories.clone();
            }
        }

        let scanner = DirectoryScanner::new(
            self.fs.as_ref(),
            self.scm.as_ref(),
            matcher,
            ScanOptions::from(settings),
        );
        let folders = scanner.scan(root).await;
        self.cache
            .set(root.id(), CacheSnapshot::new(folders.clone()))
            .await;
        folders
    }

    /// Drop the snapshot of one root.
    pub async fn invalidate(&self, root: &ProjectRoot) {
        self.cache.delete(root.id()).await;
    }

    /// Drop every snapshot.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Invalidate every active root containing the changed path.
    ///
    /// A root opened through a symlink also matches events reported under
    /// its resolved location. Returns how many roots were invalidated.
    pub async fn handle_change(&self, event: &ChangeEvent) -> usize {
        let roots = self.roots.read().await;
        let mut invalidated = 0;
        for active in roots.iter().filter(|active| active.contains(&event.path)) {
            self.cache.delete(active.root.id()).await;
            invalidated += 1;
        }
        if invalidated > 0 && self.settings().verbose_logging {
            debug!(
                "{:?} {} invalidated {invalidated} roots",
                event.kind,
                event.path.display()
            );
        }
        invalidated
    }

    /// React to a settings change. Returns whether the cache was cleared.
    ///
    /// The cache lifetime and both exclusion rule sets make stored snapshots
    /// stale when they change.
    pub async fn config_changed(&self, change: &ConfigChange) -> bool {
        let stale = [CACHE_TTL_KEY, FILES_EXCLUDE_KEY, SEARCH_EXCLUDE_KEY]
            .into_iter()
            .any(|key| change.affects(key));
        if stale {
            self.clear_cache().await;
            info!("Settings changed, directory cache cleared");
        }
        stale
    }

    /// Feed change events into [`Self::handle_change`] until the sender side
    /// is dropped (for example when the watcher is disposed).
    pub fn spawn_invalidation_listener(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<ChangeEvent>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                service.handle_change(&event).await;
            }
            debug!("Invalidation listener stopped");
        })
    }
}

/// Builder for [`FolderIndexService`].
///
/// Unset collaborators default to an in-memory cache, the local disk, no
/// source-control integration and default settings.
pub struct FolderIndexServiceBuilder {
    cache: Option<Arc<dyn DirectoryCache>>,
    fs: Option<Arc<dyn HostFs>>,
    scm: Option<Arc<dyn ScmIgnoreOracle>>,
    config: Option<Arc<dyn ConfigProvider>>,
    environment: HostEnvironment,
    roots: Vec<ProjectRoot>,
}

impl FolderIndexServiceBuilder {
    pub fn new() -> Self {
        Self {
            cache: None,
            fs: None,
            scm: None,
            config: None,
            environment: HostEnvironment::default(),
            roots: Vec::new(),
        }
    }

    pub fn cache(mut self, cache: Arc<dyn DirectoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fs(mut self, fs: Arc<dyn HostFs>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn scm(mut self, scm: Arc<dyn ScmIgnoreOracle>) -> Self {
        self.scm = Some(scm);
        self
    }

    pub fn config(mut self, config: Arc<dyn ConfigProvider>) -> Self {
        self.config = Some(config);
        self
    }

    /// Detect the editor family from the host application name.
    pub fn host_app_name(mut self, app_name: &str) -> Self {
        self.environment = HostEnvironment::detect(app_name);
        self
    }

    pub fn roots(mut self, roots: Vec<ProjectRoot>) -> Self {
        self.roots = roots;
        self
    }

    pub fn build(self) -> FolderIndexService {
        let service = FolderIndexService {
            cache: self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new())),
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFs)),
            scm: self.scm.unwrap_or_else(|| Arc::new(NoScm)),
            config: self
                .config
                .unwrap_or_else(|| Arc::new(FolderIndexSettings::default())),
            environment: self.environment,
            roots: RwLock::new(self.roots.into_iter().map(ActiveRoot::new).collect()),
        };

        let settings = service.settings();
        info!(
            "Folder index ready in {} (cache ttl {} min, verbose {})",
            service.environment, settings.cache_ttl_minutes, settings.verbose_logging
        );
        service
    }
}

impl Default for FolderIndexServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonSettings;
    use crate::scanner::tests::FakeFs;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn root(name: &str) -> ProjectRoot {
        ProjectRoot::new(format!("file:///w/{name}/"), name, format!("/w/{name}"))
    }

    struct Harness {
        service: Arc<FolderIndexService>,
        fs: Arc<FakeFs>,
        cache: Arc<MemoryCache>,
        settings: Arc<JsonSettings>,
    }

    fn harness(fs: FakeFs, roots: Vec<ProjectRoot>) -> Harness {
        let fs = Arc::new(fs);
        let cache = Arc::new(MemoryCache::new());
        let settings = Arc::new(
            JsonSettings::new(json!({
                "folderIndex.cacheTtlMinutes": 60,
                "files.exclude": { "**/node_modules": true }
            }))
            .unwrap(),
        );
        let service = FolderIndexService::builder()
            .fs(fs.clone())
            .cache(cache.clone())
            .config(settings.clone())
            .roots(roots)
            .build();
        Harness {
            service: Arc::new(service),
            fs,
            cache,
            settings,
        }
    }

    #[tokio::test]
    async fn test_single_root_is_unprefixed_and_sorted() {
        let fs = FakeFs::with_dirs("/w/app", &["zeta", "alpha/beta", "node_modules/x"]);
        let h = harness(fs, vec![root("app")]);

        let entries = h.service.get_active_directories().await;

        assert_eq!(entries, vec!["alpha", "alpha/beta", "zeta"]);
    }

    #[tokio::test]
    async fn test_multi_root_entries_are_prefixed() {
        let fs = FakeFs::with_dirs("/w/app", &["x"]).with_tree("/w/lib", &["x"]);
        let h = harness(fs, vec![root("lib"), root("app")]);

        let entries = h.service.get_active_directories().await;

        assert_eq!(entries, vec!["app/", "app/x", "lib/", "lib/x"]);
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app")]);

        let first = h.service.get_active_directories().await;
        let reads = h.fs.read_count();
        let second = h.service.get_active_directories().await;

        assert_eq!(first, second);
        assert_eq!(h.fs.read_count(), reads);
        assert_eq!(h.cache.keys().await, vec!["file:///w/app/".to_string()]);
    }

    #[tokio::test]
    async fn test_expired_snapshot_triggers_rescan() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app")]);
        h.cache
            .set(
                "file:///w/app/",
                CacheSnapshot::at(vec!["stale".to_string()], Utc::now() - Duration::minutes(61)),
            )
            .await;

        let entries = h.service.get_active_directories().await;

        assert_eq!(entries, vec!["src"]);
    }

    #[tokio::test]
    async fn test_zero_ttl_rescans_every_time() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app")]);
        h.settings
            .replace(json!({ "folderIndex.cacheTtlMinutes": 0 }))
            .unwrap();

        h.service.get_active_directories().await;
        let reads = h.fs.read_count();
        h.service.get_active_directories().await;

        assert_eq!(h.fs.read_count(), reads * 2);
    }

    #[tokio::test]
    async fn test_change_event_invalidates_containing_root_only() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]).with_tree("/w/lib", &["x"]);
        let h = harness(fs, vec![root("app"), root("lib")]);
        h.service.get_active_directories().await;

        let invalidated = h
            .service
            .handle_change(&ChangeEvent::created("/w/app/src/new"))
            .await;

        assert_eq!(invalidated, 1);
        assert_eq!(h.cache.keys().await, vec!["file:///w/lib/".to_string()]);

        let outside = h
            .service
            .handle_change(&ChangeEvent::deleted("/w/application/x"))
            .await;
        assert_eq!(outside, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_change_under_resolved_root_path_invalidates_symlinked_root() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let real = dunce::canonicalize(temp_dir.path()).unwrap().join("real");
        std::fs::create_dir_all(real.join("src")).unwrap();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let cache = Arc::new(MemoryCache::new());
        let service = FolderIndexService::builder()
            .cache(cache.clone())
            .roots(vec![ProjectRoot::from_path(&link).unwrap()])
            .build();
        assert_eq!(service.get_active_directories().await, vec!["src"]);

        let invalidated = service
            .handle_change(&ChangeEvent::created(real.join("src/new")))
            .await;

        assert_eq!(invalidated, 1);
        assert!(cache.is_empty().await);
        assert_eq!(
            service
                .handle_change(&ChangeEvent::created(link.join("src/other")))
                .await,
            1
        );
    }

    #[tokio::test]
    async fn test_removed_root_loses_snapshot() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app"), root("lib")]);
        h.cache.set("file:///w/app/", CacheSnapshot::new(Vec::new())).await;
        h.cache.set("file:///w/lib/", CacheSnapshot::new(Vec::new())).await;

        let removed = h.service.set_roots(vec![root("lib")]).await;

        assert_eq!(removed, vec![root("app")]);
        assert_eq!(h.cache.keys().await, vec!["file:///w/lib/".to_string()]);
    }

    #[tokio::test]
    async fn test_roots_changed_keeps_other_snapshots() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app")]);
        h.cache.set("file:///w/app/", CacheSnapshot::new(Vec::new())).await;
        h.cache.set("file:///w/gone/", CacheSnapshot::new(Vec::new())).await;

        h.service.roots_changed(&[root("gone")]).await;

        assert_eq!(h.cache.keys().await, vec!["file:///w/app/".to_string()]);
        assert_eq!(h.service.roots().await, vec![root("app")]);
    }

    #[tokio::test]
    async fn test_ttl_change_clears_cache() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app")]);
        h.service.get_active_directories().await;

        let change = h
            .settings
            .replace(json!({
                "folderIndex.cacheTtlMinutes": 5,
                "files.exclude": { "**/node_modules": true }
            }))
            .unwrap();

        assert!(h.service.config_changed(&change).await);
        assert!(h.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_unrelated_setting_keeps_cache() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app")]);
        h.service.get_active_directories().await;

        let changed = h
            .service
            .config_changed(&ConfigChange::new(["folderIndex.verboseLogging"]))
            .await;

        assert!(!changed);
        assert_eq!(h.cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_listener_invalidates_until_sender_dropped() {
        let fs = FakeFs::with_dirs("/w/app", &["src"]);
        let h = harness(fs, vec![root("app")]);
        h.service.get_active_directories().await;

        let (tx, rx) = mpsc::channel(8);
        let listener = h.service.spawn_invalidation_listener(rx);
        tx.send(ChangeEvent::deleted("/w/app/src")).await.unwrap();
        drop(tx);
        listener.await.unwrap();

        assert!(h.cache.is_empty().await);
    }
}
