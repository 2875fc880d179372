//! Print the folders of one or more project roots.
//!
//! Usage: cargo run -p jumpto-folder-index --example list_folders -- [--watch] <dir>...
//!
//! With `--watch` the listing is kept up to date until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use jumpto_folder_index::{
    DirectoryWatcher, FolderIndexService, FolderIndexSettings, GitIgnoreOracle, ProjectRoot,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut watch = false;
    let mut roots = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--watch" {
            watch = true;
            continue;
        }
        let path = std::fs::canonicalize(&arg).with_context(|| format!("no such folder: {arg}"))?;
        roots.push(ProjectRoot::from_path(path)?);
    }
    if roots.is_empty() {
        bail!("usage: list_folders [--watch] <dir>...");
    }

    let settings = FolderIndexSettings::default()
        .exclude("**/node_modules", true)
        .exclude("**/target", true);
    let service = Arc::new(
        FolderIndexService::builder()
            .scm(Arc::new(GitIgnoreOracle::new()))
            .config(Arc::new(settings))
            .roots(roots.clone())
            .build(),
    );

    let folders = service.get_active_directories().await;
    for folder in &folders {
        println!("{folder}");
    }
    println!("\n{} folders", folders.len());

    if !watch {
        return Ok(());
    }

    let mut watcher = DirectoryWatcher::new();
    for root in &roots {
        watcher.add(root.path())?;
    }
    let events = watcher
        .take_events()
        .context("watcher events already taken")?;
    let listener = service.spawn_invalidation_listener(events);
    watcher.start()?;

    let mut last = folders.len();
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let count = service.get_active_directories().await.len();
                if count != last {
                    println!("{count} folders");
                    last = count;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(watcher);
    listener.await?;
    Ok(())
}
