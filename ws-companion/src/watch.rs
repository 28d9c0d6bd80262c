use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use ws_core::{Result, WsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Recursive filesystem watch over one directory.
///
/// Dropping the watcher releases the underlying OS watch handle. The
/// notification backend may coalesce rapid bursts, so consumers get "the
/// path changed", not an exact operation log.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl DirectoryWatcher {
    pub fn new(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let kind = match event.kind {
                        EventKind::Create(_) => Some(ChangeKind::Created),
                        EventKind::Modify(_) => Some(ChangeKind::Modified),
                        EventKind::Remove(_) => Some(ChangeKind::Deleted),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        for path in event.paths {
                            // Send fails only when the consumer is gone.
                            let _ = tx.send(ChangeEvent { path, kind });
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "filesystem watch error"),
            }
        })
        .map_err(|e| WsError::Other(anyhow::Error::new(e)))?;
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| WsError::Other(anyhow::Error::new(e)))?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Next change event; `None` once the watch backend has shut down.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    async fn next_event_for(watcher: &mut DirectoryWatcher, name: &str) -> ChangeEvent {
        loop {
            let event = timeout(Duration::from_secs(10), watcher.next())
                .await
                .expect("no filesystem event arrived")
                .expect("watch channel closed");
            if event.path.file_name().and_then(|n| n.to_str()) == Some(name) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn reports_created_files() {
        let dir = TempDir::new().unwrap();
        let mut watcher = DirectoryWatcher::new(dir.path()).unwrap();

        std::fs::write(dir.path().join("new.txt"), b"x").unwrap();
        let event = next_event_for(&mut watcher, "new.txt").await;
        assert!(matches!(
            event.kind,
            ChangeKind::Created | ChangeKind::Modified
        ));
    }

    #[tokio::test]
    async fn reports_deletions_in_subdirectories() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let target = sub.join("gone.txt");
        std::fs::write(&target, b"x").unwrap();

        let mut watcher = DirectoryWatcher::new(dir.path()).unwrap();
        std::fs::remove_file(&target).unwrap();

        let event = next_event_for(&mut watcher, "gone.txt").await;
        assert_eq!(event.kind, ChangeKind::Deleted);
    }
}
