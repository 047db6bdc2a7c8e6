//! Filesystem watcher backed by the platform notification API.

use super::{EventQueue, FileEvent};
use crate::error::WatchError;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{recommended_watcher, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Recursive watcher over one directory subtree.
///
/// Raw backend events are classified into [`FileEvent`]s on the backend's
/// thread and pushed onto the shared [`EventQueue`]; the owning thread
/// drains them at its own pace. Watching starts explicitly and a second
/// start retargets the watcher.
pub struct FileSystemWatcher {
    queue: Arc<EventQueue>,
    backend: Option<RecommendedWatcher>,
    watched: Option<PathBuf>,
}

impl Default for FileSystemWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemWatcher {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(EventQueue::new()),
            backend: None,
            watched: None,
        }
    }

    /// The queue this watcher feeds. Clone the `Arc` to drain from the
    /// tree-owning thread.
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn is_watching(&self) -> bool {
        self.backend.is_some()
    }

    /// Begin watching `path` recursively. If a watch is already running it
    /// is stopped first; queued events from the old target stay queued.
    pub fn start_watching(&mut self, path: &Path) -> Result<(), WatchError> {
        if self.backend.is_some() {
            self.stop_watching();
        }

        let queue = Arc::clone(&self.queue);
        let mut backend = recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
            match result {
                Ok(event) => {
                    for classified in classify(event) {
                        queue.push(classified);
                    }
                }
                Err(err) => warn!(%err, "Watcher backend reported an error"),
            }
        })
        .map_err(WatchError::Init)?;

        backend
            .watch(path, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), "Started watching");
        self.backend = Some(backend);
        self.watched = Some(path.to_path_buf());
        Ok(())
    }

    /// Stop watching. Already-queued events remain drainable.
    pub fn stop_watching(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            return;
        };
        if let Some(path) = self.watched.take() {
            if let Err(err) = backend.unwatch(&path) {
                warn!(path = %path.display(), %err, "Failed to unwatch path on stop");
            }
            info!(path = %path.display(), "Stopped watching");
        }
    }
}

/// Classify one raw backend event into zero or more [`FileEvent`]s.
///
/// Access events carry no state change and are dropped. A rename reported
/// with both endpoints stays one event; rename halves reported separately
/// become a remove and an add, which the tree reconciles the same way.
fn classify(event: notify::Event) -> Vec<FileEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Added { path })
            .collect(),

        EventKind::Remove(_) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Removed { path })
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(old_path), Some(new_path)) => vec![rename_or_move(old_path, new_path)],
                _ => {
                    debug!("Dropping rename event without both endpoints");
                    Vec::new()
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Removed { path })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Added { path })
            .collect(),

        EventKind::Modify(_) => event
            .paths
            .into_iter()
            .map(|path| FileEvent::Modified { path })
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// A rename within one parent keeps the name-change flavor; crossing
/// parents is a move.
fn rename_or_move(old_path: PathBuf, new_path: PathBuf) -> FileEvent {
    if old_path.parent() == new_path.parent() {
        FileEvent::Renamed { old_path, new_path }
    } else {
        FileEvent::Moved { old_path, new_path }
    }
}
