//! Filesystem change observation.
//!
//! The [`FileSystemWatcher`] turns raw platform notifications into
//! [`FileEvent`]s on its backend thread and queues them; the thread that
//! owns the tree calls [`drain_events`] to apply everything queued so far.
//! The queue is the only shared state between the two sides.

mod queue;
mod watcher;

pub use queue::EventQueue;
pub use watcher::FileSystemWatcher;

use crate::tree::DirectoryTree;
use std::path::PathBuf;
use tracing::debug;

/// One observed filesystem change, classified.
///
/// Paths are absolute as reported by the backend; the tree relativizes
/// them against the watched root's parent when applying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Added { path: PathBuf },
    Removed { path: PathBuf },
    Modified { path: PathBuf },
    /// Relocation to a different parent directory.
    Moved {
        old_path: PathBuf,
        new_path: PathBuf,
    },
    /// Name change within the same parent directory.
    Renamed {
        old_path: PathBuf,
        new_path: PathBuf,
    },
}

/// Apply every queued event to the tree, in observation order. Returns the
/// number of events applied.
pub fn drain_events(queue: &EventQueue, tree: &mut DirectoryTree) -> usize {
    let mut applied = 0;
    while let Some(event) = queue.pop() {
        debug!(?event, "Applying queued event");
        tree.apply_event(&event);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn drain_applies_in_fifo_order_and_empties_the_queue() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        std::fs::create_dir(&root).unwrap();

        let mut tree = DirectoryTree::new();
        tree.build_root(&root).unwrap();

        std::fs::write(root.join("a.txt"), "a").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();

        let queue = EventQueue::new();
        queue.push(FileEvent::Added {
            path: root.join("a.txt"),
        });
        queue.push(FileEvent::Added {
            path: root.join("sub"),
        });
        queue.push(FileEvent::Renamed {
            old_path: root.join("a.txt"),
            new_path: root.join("b.txt"),
        });

        assert_eq!(drain_events(&queue, &mut tree), 3);
        assert!(queue.is_empty());

        let mirror = tree.root().unwrap();
        assert!(mirror.has_file("b.txt"));
        assert!(!mirror.has_file("a.txt"));
        assert!(mirror.has_directory("sub"));
        assert!(tree.directory(Path::new("root/sub")).is_some());
    }
}
