//! Live watcher checks against a real backend.
//!
//! Backend latency and event granularity vary by platform, so these tests
//! poll with a generous deadline and assert on queue contents rather than
//! exact event shapes.

use fsmirror::watch::{drain_events, FileEvent, FileSystemWatcher};
use fsmirror::tree::DirectoryTree;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const DEADLINE: Duration = Duration::from_secs(5);

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[test]
fn created_file_reaches_the_queue() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("watched");
    std::fs::create_dir(&root).unwrap();

    let mut watcher = FileSystemWatcher::new();
    watcher.start_watching(&root).unwrap();
    assert!(watcher.is_watching());

    // Give the backend a moment to establish the watch before mutating.
    std::thread::sleep(Duration::from_millis(200));
    std::fs::write(root.join("hello.txt"), "hi").unwrap();

    let queue = watcher.queue().clone();
    assert!(
        wait_until(|| queue.has_events()),
        "no event arrived within the deadline"
    );

    let mut saw_hello = false;
    while let Some(event) = queue.pop() {
        let touched = match &event {
            FileEvent::Added { path }
            | FileEvent::Removed { path }
            | FileEvent::Modified { path } => path.clone(),
            FileEvent::Moved { new_path, .. } | FileEvent::Renamed { new_path, .. } => {
                new_path.clone()
            }
        };
        if touched.ends_with("hello.txt") {
            saw_hello = true;
        }
    }
    assert!(saw_hello, "no event mentioned the created file");

    watcher.stop_watching();
    assert!(!watcher.is_watching());
}

#[test]
fn watcher_feeds_the_tree_through_drain() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("synced");
    std::fs::create_dir(&root).unwrap();

    let mut tree = DirectoryTree::new();
    tree.build_root(&root).unwrap();

    let mut watcher = FileSystemWatcher::new();
    watcher.start_watching(&root).unwrap();
    std::thread::sleep(Duration::from_millis(200));

    std::fs::write(root.join("note.txt"), "n").unwrap();

    let queue = watcher.queue().clone();
    let synced = wait_until(|| {
        drain_events(&queue, &mut tree);
        tree.root().map(|r| r.has_file("note.txt")).unwrap_or(false)
    });
    assert!(synced, "tree never picked up the created file");

    watcher.stop_watching();
}

#[test]
fn stop_leaves_queued_events_drainable() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("stopped");
    std::fs::create_dir(&root).unwrap();

    let mut watcher = FileSystemWatcher::new();
    watcher.start_watching(&root).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    std::fs::write(root.join("late.txt"), "l").unwrap();

    let queue = watcher.queue().clone();
    assert!(wait_until(|| queue.has_events()));
    watcher.stop_watching();

    // Stopping must not discard what was already observed.
    assert!(queue.has_events());
    while queue.pop().is_some() {}
    assert!(queue.is_empty());
}

#[test]
fn restart_retargets_the_watch() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    std::fs::create_dir(&first).unwrap();
    std::fs::create_dir(&second).unwrap();

    let mut watcher = FileSystemWatcher::new();
    watcher.start_watching(&first).unwrap();
    watcher.start_watching(&second).unwrap();
    assert!(watcher.is_watching());
    std::thread::sleep(Duration::from_millis(200));

    std::fs::write(second.join("here.txt"), "h").unwrap();
    let queue = watcher.queue().clone();
    assert!(
        wait_until(|| queue.has_events()),
        "retargeted watcher saw no events"
    );

    watcher.stop_watching();
}
