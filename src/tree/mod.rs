//! The in-memory directory tree and its mutation protocol.
//!
//! [`DirectoryTree`] owns every entry (in an [`EntryArena`]), a flat
//! path→directory index for O(1) lookup, and the registered listeners.
//! Every mutation keeps three coupled representations consistent: tree
//! edges, cached path strings (cascading to all descendants), and the path
//! index. The tree is not internally synchronized and must be driven from a
//! single thread; the hand-off from the watcher thread lives in
//! [`crate::watch`].

pub mod entry;
pub mod sorter;
pub mod view;

pub use entry::{EntryArena, EntryId, EntryKind};
pub use sorter::SortPolicy;
pub use view::{DirectoryRef, EntryRef, FileRef};

use crate::error::TreeError;
use crate::watch::FileEvent;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Token returned by [`DirectoryTree::add_listener`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observer of tree mutations.
///
/// Listeners are notified synchronously, in registration order, within the
/// mutation call. Removed entries are observed with their pre-removal state
/// intact; path-changed notifications carry the pre-change path. All methods
/// default to no-ops so implementors override only what they need. The views
/// borrow the tree, so entries cannot be retained past the callback.
pub trait TreeEventListener {
    fn on_file_added(&mut self, _file: &FileRef<'_>) {}
    fn on_directory_added(&mut self, _dir: &DirectoryRef<'_>) {}

    fn on_file_removed(&mut self, _file: &FileRef<'_>) {}
    fn on_directory_removed(&mut self, _dir: &DirectoryRef<'_>) {}

    fn on_file_path_changed(&mut self, _file: &FileRef<'_>, _old_path: &Path) {}
    fn on_directory_path_changed(&mut self, _dir: &DirectoryRef<'_>, _old_path: &Path) {}

    fn on_file_modified(&mut self, _file: &FileRef<'_>) {}
    fn on_directory_modified(&mut self, _dir: &DirectoryRef<'_>) {}
}

/// Read-only visitor over the whole tree.
pub trait TreeVisitor {
    fn visit_tree(&mut self, root: DirectoryRef<'_>);
}

/// Live mirror of one watched directory subtree.
///
/// All paths taken and returned are relative to the watched root's parent,
/// so the root directory's own path is its name. Mutations assume events
/// are applied in an order where parents precede children (the watcher
/// queue preserves observation order, see [`crate::watch`]).
pub struct DirectoryTree {
    arena: EntryArena,
    root: Option<EntryId>,
    /// Every directory currently in the tree, keyed by relative path. Files
    /// are reached only through their parent directory.
    path_index: HashMap<PathBuf, EntryId>,
    /// Absolute path of the watched root's parent, for disk status checks.
    watched_parent: PathBuf,
    listeners: Vec<(ListenerId, Box<dyn TreeEventListener>)>,
    next_listener_id: u64,
    default_sort_policy: SortPolicy,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self {
            arena: EntryArena::new(),
            root: None,
            path_index: HashMap::new(),
            watched_parent: PathBuf::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            default_sort_policy: SortPolicy::default(),
        }
    }

    /// Sort policy assigned to directories created by future scans and adds.
    pub fn set_default_sort_policy(&mut self, policy: SortPolicy) {
        self.default_sort_policy = policy;
    }

    // Listener registration.

    pub fn add_listener(&mut self, listener: Box<dyn TreeEventListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false when the token is unknown.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // Build.

    /// One-time synchronous recursive scan of `root_abs_path`.
    ///
    /// Added-events fire bottom-up: a directory's children are attached and
    /// announced before the directory's own added-event, so listeners only
    /// ever observe directories whose immediate children already exist. The
    /// root directory itself gets no added-event.
    pub fn build_root(&mut self, root_abs_path: &Path) -> Result<(), TreeError> {
        let meta = fs::metadata(root_abs_path)
            .map_err(|_| TreeError::RootNotFound(root_abs_path.to_path_buf()))?;
        if !meta.is_dir() {
            return Err(TreeError::RootNotADirectory(root_abs_path.to_path_buf()));
        }

        self.watched_parent = root_abs_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let root_rel = root_abs_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();

        let root_id = self.scan_directory(&root_rel);
        self.root = Some(root_id);
        info!(
            root = %root_abs_path.display(),
            directories = self.path_index.len(),
            entries = self.arena.len(),
            "Built root tree"
        );
        Ok(())
    }

    /// Recursively mirror the on-disk directory at `rel_path`: create and
    /// index the directory entry, then attach (and announce) every child.
    /// Unreadable children are logged and skipped; the next event for them
    /// will reconcile state.
    fn scan_directory(&mut self, rel_path: &Path) -> EntryId {
        let dir_id = self.create_directory_entry(rel_path);
        self.path_index.insert(rel_path.to_path_buf(), dir_id);

        let abs = self.watched_parent.join(rel_path);
        let read = match fs::read_dir(&abs) {
            Ok(read) => read,
            Err(err) => {
                warn!(path = %abs.display(), %err, "Failed to read directory during scan");
                return dir_id;
            }
        };

        for dent in read {
            let dent = match dent {
                Ok(dent) => dent,
                Err(err) => {
                    warn!(path = %abs.display(), %err, "Failed to read directory entry");
                    continue;
                }
            };
            let child_rel = rel_path.join(dent.file_name());
            let file_type = match dent.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(path = %child_rel.display(), %err, "Failed to stat directory entry");
                    continue;
                }
            };

            if file_type.is_file() {
                let file_id = self.create_file_entry(&child_rel);
                self.arena.attach_file(dir_id, file_id);
                self.notify_file_added(file_id);
            } else if file_type.is_dir() {
                let child_id = self.scan_directory(&child_rel);
                self.arena.attach_directory(dir_id, child_id);
                self.notify_directory_added(child_id);
            }
        }

        dir_id
    }

    // Add.

    /// Add a single file. The parent directory must already be in the tree;
    /// a duplicate add of an existing name is ignored.
    pub fn add_file(&mut self, path: &Path) {
        let Some(parent_id) = self.require_parent(path, "add a file") else {
            return;
        };
        let Some(name) = file_name_string(path) else {
            return;
        };
        if self.arena.child_file_by_name(parent_id, &name).is_some() {
            debug!(path = %path.display(), "Ignoring add for file already in the tree");
            return;
        }

        let file_id = self.create_file_entry(path);
        self.arena.attach_file(parent_id, file_id);
        debug!(path = %path.display(), "File added");
        self.notify_file_added(file_id);
    }

    /// Add a directory, ingesting any contents it already has on disk. The
    /// parent directory must already be in the tree.
    pub fn add_directory(&mut self, path: &Path) {
        let Some(parent_id) = self.require_parent(path, "add a directory") else {
            return;
        };
        let Some(name) = file_name_string(path) else {
            return;
        };
        if self.arena.child_dir_by_name(parent_id, &name).is_some() {
            debug!(path = %path.display(), "Ignoring add for directory already in the tree");
            return;
        }

        let dir_id = self.scan_directory(path);
        self.arena.attach_directory(parent_id, dir_id);
        debug!(path = %path.display(), "Directory added");
        self.notify_directory_added(dir_id);
    }

    // Remove.

    /// Remove a file; a no-op when the file (or its parent) is already gone.
    pub fn remove_file(&mut self, path: &Path) {
        let parent_rel = parent_path(path);
        let Some(&parent_id) = self.path_index.get(parent_rel) else {
            debug!(path = %path.display(), "Ignoring remove for file below unknown directory");
            return;
        };
        let Some(name) = file_name_string(path) else {
            return;
        };
        let Some(file_id) = self.arena.child_file_by_name(parent_id, &name) else {
            debug!(path = %path.display(), "Ignoring remove for unknown file");
            return;
        };

        // Notify before delete: listeners observe the pre-removal state.
        self.notify_file_removed(file_id);
        self.arena.detach_file(parent_id, file_id);
        self.arena.remove(file_id);
        debug!(path = %path.display(), "File removed");
    }

    /// Remove a directory and its whole subtree; a no-op when already gone.
    ///
    /// Every descendant is collected up front, announced with its
    /// pre-removal state, and un-indexed; the removed directory itself is
    /// announced last, after its contents. Only then is the subtree
    /// detached and freed.
    pub fn remove_directory(&mut self, path: &Path) {
        let Some(&dir_id) = self.path_index.get(path) else {
            debug!(path = %path.display(), "Ignoring remove for unknown directory");
            return;
        };

        for id in self.arena.entries_recursive(dir_id) {
            if self.arena.is_directory(id) {
                self.path_index.remove(self.arena.path(id));
                self.notify_directory_removed(id);
            } else {
                self.notify_file_removed(id);
            }
        }
        self.path_index.remove(path);
        self.notify_directory_removed(dir_id);

        if let Some(parent_id) = self.arena.parent(dir_id) {
            self.arena.detach_directory(parent_id, dir_id);
        }
        if self.root == Some(dir_id) {
            self.root = None;
        }
        self.arena.remove_subtree(dir_id);
        debug!(path = %path.display(), "Directory removed");
    }

    // Move / rename. A rename is the same-parent special case; both share
    // the relocation protocol, so a combined move-and-rename event is also
    // handled correctly.

    pub fn move_file(&mut self, old_path: &Path, new_path: &Path) {
        self.relocate_file(old_path, new_path, "move a file");
    }

    pub fn rename_file(&mut self, old_path: &Path, new_path: &Path) {
        self.relocate_file(old_path, new_path, "rename a file");
    }

    pub fn move_directory(&mut self, old_path: &Path, new_path: &Path) {
        self.relocate_directory(old_path, new_path, "move a directory");
    }

    pub fn rename_directory(&mut self, old_path: &Path, new_path: &Path) {
        self.relocate_directory(old_path, new_path, "rename a directory");
    }

    fn relocate_file(&mut self, old_path: &Path, new_path: &Path, action: &str) {
        let Some(old_parent) = self.require_parent(old_path, action) else {
            return;
        };
        let Some(new_parent) = self.require_parent(new_path, action) else {
            return;
        };
        let Some(old_name) = file_name_string(old_path) else {
            return;
        };
        let found = self.arena.child_file_by_name(old_parent, &old_name);
        debug_assert!(
            found.is_some(),
            "cannot {action}: {} is not in the tree",
            old_path.display()
        );
        let Some(file_id) = found else {
            error!(path = %old_path.display(), "Cannot {}: file is not in the tree", action);
            return;
        };

        self.arena.detach_file(old_parent, file_id);
        if let Some(new_name) = file_name_string(new_path) {
            self.arena.set_name(file_id, new_name);
        }
        self.arena.attach_file(new_parent, file_id);
        debug!(from = %old_path.display(), to = %new_path.display(), "File relocated");
        self.notify_file_path_changed(file_id, old_path);
    }

    fn relocate_directory(&mut self, old_path: &Path, new_path: &Path, action: &str) {
        let Some(old_parent) = self.require_parent(old_path, action) else {
            return;
        };
        let Some(new_parent) = self.require_parent(new_path, action) else {
            return;
        };
        let Some(old_name) = file_name_string(old_path) else {
            return;
        };
        let found = self.arena.child_dir_by_name(old_parent, &old_name);
        debug_assert!(
            found.is_some(),
            "cannot {action}: {} is not in the tree",
            old_path.display()
        );
        let Some(dir_id) = found else {
            error!(path = %old_path.display(), "Cannot {}: directory is not in the tree", action);
            return;
        };

        // Snapshot every affected entry with its pre-change path before
        // touching the structure; re-keying from a live walk would read the
        // index mid-rewrite.
        let snapshot = self.snapshot_subtree_paths(dir_id);

        self.arena.detach_directory(old_parent, dir_id);
        if let Some(new_name) = file_name_string(new_path) {
            self.arena.set_name(dir_id, new_name);
        }
        self.arena.attach_directory(new_parent, dir_id);

        debug!(
            from = %old_path.display(),
            to = %new_path.display(),
            entries = snapshot.len(),
            "Directory relocated"
        );
        self.apply_path_changes(&snapshot);
    }

    fn snapshot_subtree_paths(&self, dir_id: EntryId) -> Vec<(EntryId, PathBuf)> {
        let mut pairs = vec![(dir_id, self.arena.path(dir_id).to_path_buf())];
        for id in self.arena.entries_recursive(dir_id) {
            pairs.push((id, self.arena.path(id).to_path_buf()));
        }
        pairs
    }

    /// Re-key every affected directory in the path index and fire one
    /// path-changed event per entry, old path attached.
    fn apply_path_changes(&mut self, snapshot: &[(EntryId, PathBuf)]) {
        for (id, old_path) in snapshot {
            if self.arena.is_directory(*id) {
                self.path_index.remove(old_path.as_path());
                self.path_index
                    .insert(self.arena.path(*id).to_path_buf(), *id);
                self.notify_directory_path_changed(*id, old_path);
            } else {
                self.notify_file_path_changed(*id, old_path);
            }
        }
    }

    // Modification.

    /// Re-read the on-disk timestamp for a file or directory. A strictly
    /// newer timestamp updates the cache and fires a modified-event;
    /// anything else clears the transient flag and fires nothing. A no-op
    /// for entries no longer in the tree.
    pub fn process_modified(&mut self, path: &Path) {
        if let Some(&dir_id) = self.path_index.get(path) {
            if self.refresh_status(dir_id) {
                self.notify_directory_modified(dir_id);
            }
            return;
        }

        let Some(&parent_id) = self.path_index.get(parent_path(path)) else {
            debug!(path = %path.display(), "Ignoring modify for entry below unknown directory");
            return;
        };
        let Some(name) = file_name_string(path) else {
            return;
        };
        let Some(file_id) = self.arena.child_file_by_name(parent_id, &name) else {
            debug!(path = %path.display(), "Ignoring modify for unknown file");
            return;
        };
        if self.refresh_status(file_id) {
            self.notify_file_modified(file_id);
        }
    }

    fn refresh_status(&mut self, id: EntryId) -> bool {
        let abs = self.watched_parent.join(self.arena.path(id));
        match fs::metadata(&abs).and_then(|meta| meta.modified()) {
            Ok(time) => self.arena.observe_last_write(id, time),
            Err(err) => {
                // The entry may have vanished between the event and the
                // check; the next event will reconcile state.
                warn!(path = %abs.display(), %err, "Failed to read timestamp, treating as not modified");
                self.arena.clear_modified(id);
                false
            }
        }
    }

    // Queries.

    /// O(1) lookup of a directory by relative path; never mutates.
    pub fn directory(&self, path: &Path) -> Option<DirectoryRef<'_>> {
        self.path_index
            .get(path)
            .map(|&id| DirectoryRef::new(&self.arena, id))
    }

    pub fn root(&self) -> Option<DirectoryRef<'_>> {
        self.root.map(|id| DirectoryRef::new(&self.arena, id))
    }

    /// Number of directories currently indexed, root included.
    pub fn directory_count(&self) -> usize {
        self.path_index.len()
    }

    /// Hand the root to a read-only visitor. The borrow ends with the call,
    /// so the visitor cannot retain entries.
    pub fn process_tree(&self, visitor: &mut dyn TreeVisitor) {
        if let Some(root) = self.root() {
            visitor.visit_tree(root);
        }
    }

    /// Swap the sort policy of one directory, immediately re-sorting both
    /// of its child sequences. Returns false for an unknown path.
    pub fn set_sort_policy(&mut self, path: &Path, policy: SortPolicy) -> bool {
        match self.path_index.get(path) {
            Some(&id) => {
                self.arena.set_sort_policy(id, policy);
                true
            }
            None => false,
        }
    }

    // Event application (the consumer side of the watcher queue).

    /// Apply one classified change event, routing it to the matching
    /// mutation. Paths may be absolute (they are relativized against the
    /// watched root's parent) or already relative.
    pub fn apply_event(&mut self, event: &FileEvent) {
        match event {
            FileEvent::Added { path } => {
                let Some(rel) = self.relativize(path) else {
                    return;
                };
                if self.watched_parent.join(&rel).is_dir() {
                    self.add_directory(&rel);
                } else {
                    self.add_file(&rel);
                }
            }
            FileEvent::Removed { path } => {
                let Some(rel) = self.relativize(path) else {
                    return;
                };
                if self.path_index.contains_key(&rel) {
                    self.remove_directory(&rel);
                } else {
                    self.remove_file(&rel);
                }
            }
            FileEvent::Modified { path } => {
                let Some(rel) = self.relativize(path) else {
                    return;
                };
                self.process_modified(&rel);
            }
            FileEvent::Moved { old_path, new_path } => {
                let (Some(old_rel), Some(new_rel)) =
                    (self.relativize(old_path), self.relativize(new_path))
                else {
                    return;
                };
                if self.path_index.contains_key(&old_rel) {
                    self.move_directory(&old_rel, &new_rel);
                } else {
                    self.move_file(&old_rel, &new_rel);
                }
            }
            FileEvent::Renamed { old_path, new_path } => {
                let (Some(old_rel), Some(new_rel)) =
                    (self.relativize(old_path), self.relativize(new_path))
                else {
                    return;
                };
                if self.path_index.contains_key(&old_rel) {
                    self.rename_directory(&old_rel, &new_rel);
                } else {
                    self.rename_file(&old_rel, &new_rel);
                }
            }
        }
    }

    fn relativize(&self, path: &Path) -> Option<PathBuf> {
        if path.is_relative() {
            return Some(path.to_path_buf());
        }
        match path.strip_prefix(&self.watched_parent) {
            Ok(rel) => Some(rel.to_path_buf()),
            Err(_) => {
                warn!(path = %path.display(), "Ignoring event outside the watched subtree");
                None
            }
        }
    }

    // Entry construction. Timestamps are read best-effort; an unreadable
    // entry starts at the epoch and the first modify event catches it up.

    fn create_file_entry(&mut self, rel_path: &Path) -> EntryId {
        let last_write = self.read_last_write_time(rel_path);
        self.arena.insert_file(rel_path, last_write)
    }

    fn create_directory_entry(&mut self, rel_path: &Path) -> EntryId {
        let last_write = self.read_last_write_time(rel_path);
        self.arena
            .insert_directory(rel_path, last_write, self.default_sort_policy)
    }

    fn read_last_write_time(&self, rel_path: &Path) -> SystemTime {
        let abs = self.watched_parent.join(rel_path);
        match fs::metadata(&abs).and_then(|meta| meta.modified()) {
            Ok(time) => time,
            Err(err) => {
                debug!(path = %abs.display(), %err, "Could not read last write time");
                SystemTime::UNIX_EPOCH
            }
        }
    }

    /// Look up the parent directory an entry is (or will be) attached to.
    /// A missing parent on add/move/rename means events were applied out of
    /// order: debug-fatal, error-logged no-op in release.
    fn require_parent(&self, path: &Path, action: &str) -> Option<EntryId> {
        let parent_rel = parent_path(path);
        let found = self.path_index.get(parent_rel).copied();
        debug_assert!(
            found.is_some(),
            "cannot {action}: parent directory {} is not in the tree",
            parent_rel.display()
        );
        if found.is_none() {
            error!(
                path = %path.display(),
                "Cannot {}: parent directory is not in the tree",
                action
            );
        }
        found
    }

    // Notification fan-out.

    fn notify_file_added(&mut self, id: EntryId) {
        let file = FileRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_file_added(&file);
        }
    }

    fn notify_directory_added(&mut self, id: EntryId) {
        let dir = DirectoryRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_directory_added(&dir);
        }
    }

    fn notify_file_removed(&mut self, id: EntryId) {
        let file = FileRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_file_removed(&file);
        }
    }

    fn notify_directory_removed(&mut self, id: EntryId) {
        let dir = DirectoryRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_directory_removed(&dir);
        }
    }

    fn notify_file_path_changed(&mut self, id: EntryId, old_path: &Path) {
        let file = FileRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_file_path_changed(&file, old_path);
        }
    }

    fn notify_directory_path_changed(&mut self, id: EntryId, old_path: &Path) {
        let dir = DirectoryRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_directory_path_changed(&dir, old_path);
        }
    }

    fn notify_file_modified(&mut self, id: EntryId) {
        let file = FileRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_file_modified(&file);
        }
    }

    fn notify_directory_modified(&mut self, id: EntryId) {
        let dir = DirectoryRef::new(&self.arena, id);
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_directory_modified(&dir);
        }
    }
}

fn parent_path(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

fn file_name_string(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
