//! Arena-backed entry storage.
//!
//! Every directory and file in the mirror lives in an [`EntryArena`]; an
//! [`EntryId`] is a stable slot index. Parent links are plain ids rather
//! than ownership edges, so there are no reference cycles and "does my
//! parent still exist" is a lookup. Entries are created and destroyed only
//! by [`super::DirectoryTree`]; nothing may hold an id across a removal.

use super::sorter::{self, SortPolicy};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Stable index of an entry in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// Kind tag of an entry, with directory-only state attached to the
/// directory variant.
#[derive(Debug)]
pub enum EntryKind {
    Directory {
        /// Child directories, sorted per `sort_policy`, unique by name.
        dirs: Vec<EntryId>,
        /// Child files, sorted per `sort_policy`, unique by name.
        files: Vec<EntryId>,
        sort_policy: SortPolicy,
    },
    File,
}

/// A single mirrored filesystem entry.
#[derive(Debug)]
pub struct Entry {
    /// Final path component.
    name: String,
    /// Cached path relative to the watched root's parent. Always equals the
    /// join of all ancestor names; recomputed transitively whenever an
    /// ancestor moves or is renamed.
    path: PathBuf,
    /// Last observed modification timestamp.
    last_write_time: SystemTime,
    /// True only in the tick where a strictly newer timestamp was observed.
    modified: bool,
    parent: Option<EntryId>,
    kind: EntryKind,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Slot-vector arena holding every entry of one tree.
#[derive(Debug, Default)]
pub struct EntryArena {
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
}

impl EntryArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, entry: Entry) -> EntryId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                EntryId(slot)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId(self.slots.len() - 1)
            }
        }
    }

    pub fn insert_file(&mut self, path: &Path, last_write_time: SystemTime) -> EntryId {
        self.insert(Entry {
            name: name_of(path),
            path: path.to_path_buf(),
            last_write_time,
            modified: false,
            parent: None,
            kind: EntryKind::File,
        })
    }

    pub fn insert_directory(
        &mut self,
        path: &Path,
        last_write_time: SystemTime,
        sort_policy: SortPolicy,
    ) -> EntryId {
        self.insert(Entry {
            name: name_of(path),
            path: path.to_path_buf(),
            last_write_time,
            modified: false,
            parent: None,
            kind: EntryKind::Directory {
                dirs: Vec::new(),
                files: Vec::new(),
                sort_policy,
            },
        })
    }

    /// Free an entry's slot. The id must not be used afterwards.
    pub fn remove(&mut self, id: EntryId) {
        if self.slots[id.0].take().is_some() {
            self.free.push(id.0);
        }
    }

    /// Free a directory's entire subtree, the directory itself included.
    pub fn remove_subtree(&mut self, id: EntryId) {
        for descendant in self.entries_recursive(id) {
            self.remove(descendant);
        }
        self.remove(id);
    }

    fn entry(&self, id: EntryId) -> &Entry {
        self.slots[id.0].as_ref().expect("stale entry id")
    }

    fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        self.slots[id.0].as_mut().expect("stale entry id")
    }

    // Per-entry accessors.

    pub fn name(&self, id: EntryId) -> &str {
        &self.entry(id).name
    }

    pub fn path(&self, id: EntryId) -> &Path {
        &self.entry(id).path
    }

    pub fn last_write_time(&self, id: EntryId) -> SystemTime {
        self.entry(id).last_write_time
    }

    pub fn modified(&self, id: EntryId) -> bool {
        self.entry(id).modified
    }

    pub fn parent(&self, id: EntryId) -> Option<EntryId> {
        self.entry(id).parent
    }

    pub fn is_directory(&self, id: EntryId) -> bool {
        self.entry(id).is_directory()
    }

    /// Compare a freshly observed timestamp against the cached one. A
    /// strictly newer timestamp updates the cache and raises the transient
    /// modified flag; anything else clears it. Returns the flag.
    pub fn observe_last_write(&mut self, id: EntryId, time: SystemTime) -> bool {
        let entry = self.entry_mut(id);
        if time > entry.last_write_time {
            entry.last_write_time = time;
            entry.modified = true;
        } else {
            entry.modified = false;
        }
        entry.modified
    }

    pub fn clear_modified(&mut self, id: EntryId) {
        self.entry_mut(id).modified = false;
    }

    /// Change the final path component and recompute the cached paths of the
    /// entry and, transitively, its whole subtree.
    pub fn set_name(&mut self, id: EntryId, name: String) {
        self.entry_mut(id).name = name;
        self.refresh_paths(id);
    }

    /// Recompute `path` from the parent chain for `id` and every descendant.
    pub fn refresh_paths(&mut self, id: EntryId) {
        let new_path = match self.entry(id).parent {
            Some(parent) => self.entry(parent).path.join(&self.entry(id).name),
            None => PathBuf::from(&self.entry(id).name),
        };
        self.entry_mut(id).path = new_path;

        let children: Vec<EntryId> = match &self.entry(id).kind {
            EntryKind::Directory { dirs, files, .. } => {
                files.iter().chain(dirs.iter()).copied().collect()
            }
            EntryKind::File => return,
        };
        for child in children {
            self.refresh_paths(child);
        }
    }

    // Child sequences.

    pub fn dirs_of(&self, dir: EntryId) -> &[EntryId] {
        match &self.entry(dir).kind {
            EntryKind::Directory { dirs, .. } => dirs,
            EntryKind::File => &[],
        }
    }

    pub fn files_of(&self, dir: EntryId) -> &[EntryId] {
        match &self.entry(dir).kind {
            EntryKind::Directory { files, .. } => files,
            EntryKind::File => &[],
        }
    }

    pub fn child_dir_by_name(&self, dir: EntryId, name: &str) -> Option<EntryId> {
        self.dirs_of(dir)
            .iter()
            .copied()
            .find(|&id| self.name(id) == name)
    }

    pub fn child_file_by_name(&self, dir: EntryId, name: &str) -> Option<EntryId> {
        self.files_of(dir)
            .iter()
            .copied()
            .find(|&id| self.name(id) == name)
    }

    pub fn sort_policy(&self, dir: EntryId) -> SortPolicy {
        match &self.entry(dir).kind {
            EntryKind::Directory { sort_policy, .. } => *sort_policy,
            EntryKind::File => SortPolicy::default(),
        }
    }

    /// Swap a directory's sort policy and immediately re-sort both child
    /// sequences in full.
    pub fn set_sort_policy(&mut self, dir: EntryId, policy: SortPolicy) {
        let (mut dirs, mut files) = match &mut self.entry_mut(dir).kind {
            EntryKind::Directory {
                dirs,
                files,
                sort_policy,
            } => {
                *sort_policy = policy;
                (std::mem::take(dirs), std::mem::take(files))
            }
            EntryKind::File => return,
        };
        sorter::sort_children(self, policy, &mut dirs);
        sorter::sort_children(self, policy, &mut files);
        if let EntryKind::Directory {
            dirs: d, files: f, ..
        } = &mut self.entry_mut(dir).kind
        {
            *d = dirs;
            *f = files;
        }
    }

    // Structural edits. These keep parent links, cached paths, and sort
    // order consistent; index maintenance and notification stay with
    // `DirectoryTree`.

    /// Attach `child` as a subdirectory of `parent` at its sorted position.
    pub fn attach_directory(&mut self, parent: EntryId, child: EntryId) {
        self.entry_mut(child).parent = Some(parent);
        self.refresh_paths(child);
        let policy = self.sort_policy(parent);
        let at = sorter::insertion_index(self, policy, self.dirs_of(parent), child);
        match &mut self.entry_mut(parent).kind {
            EntryKind::Directory { dirs, .. } => dirs.insert(at, child),
            EntryKind::File => debug_assert!(false, "attach target is not a directory"),
        }
    }

    /// Attach `child` as a file of `parent` at its sorted position.
    pub fn attach_file(&mut self, parent: EntryId, child: EntryId) {
        self.entry_mut(child).parent = Some(parent);
        self.refresh_paths(child);
        let policy = self.sort_policy(parent);
        let at = sorter::insertion_index(self, policy, self.files_of(parent), child);
        match &mut self.entry_mut(parent).kind {
            EntryKind::Directory { files, .. } => files.insert(at, child),
            EntryKind::File => debug_assert!(false, "attach target is not a directory"),
        }
    }

    /// Detach a subdirectory from its parent; no-op when not a child. The
    /// detached entry's cached paths collapse to be relative to itself.
    pub fn detach_directory(&mut self, parent: EntryId, child: EntryId) {
        if let EntryKind::Directory { dirs, .. } = &mut self.entry_mut(parent).kind {
            if let Some(at) = dirs.iter().position(|&id| id == child) {
                dirs.remove(at);
            }
        }
        self.entry_mut(child).parent = None;
        self.refresh_paths(child);
    }

    /// Detach a file from its parent; no-op when not a child.
    pub fn detach_file(&mut self, parent: EntryId, child: EntryId) {
        if let EntryKind::Directory { files, .. } = &mut self.entry_mut(parent).kind {
            if let Some(at) = files.iter().position(|&id| id == child) {
                files.remove(at);
            }
        }
        self.entry_mut(child).parent = None;
        self.refresh_paths(child);
    }

    // Recursive walks. Order within a directory: its files first, then each
    // child directory followed by that directory's own recursive contents.

    /// All entries below `dir`, `dir` itself excluded.
    pub fn entries_recursive(&self, dir: EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        self.collect_entries(dir, &mut out);
        out
    }

    fn collect_entries(&self, dir: EntryId, out: &mut Vec<EntryId>) {
        out.extend_from_slice(self.files_of(dir));
        for &child in self.dirs_of(dir) {
            out.push(child);
            self.collect_entries(child, out);
        }
    }

    /// All files below `dir`, including files of nested directories.
    pub fn files_recursive(&self, dir: EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        self.collect_files(dir, &mut out);
        out
    }

    fn collect_files(&self, dir: EntryId, out: &mut Vec<EntryId>) {
        out.extend_from_slice(self.files_of(dir));
        for &child in self.dirs_of(dir) {
            self.collect_files(child, out);
        }
    }

    /// All directories below `dir`, `dir` itself excluded.
    pub fn dirs_recursive(&self, dir: EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        self.collect_dirs(dir, &mut out);
        out
    }

    fn collect_dirs(&self, dir: EntryId, out: &mut Vec<EntryId>) {
        for &child in self.dirs_of(dir) {
            out.push(child);
            self.collect_dirs(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn dir(arena: &mut EntryArena, path: &str) -> EntryId {
        arena.insert_directory(
            Path::new(path),
            SystemTime::UNIX_EPOCH,
            SortPolicy::AlphabeticalAsc,
        )
    }

    fn file(arena: &mut EntryArena, path: &str) -> EntryId {
        arena.insert_file(Path::new(path), SystemTime::UNIX_EPOCH)
    }

    fn paths(arena: &EntryArena, ids: &[EntryId]) -> Vec<String> {
        ids.iter()
            .map(|&id| arena.path(id).to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn attach_inserts_sorted_and_rewrites_paths() {
        let mut arena = EntryArena::new();
        let root = dir(&mut arena, "root");
        let b = file(&mut arena, "b.txt");
        let a = file(&mut arena, "a.txt");

        arena.attach_file(root, b);
        arena.attach_file(root, a);

        assert_eq!(paths(&arena, arena.files_of(root)), ["root/a.txt", "root/b.txt"]);
        assert_eq!(arena.parent(a), Some(root));
    }

    #[test]
    fn detach_clears_parent_and_collapses_path() {
        let mut arena = EntryArena::new();
        let root = dir(&mut arena, "root");
        let sub = dir(&mut arena, "sub");
        let f = file(&mut arena, "f.txt");
        arena.attach_directory(root, sub);
        arena.attach_file(sub, f);
        assert_eq!(arena.path(f), Path::new("root/sub/f.txt"));

        arena.detach_directory(root, sub);
        assert_eq!(arena.parent(sub), None);
        assert_eq!(arena.path(sub), Path::new("sub"));
        assert_eq!(arena.path(f), Path::new("sub/f.txt"));
        assert!(arena.dirs_of(root).is_empty());
    }

    #[test]
    fn rename_cascades_to_descendants() {
        let mut arena = EntryArena::new();
        let root = dir(&mut arena, "root");
        let sub = dir(&mut arena, "sub");
        let f = file(&mut arena, "f.txt");
        arena.attach_directory(root, sub);
        arena.attach_file(sub, f);

        arena.set_name(sub, "renamed".to_string());
        assert_eq!(arena.path(sub), Path::new("root/renamed"));
        assert_eq!(arena.path(f), Path::new("root/renamed/f.txt"));
    }

    #[test]
    fn recursive_walk_lists_files_before_each_directory_subtree() {
        let mut arena = EntryArena::new();
        let root = dir(&mut arena, "root");
        let f1 = file(&mut arena, "top.txt");
        let sub = dir(&mut arena, "sub");
        let f2 = file(&mut arena, "nested.txt");
        arena.attach_file(root, f1);
        arena.attach_directory(root, sub);
        arena.attach_file(sub, f2);

        assert_eq!(
            paths(&arena, &arena.entries_recursive(root)),
            ["root/top.txt", "root/sub", "root/sub/nested.txt"]
        );
        assert_eq!(
            paths(&arena, &arena.files_recursive(root)),
            ["root/top.txt", "root/sub/nested.txt"]
        );
        assert_eq!(paths(&arena, &arena.dirs_recursive(root)), ["root/sub"]);
    }

    #[test]
    fn set_sort_policy_resorts_existing_children() {
        let mut arena = EntryArena::new();
        let root = dir(&mut arena, "root");
        for name in ["a.txt", "b.txt", "c.txt"] {
            let f = file(&mut arena, name);
            arena.attach_file(root, f);
        }
        assert_eq!(
            paths(&arena, arena.files_of(root)),
            ["root/a.txt", "root/b.txt", "root/c.txt"]
        );

        arena.set_sort_policy(root, SortPolicy::AlphabeticalDesc);
        assert_eq!(
            paths(&arena, arena.files_of(root)),
            ["root/c.txt", "root/b.txt", "root/a.txt"]
        );
        assert_eq!(arena.sort_policy(root), SortPolicy::AlphabeticalDesc);
    }

    #[test]
    fn remove_subtree_frees_and_reuses_slots() {
        let mut arena = EntryArena::new();
        let root = dir(&mut arena, "root");
        let sub = dir(&mut arena, "sub");
        let f = file(&mut arena, "f.txt");
        arena.attach_directory(root, sub);
        arena.attach_file(sub, f);
        assert_eq!(arena.len(), 3);

        arena.detach_directory(root, sub);
        arena.remove_subtree(sub);
        assert_eq!(arena.len(), 1);

        // Freed slots are recycled for new entries.
        let again = file(&mut arena, "again.txt");
        arena.attach_file(root, again);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn observe_last_write_raises_flag_only_on_strictly_newer() {
        let mut arena = EntryArena::new();
        let f = file(&mut arena, "f.txt");
        let later = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(10);

        assert!(arena.observe_last_write(f, later));
        assert!(arena.modified(f));

        // Same timestamp again: flag clears, no change.
        assert!(!arena.observe_last_write(f, later));
        assert!(!arena.modified(f));
        assert_eq!(arena.last_write_time(f), later);
    }
}
