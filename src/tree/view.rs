//! Read-only views over arena entries.
//!
//! A view borrows the arena, so holding one across a tree mutation is ruled
//! out by the borrow checker — the compile-time form of the "do not retain
//! entries past the call" contract that listeners and visitors must obey.

use super::entry::{EntryArena, EntryId};
use super::sorter::SortPolicy;
use std::path::Path;
use std::time::SystemTime;

/// Read-only view of a directory entry.
#[derive(Clone, Copy)]
pub struct DirectoryRef<'a> {
    arena: &'a EntryArena,
    id: EntryId,
}

/// Read-only view of a file entry.
#[derive(Clone, Copy)]
pub struct FileRef<'a> {
    arena: &'a EntryArena,
    id: EntryId,
}

/// Either kind of entry, as produced by the mixed accessors.
#[derive(Clone, Copy)]
pub enum EntryRef<'a> {
    Directory(DirectoryRef<'a>),
    File(FileRef<'a>),
}

impl<'a> DirectoryRef<'a> {
    pub(crate) fn new(arena: &'a EntryArena, id: EntryId) -> Self {
        Self { arena, id }
    }

    pub fn name(&self) -> &'a str {
        self.arena.name(self.id)
    }

    /// Path relative to the watched root's parent.
    pub fn path(&self) -> &'a Path {
        self.arena.path(self.id)
    }

    pub fn last_write_time(&self) -> SystemTime {
        self.arena.last_write_time(self.id)
    }

    pub fn modified(&self) -> bool {
        self.arena.modified(self.id)
    }

    pub fn sort_policy(&self) -> SortPolicy {
        self.arena.sort_policy(self.id)
    }

    pub fn parent(&self) -> Option<DirectoryRef<'a>> {
        let arena = self.arena;
        arena.parent(self.id).map(|id| DirectoryRef { arena, id })
    }

    pub fn is_empty(&self) -> bool {
        self.arena.dirs_of(self.id).is_empty() && self.arena.files_of(self.id).is_empty()
    }

    /// Immediate child directories, in sort order.
    pub fn directories(&self) -> impl Iterator<Item = DirectoryRef<'a>> + 'a {
        let arena = self.arena;
        arena
            .dirs_of(self.id)
            .iter()
            .map(move |&id| DirectoryRef { arena, id })
    }

    /// Immediate child files, in sort order.
    pub fn files(&self) -> impl Iterator<Item = FileRef<'a>> + 'a {
        let arena = self.arena;
        arena
            .files_of(self.id)
            .iter()
            .map(move |&id| FileRef { arena, id })
    }

    pub fn directory(&self, name: &str) -> Option<DirectoryRef<'a>> {
        let arena = self.arena;
        arena
            .child_dir_by_name(self.id, name)
            .map(|id| DirectoryRef { arena, id })
    }

    pub fn file(&self, name: &str) -> Option<FileRef<'a>> {
        let arena = self.arena;
        arena
            .child_file_by_name(self.id, name)
            .map(|id| FileRef { arena, id })
    }

    pub fn has_directory(&self, name: &str) -> bool {
        self.directory(name).is_some()
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.file(name).is_some()
    }

    /// Immediate children, files first, then directories.
    pub fn entries(&self) -> Vec<EntryRef<'a>> {
        let mut out: Vec<EntryRef<'a>> = self.files().map(EntryRef::File).collect();
        out.extend(self.directories().map(EntryRef::Directory));
        out
    }

    /// Whole subtree in pre-order: a directory's files, then each child
    /// directory followed by its own recursive contents.
    pub fn entries_recursive(&self) -> Vec<EntryRef<'a>> {
        let arena = self.arena;
        arena
            .entries_recursive(self.id)
            .into_iter()
            .map(|id| {
                if arena.is_directory(id) {
                    EntryRef::Directory(DirectoryRef { arena, id })
                } else {
                    EntryRef::File(FileRef { arena, id })
                }
            })
            .collect()
    }

    pub fn files_recursive(&self) -> Vec<FileRef<'a>> {
        let arena = self.arena;
        arena
            .files_recursive(self.id)
            .into_iter()
            .map(|id| FileRef { arena, id })
            .collect()
    }

    pub fn directories_recursive(&self) -> Vec<DirectoryRef<'a>> {
        let arena = self.arena;
        arena
            .dirs_recursive(self.id)
            .into_iter()
            .map(|id| DirectoryRef { arena, id })
            .collect()
    }
}

impl<'a> FileRef<'a> {
    pub(crate) fn new(arena: &'a EntryArena, id: EntryId) -> Self {
        Self { arena, id }
    }

    /// Full file name, extension included.
    pub fn name(&self) -> &'a str {
        self.arena.name(self.id)
    }

    /// File name without the extension.
    pub fn stem(&self) -> &'a str {
        let name = self.name();
        Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
    }

    /// Extension without the leading dot, if any.
    pub fn extension(&self) -> Option<&'a str> {
        Path::new(self.name()).extension().and_then(|s| s.to_str())
    }

    /// Path relative to the watched root's parent.
    pub fn path(&self) -> &'a Path {
        self.arena.path(self.id)
    }

    pub fn last_write_time(&self) -> SystemTime {
        self.arena.last_write_time(self.id)
    }

    pub fn modified(&self) -> bool {
        self.arena.modified(self.id)
    }

    pub fn parent(&self) -> Option<DirectoryRef<'a>> {
        let arena = self.arena;
        arena.parent(self.id).map(|id| DirectoryRef::new(arena, id))
    }
}

impl<'a> EntryRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            EntryRef::Directory(dir) => dir.name(),
            EntryRef::File(file) => file.name(),
        }
    }

    pub fn path(&self) -> &'a Path {
        match self {
            EntryRef::Directory(dir) => dir.path(),
            EntryRef::File(file) => file.path(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, EntryRef::Directory(_))
    }
}
