//! Thread-safe FIFO hand-off between the watcher backend and the tree.

use super::FileEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Mutex-guarded FIFO of change events.
///
/// The watcher backend pushes from its own thread; the thread that owns the
/// [`crate::tree::DirectoryTree`] pops and applies. Preserving observation
/// order across the hand-off is what lets the tree assume parents arrive
/// before their children.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<FileEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: FileEvent) {
        self.events.lock().push_back(event);
    }

    /// Pop the oldest event, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<FileEvent> {
        self.events.lock().pop_front()
    }

    pub fn has_events(&self) -> bool {
        !self.events.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
