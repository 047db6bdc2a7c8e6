//! fsmirror: Live In-Memory Directory Mirror
//!
//! Maintains a queryable, sorted, incrementally-updated view of a filesystem
//! subtree without rescanning disk on every change. An OS watcher classifies
//! raw filesystem changes into [`watch::FileEvent`]s and pushes them onto the
//! [`watch::EventQueue`]; a single consumer thread drains the queue and
//! applies each event to the [`tree::DirectoryTree`], which keeps its tree
//! edges, cached path strings, and flat path index consistent while fanning
//! change notifications out to registered listeners.

pub mod config;
pub mod error;
pub mod logging;
pub mod tree;
pub mod watch;
