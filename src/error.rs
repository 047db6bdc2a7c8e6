//! Error types, one enum per area of the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from building the directory tree.
///
/// Incremental mutations do not produce errors: caller mistakes are
/// debug-fatal preconditions and ordinary event races are tolerated as
/// no-ops (see [`crate::tree::DirectoryTree`]).
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("watched root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("watched root is not a directory: {0}")]
    RootNotADirectory(PathBuf),
}

/// Errors from the filesystem watcher backend.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialize watcher backend: {0}")]
    Init(#[source] notify::Error),

    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Errors from loading configuration or initializing logging.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("logging setup failed: {0}")]
    Logging(String),
}
