//! TOML configuration for a mirror instance.

use crate::error::ConfigError;
use crate::tree::SortPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loaded from a TOML file.
///
/// Only the watched root is required; everything else has defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Absolute path of the directory to mirror and watch.
    pub root: PathBuf,

    /// Sort policy applied to every directory in the tree.
    #[serde(default)]
    pub sort_policy: SortPolicy,

    #[serde(default)]
    pub log: LogConfig,
}

/// Logging section, see [`crate::logging::init`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive: a plain level or a full `tracing` filter string.
    #[serde(default = "default_level")]
    pub level: String,

    /// Log file path; stderr when absent.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

impl MirrorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: MirrorConfig = toml::from_str(
            r#"
            root = "/srv/assets"
            sort_policy = "last-write-time-desc"

            [log]
            level = "debug"
            file = "/var/log/fsmirror.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/assets"));
        assert_eq!(config.sort_policy, SortPolicy::LastWriteTimeDesc);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.file, Some(PathBuf::from("/var/log/fsmirror.log")));
    }

    #[test]
    fn defaults_apply_when_sections_are_omitted() {
        let config: MirrorConfig = toml::from_str(r#"root = "/srv/assets""#).unwrap();

        assert_eq!(config.sort_policy, SortPolicy::AlphabeticalAsc);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.file, None);
    }

    #[test]
    fn load_reports_missing_file_and_bad_toml() {
        let temp = tempfile::tempdir().unwrap();

        let missing = temp.path().join("nope.toml");
        assert!(matches!(
            MirrorConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = temp.path().join("bad.toml");
        std::fs::write(&bad, "root = [not toml").unwrap();
        assert!(matches!(
            MirrorConfig::load(&bad),
            Err(ConfigError::Parse { .. })
        ));
    }
}
