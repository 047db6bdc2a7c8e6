//! Tracing setup.
//!
//! The filter comes from the `FSMIRROR_LOG` environment variable when set,
//! otherwise from the configured level. Output goes to a log file when one
//! is configured and to stderr otherwise.

use crate::config::LogConfig;
use crate::error::ConfigError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize the global tracing subscriber from `config`.
///
/// Fails if the filter directive is invalid, the log file cannot be opened,
/// or a subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<(), ConfigError> {
    let filter = build_env_filter(config)?;
    let base = Registry::default().with(filter);

    match &config.file {
        Some(log_file) => {
            if let Some(parent) = log_file.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::Logging(format!("failed to create log directory: {e}"))
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .map_err(|e| {
                    ConfigError::Logging(format!(
                        "failed to open log file {}: {e}",
                        log_file.display()
                    ))
                })?;
            base.with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(file),
            )
            .try_init()
        }
        None => base
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| ConfigError::Logging(e.to_string()))
}

fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env("FSMIRROR_LOG") {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::Logging(format!("invalid log level {:?}: {e}", config.level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_levels_and_directives() {
        let config = LogConfig {
            level: "debug".to_string(),
            file: None,
        };
        assert!(build_env_filter(&config).is_ok());

        let config = LogConfig {
            level: "info,fsmirror::watch=trace".to_string(),
            file: None,
        };
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn rejects_malformed_directives() {
        let config = LogConfig {
            level: "not==a==level".to_string(),
            file: None,
        };
        assert!(matches!(
            build_env_filter(&config),
            Err(ConfigError::Logging(_))
        ));
    }
}
