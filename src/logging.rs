//! tracing subscriber setup.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

const DEFAULT_FILTER: &str = "sitecache=info";

/// Build the filter: RUST_LOG wins, then the configured directive.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
  if let Ok(filter) = EnvFilter::try_from_default_env() {
    return Ok(filter);
  }

  let directive = config.filter.as_deref().unwrap_or(DEFAULT_FILTER);
  EnvFilter::try_new(directive).map_err(|e| eyre!("Invalid log filter '{}': {}", directive, e))
}

/// Install the global subscriber.
///
/// Logs go to stderr, or to `config.file` when set. Keep the returned guard
/// alive until exit so buffered file output is flushed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = env_filter(config)?;

  match &config.file {
    Some(path) => {
      let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Log file path has no file name: {}", path.display()))?;

      std::fs::create_dir_all(directory)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

      let appender = tracing_appender::rolling::never(directory, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::registry()
        .with(filter)
        .with(
          tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

      Ok(None)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_configured_filter_is_used() {
    if std::env::var("RUST_LOG").is_ok() {
      return;
    }
    let config = LogConfig {
      filter: Some("sitecache=debug".to_string()),
      file: None,
    };
    let filter = env_filter(&config).unwrap();
    assert_eq!(
      filter.max_level_hint(),
      Some(tracing_subscriber::filter::LevelFilter::DEBUG)
    );
  }

  #[test]
  fn test_invalid_filter_is_error() {
    if std::env::var("RUST_LOG").is_ok() {
      return;
    }
    let config = LogConfig {
      filter: Some("sitecache=loud".to_string()),
      file: None,
    };
    assert!(env_filter(&config).is_err());
  }
}
