use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::swr::RevalidatePolicy;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "SITECACHE_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL every resource path is appended to
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  "http://localhost:5000/api".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Keep payloads on disk and use them as fallback data on the next run
  #[serde(default = "default_true")]
  pub persist: bool,
  /// Database location (defaults to $XDG_DATA_HOME/sitecache/cache.db)
  pub path: Option<PathBuf>,
  #[serde(default = "default_focus_throttle")]
  pub focus_throttle_secs: u64,
  #[serde(default)]
  pub content: PolicyConfig,
  #[serde(default)]
  pub settings: PolicyConfig,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      persist: true,
      path: None,
      focus_throttle_secs: default_focus_throttle(),
      content: PolicyConfig::default(),
      settings: PolicyConfig::default(),
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_focus_throttle() -> u64 {
  5
}

/// Revalidation policy as written in the config file.
///
/// Fields left out fall back to the resource's built-in policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct PolicyConfig {
  pub dedupe_interval_secs: Option<u64>,
  pub revalidate_on_focus: Option<bool>,
  pub revalidate_on_reconnect: Option<bool>,
}

impl PolicyConfig {
  /// Apply the configured overrides on top of `base`.
  pub fn resolve(&self, base: RevalidatePolicy) -> RevalidatePolicy {
    let mut policy = base;
    if let Some(secs) = self.dedupe_interval_secs {
      policy = policy.with_dedupe_interval(Duration::from_secs(secs));
    }
    if let Some(enabled) = self.revalidate_on_focus {
      policy = policy.with_revalidate_on_focus(enabled);
    }
    if let Some(enabled) = self.revalidate_on_reconnect {
      policy = policy.with_revalidate_on_reconnect(enabled);
    }
    policy
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// tracing filter directive, used when RUST_LOG is unset
  pub filter: Option<String>,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./sitecache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sitecache/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.apply_env();
    Ok(config)
  }

  /// SITECACHE_API_URL wins over the config file.
  fn apply_env(&mut self) {
    if let Ok(url) = std::env::var(API_URL_ENV) {
      self.api.base_url = url;
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sitecache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sitecache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Parse and check the API base URL.
  pub fn api_base_url(&self) -> Result<Url> {
    Self::parse_base_url(&self.api.base_url)
  }

  fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| eyre!("Invalid API base URL '{}': {}", raw, e))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!("API base URL must be http(s): {}", raw));
    }
    Ok(url)
  }

  pub fn content_policy(&self) -> RevalidatePolicy {
    self.cache.content.resolve(RevalidatePolicy::content())
  }

  pub fn settings_policy(&self) -> RevalidatePolicy {
    self.cache.settings.resolve(RevalidatePolicy::settings())
  }

  pub fn focus_throttle(&self) -> Duration {
    Duration::from_secs(self.cache.focus_throttle_secs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.api.base_url, "http://localhost:5000/api");
    assert!(config.cache.persist);
    assert_eq!(config.focus_throttle(), Duration::from_secs(5));
    assert_eq!(config.content_policy(), RevalidatePolicy::content());
    assert_eq!(config.settings_policy(), RevalidatePolicy::settings());
  }

  #[test]
  fn test_policy_overrides_are_partial() {
    let config = Config::from_yaml(
      r#"
api:
  base_url: https://builders.example.com/api
cache:
  persist: false
  content:
    dedupe_interval_secs: 120
  settings:
    revalidate_on_focus: false
log:
  filter: sitecache=debug
"#,
    )
    .unwrap();

    assert!(!config.cache.persist);
    let content = config.content_policy();
    assert_eq!(content.dedupe_interval, Duration::from_secs(120));
    assert!(!content.revalidate_on_focus);

    let settings = config.settings_policy();
    assert_eq!(settings.dedupe_interval, Duration::from_secs(30));
    assert!(!settings.revalidate_on_focus);
    assert_eq!(config.log.filter.as_deref(), Some("sitecache=debug"));
  }

  #[test]
  fn test_parse_base_url() {
    let url = Config::parse_base_url("https://builders.example.com/api").unwrap();
    assert_eq!(url.path(), "/api");

    assert!(Config::parse_base_url("not a url").is_err());
    assert!(Config::parse_base_url("ftp://builders.example.com").is_err());
    assert!(Config::parse_base_url("mailto:office@example.com").is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let err = Config::load(Some(Path::new("/nonexistent/sitecache.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_invalid_yaml_is_error() {
    assert!(Config::from_yaml("cache: [not, a, map]").is_err());
  }
}
