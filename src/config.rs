use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BASE_URL_ENV: &str = "I9S_API_BASE_URL";
const ADMIN_PASSWORD_ENV: &str = "I9S_ADMIN_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub base_url: String,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

/// Cache tuning. Without `max_age_secs`, entries only go stale through invalidation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  pub max_age_secs: Option<u64>,
}

impl CacheConfig {
  pub fn max_age(&self) -> Option<Duration> {
    self.max_age_secs.map(Duration::from_secs)
  }
}

fn default_timeout_secs() -> u64 {
  10
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./i9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/i9s/config.yaml
  ///
  /// Without a file, `I9S_API_BASE_URL` alone is enough.
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

    let env_base_url = std::env::var(BASE_URL_ENV).ok();

    let config = match (path, env_base_url.as_deref()) {
      (Some(p), _) => Self::load_from_path(&p)?,
      (None, Some(url)) => Self::with_base_url(url),
      (None, None) => {
        return Err(eyre!(
          "No configuration found. Create ~/.config/i9s/config.yaml or set {}.",
          BASE_URL_ENV
        ))
      }
    };

    Ok(config.apply_overrides(env_base_url))
  }

  /// Minimal configuration pointing at `base_url`.
  pub fn with_base_url(base_url: &str) -> Self {
    Config {
      api: ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: default_timeout_secs(),
      },
      cache: CacheConfig::default(),
      title: None,
    }
  }

  /// Replace the API base URL if an override is given.
  pub fn apply_overrides(mut self, base_url: Option<String>) -> Self {
    if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
      self.api.base_url = url;
    }
    self
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("i9s.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("i9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the admin password for the login gate from the environment.
  ///
  /// Returns None when no password is configured, which leaves the gate open.
  pub fn get_admin_password() -> Option<String> {
    std::env::var(ADMIN_PASSWORD_ENV)
      .ok()
      .filter(|p| !p.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
api:
  base_url: http://localhost:8000
  timeout_secs: 3
title: Main Store
"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "http://localhost:8000");
    assert_eq!(config.api.timeout(), Duration::from_secs(3));
    assert_eq!(config.title.as_deref(), Some("Main Store"));
    assert_eq!(config.cache.max_age(), None);
  }

  #[test]
  fn test_cache_max_age() {
    let config =
      Config::parse("api:\n  base_url: http://shop.local\ncache:\n  max_age_secs: 30\n").unwrap();
    assert_eq!(config.cache.max_age(), Some(Duration::from_secs(30)));
  }

  #[tokio::test]
  async fn test_zero_max_age_refetches_every_read() {
    use crate::api::ApiQueryKey;
    use crate::cache::QueryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let config =
      Config::parse("api:\n  base_url: http://shop.local\ncache:\n  max_age_secs: 0\n").unwrap();
    let max_age = config.cache.max_age().unwrap();
    let cache = QueryCache::new().with_max_age(max_age);

    let calls = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
      let calls = calls.clone();
      cache
        .query(&ApiQueryKey::Products, move || async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, std::io::Error>(Vec::<u32>::new())
        })
        .await
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_timeout_defaults() {
    let config = Config::parse("api:\n  base_url: http://shop.local\n").unwrap();
    assert_eq!(config.api.timeout_secs, 10);
    assert!(config.title.is_none());
  }

  #[test]
  fn test_missing_base_url_is_an_error() {
    assert!(Config::parse("title: nope\n").is_err());
  }

  #[test]
  fn test_base_url_override() {
    let config = Config::with_base_url("http://a").apply_overrides(Some("http://b".to_string()));
    assert_eq!(config.api.base_url, "http://b");

    let config = Config::with_base_url("http://a").apply_overrides(Some("  ".to_string()));
    assert_eq!(config.api.base_url, "http://a");

    let config = Config::with_base_url("http://a").apply_overrides(None);
    assert_eq!(config.api.base_url, "http://a");
  }
}
