//! Core traits and types for the query cache.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::sync::Arc;

use super::tags::Tag;

/// Failure shared by every caller of a single fetch.
pub type SharedError = Arc<dyn Error + Send + Sync>;

/// Identifies a cached query and the resource tags it provides.
pub trait QueryKey {
  /// Stable identifier for this query (resource plus parameters)
  fn cache_key(&self) -> String;

  /// Tags this query provides. A mutation touching any of them invalidates it.
  fn tags(&self) -> &'static [Tag];

  /// Human-readable description for logs
  fn description(&self) -> String {
    self.cache_key()
  }
}

/// Fetch status of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
  Loading,
  Success,
  Error(String),
}

/// Read-only copy of a cache entry.
#[derive(Debug, Clone)]
pub struct EntrySnapshot<T> {
  /// Last successfully fetched data, kept through stale refetches and errors
  pub data: Option<Arc<T>>,
  pub status: QueryStatus,
  /// Marked for mandatory refetch on next access
  pub stale: bool,
  pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Error used when a cached value does not have the type the caller asked for.
#[derive(Debug, thiserror::Error)]
#[error("cached value for '{key}' has an unexpected type")]
pub struct TypeMismatch {
  pub key: String,
}
