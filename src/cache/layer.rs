//! In-memory query cache with tag-based invalidation.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::tags::{self, Tag};
use super::traits::{EntrySnapshot, QueryKey, QueryStatus, SharedError, TypeMismatch};

type AnyValue = Arc<dyn Any + Send + Sync>;
type FetchOutput = Result<AnyValue, SharedError>;
type InFlight = Shared<BoxFuture<'static, FetchOutput>>;

struct Entry {
  tags: &'static [Tag],
  data: Option<AnyValue>,
  status: QueryStatus,
  stale: bool,
  /// Bumped on every invalidation so subscribers know to refetch
  revision: u64,
  last_fetched_at: Option<DateTime<Utc>>,
  in_flight: Option<(u64, InFlight)>,
}

impl Entry {
  fn new(tags: &'static [Tag]) -> Self {
    Self {
      tags,
      data: None,
      status: QueryStatus::Loading,
      stale: false,
      revision: 0,
      last_fetched_at: None,
      in_flight: None,
    }
  }

  /// Data that can be served without a refetch.
  fn fresh_data(&self, max_age: Option<Duration>) -> Option<AnyValue> {
    if self.stale || self.status != QueryStatus::Success {
      return None;
    }
    if let (Some(max_age), Some(fetched_at)) = (max_age, self.last_fetched_at) {
      // A timestamp from the future (clock skew) counts as fresh
      let expired = (Utc::now() - fetched_at)
        .to_std()
        .is_ok_and(|age| age >= max_age);
      if expired {
        return None;
      }
    }
    self.data.clone()
  }
}

#[derive(Default)]
struct CacheState {
  entries: HashMap<String, Entry>,
  next_fetch_id: u64,
}

/// Query cache shared by every view.
///
/// - Results are stored per query key, along with the tags the query provides.
/// - Concurrent reads of the same key share a single in-flight fetch.
/// - A successful mutation marks every entry sharing one of its (expanded)
///   tags as stale; a failed one leaves the cache untouched.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone)]
pub struct QueryCache {
  state: Arc<Mutex<CacheState>>,
  /// Held across a mutation and its invalidation
  mutations: Arc<tokio::sync::Mutex<()>>,
  max_age: Option<Duration>,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.lock().entries.len())
      .field("max_age", &self.max_age)
      .finish_non_exhaustive()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState::default())),
      mutations: Arc::new(tokio::sync::Mutex::new(())),
      max_age: None,
    }
  }

  /// Treat cached data older than `max_age` as stale even without invalidation.
  pub fn with_max_age(mut self, max_age: Duration) -> Self {
    self.max_age = Some(max_age);
    self
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    // Entries hold no invariants a panicking writer could break halfway
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Read a query through the cache.
  ///
  /// Returns cached data when it is present and not stale. Otherwise joins
  /// the in-flight fetch for this key, or starts one with `fetcher`.
  pub async fn query<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<Arc<T>, SharedError>
  where
    K: QueryKey + ?Sized,
    T: Send + Sync + 'static,
    E: Error + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let cache_key = key.cache_key();

    let (fetch_id, in_flight) = {
      let mut state = self.lock();

      if let Some(data) = state
        .entries
        .get(&cache_key)
        .and_then(|entry| entry.fresh_data(self.max_age))
      {
        debug!(key = %cache_key, "cache hit");
        return downcast(&cache_key, data);
      }

      let joined = state
        .entries
        .get(&cache_key)
        .and_then(|entry| entry.in_flight.clone());

      match joined {
        Some(joined) => {
          debug!(key = %cache_key, "joining in-flight fetch");
          joined
        }
        None => {
          let fetch_id = state.next_fetch_id;
          state.next_fetch_id += 1;

          let future: InFlight = fetcher()
            .map(|result| {
              result
                .map(|value| Arc::new(value) as AnyValue)
                .map_err(|e| Arc::new(e) as SharedError)
            })
            .boxed()
            .shared();

          let entry = state
            .entries
            .entry(cache_key.clone())
            .or_insert_with(|| Entry::new(key.tags()));
          entry.status = QueryStatus::Loading;
          entry.in_flight = Some((fetch_id, future.clone()));

          info!(query = %key.description(), "fetching");
          (fetch_id, future)
        }
      }
    };

    let result = in_flight.await;
    self.settle(&cache_key, fetch_id, &result);
    result.and_then(|value| downcast(&cache_key, value))
  }

  /// Store the outcome of a fetch, unless it was superseded or already stored.
  fn settle(&self, cache_key: &str, fetch_id: u64, result: &FetchOutput) {
    let mut state = self.lock();
    let Some(entry) = state.entries.get_mut(cache_key) else {
      return;
    };

    match &entry.in_flight {
      Some((id, _)) if *id == fetch_id => {}
      _ => return,
    }
    entry.in_flight = None;

    match result {
      Ok(value) => {
        entry.data = Some(Arc::clone(value));
        entry.status = QueryStatus::Success;
        entry.stale = false;
        entry.last_fetched_at = Some(Utc::now());
      }
      Err(e) => {
        // Prior data stays in place for display
        warn!(key = %cache_key, error = %e, "fetch failed");
        entry.status = QueryStatus::Error(e.to_string());
      }
    }
  }

  /// Run a mutation and, if it succeeds, invalidate every query sharing one of
  /// `tags` (after expanding cross-tag dependencies).
  ///
  /// Mutations are serialized; a failed mutation never touches the cache.
  pub async fn mutate<T, E, F, Fut>(&self, tags: &[Tag], mutation: F) -> Result<T, E>
  where
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let _guard = self.mutations.lock().await;

    match mutation().await {
      Ok(value) => {
        self.invalidate(tags);
        Ok(value)
      }
      Err(e) => {
        warn!(?tags, error = %e, "mutation failed, cache left unchanged");
        Err(e)
      }
    }
  }

  /// Mark every entry providing one of `tags` (or a dependent tag) as stale.
  ///
  /// Returns the number of entries invalidated.
  pub fn invalidate(&self, tags: &[Tag]) -> usize {
    let expanded = tags::expand(tags);
    let mut state = self.lock();
    let mut invalidated = 0;

    for (key, entry) in state.entries.iter_mut() {
      if !tags::intersects(entry.tags, &expanded) {
        continue;
      }
      entry.stale = true;
      entry.revision += 1;
      if entry.in_flight.take().is_some() {
        debug!(%key, "discarding in-flight fetch");
      }
      invalidated += 1;
    }

    info!(tags = ?expanded, invalidated, "invalidated cache entries");
    invalidated
  }

  /// Drop every cached entry.
  pub fn clear(&self) {
    self.lock().entries.clear();
  }

  pub fn is_stale<K: QueryKey + ?Sized>(&self, key: &K) -> bool {
    self
      .lock()
      .entries
      .get(&key.cache_key())
      .map(|entry| entry.stale)
      .unwrap_or(false)
  }

  /// Invalidation counter for `key`; changes whenever the entry is invalidated.
  pub fn revision<K: QueryKey + ?Sized>(&self, key: &K) -> u64 {
    self
      .lock()
      .entries
      .get(&key.cache_key())
      .map(|entry| entry.revision)
      .unwrap_or(0)
  }

  pub fn snapshot<K, T>(&self, key: &K) -> Option<EntrySnapshot<T>>
  where
    K: QueryKey + ?Sized,
    T: Send + Sync + 'static,
  {
    let state = self.lock();
    let entry = state.entries.get(&key.cache_key())?;

    Some(EntrySnapshot {
      data: entry
        .data
        .clone()
        .and_then(|value| value.downcast::<T>().ok()),
      status: entry.status.clone(),
      stale: entry.stale,
      last_fetched_at: entry.last_fetched_at,
    })
  }
}

fn downcast<T: Send + Sync + 'static>(key: &str, value: AnyValue) -> Result<Arc<T>, SharedError> {
  value.downcast::<T>().map_err(|_| {
    Arc::new(TypeMismatch {
      key: key.to_string(),
    }) as SharedError
  })
}
