//! Poll-based query and mutation handles for views.
//!
//! A `Query<T>` runs its fetcher on a tokio task and reports back over a
//! channel. Views call `poll()` on every tick; the query picks up results and
//! refetches on its own when its cache entry has been invalidated.
//!
//! ```ignore
//! let mut products = api.products_query();
//! products.fetch();
//!
//! // tick
//! products.poll();
//!
//! // render
//! if let QueryState::Ready(list) = products.state() {
//!     draw_table(&list);
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// What a view renders from.
#[derive(Debug)]
pub enum QueryState<T> {
  /// No data yet and a fetch is pending
  Loading,
  /// No data and the last fetch failed
  Error(String),
  /// Data is available, possibly stale while a refetch runs
  Ready(Arc<T>),
}

impl<T> Clone for QueryState<T> {
  fn clone(&self) -> Self {
    match self {
      QueryState::Loading => QueryState::Loading,
      QueryState::Error(e) => QueryState::Error(e.clone()),
      QueryState::Ready(data) => QueryState::Ready(Arc::clone(data)),
    }
  }
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, QueryState::Ready(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<Arc<T>, String>> + Send>>;

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

type RevisionFn = Box<dyn Fn() -> u64 + Send + Sync>;

/// Async query subscription with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Last data and last error, kept separately so stale data survives a failed refetch
/// - Async result handling via channels
/// - Invalidation tracking through a revision source
///
/// Dropping the query aborts its pending fetch.
pub struct Query<T> {
  data: Option<Arc<T>>,
  error: Option<String>,
  fetcher: FetcherFn<T>,
  revision: Option<RevisionFn>,
  seen_revision: u64,
  receiver: Option<mpsc::UnboundedReceiver<Result<Arc<T>, String>>>,
  task: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` starts a fetch.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<T>, String>> + Send + 'static,
  {
    Self {
      data: None,
      error: None,
      fetcher: Box::new(move || Box::pin(fetcher())),
      revision: None,
      seen_revision: 0,
      receiver: None,
      task: None,
    }
  }

  /// Refetch whenever `revision` reports a value different from the one seen
  /// when the last fetch started.
  pub fn with_revision<R>(mut self, revision: R) -> Self
  where
    R: Fn() -> u64 + Send + Sync + 'static,
  {
    self.revision = Some(Box::new(revision));
    self
  }

  pub fn state(&self) -> QueryState<T> {
    match (&self.data, &self.error) {
      (Some(data), _) => QueryState::Ready(Arc::clone(data)),
      (None, Some(error)) if !self.is_fetching() => QueryState::Error(error.clone()),
      (None, _) => QueryState::Loading,
    }
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  /// Error from the most recent fetch, if it failed.
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Start fetching data if not already fetching.
  pub fn fetch(&mut self) {
    if self.is_fetching() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, cancelling any pending one.
  pub fn refetch(&mut self) {
    self.cancel();
    self.start_fetch();
  }

  /// Poll for results from a pending fetch, and refetch after invalidation.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.receive();

    if let Some(revision) = &self.revision {
      if revision() != self.seen_revision {
        self.refetch();
        changed = true;
      }
    }

    changed
  }

  fn receive(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.data = Some(data);
        self.error = None;
      }
      Ok(Err(error)) => {
        self.error = Some(error);
      }
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.error = Some("Query was cancelled".to_string());
      }
    }

    self.receiver = None;
    self.task = None;
    true
  }

  fn start_fetch(&mut self) {
    if let Some(revision) = &self.revision {
      self.seen_revision = revision();
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let future = (self.fetcher)();
    self.task = Some(tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped
      let _ = tx.send(result);
    }));
  }

  fn cancel(&mut self) {
    self.receiver = None;
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("data", &self.data)
      .field("error", &self.error)
      .field("seen_revision", &self.seen_revision)
      .field("fetching", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}

/// A single pending write, polled like a query.
///
/// A started write always runs to completion so the cache sees its outcome.
/// Dropping the handle only discards the result.
pub struct Mutation<T> {
  receiver: Option<oneshot::Receiver<Result<T, String>>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self { receiver: None }
  }
}

impl<T: Send + 'static> Mutation<T> {
  /// Start a write on a detached task.
  ///
  /// Returns `false` without running `future` while a previous write is
  /// still pending.
  pub fn start<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    true
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Take the outcome if the mutation has finished.
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    let receiver = self.receiver.as_mut()?;

    let outcome = match receiver.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return None,
      // The task panicked before reporting
      Err(oneshot::error::TryRecvError::Closed) => Err("Request failed".to_string()),
    };

    self.receiver = None;
    Some(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(Arc::new(vec![1, 2, 3])) });

    assert!(query.state().is_loading());

    query.fetch();
    assert!(query.is_fetching());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.state().is_ready());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.state().is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_data() {
    let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let fail_clone = fail.clone();
    let mut query = Query::new(move || {
      let fail = fail_clone.load(Ordering::SeqCst);
      async move {
        if fail {
          Err("offline".to_string())
        } else {
          Ok(Arc::new(42))
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    fail.store(true, Ordering::SeqCst);
    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert!(matches!(query.state(), QueryState::Ready(data) if *data == 42));
    assert_eq!(query.error(), Some("offline"));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let mut query = Query::new(move || {
      counter_clone.fetch_add(1, Ordering::SeqCst);
      async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, String>(Arc::new(42))
      }
    });

    query.fetch();
    query.fetch();
    assert!(query.is_fetching());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(Arc::new(counter.fetch_add(1, Ordering::SeqCst)))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // The first task was aborted before it could count
    assert_eq!(query.data(), Some(&0));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_revision_change_triggers_refetch() {
    let revision = Arc::new(AtomicU64::new(0));
    let calls = Arc::new(AtomicU32::new(0));

    let calls_clone = calls.clone();
    let revision_clone = revision.clone();
    let mut query = Query::new(move || {
      let n = calls_clone.fetch_add(1, Ordering::SeqCst);
      async move { Ok::<_, String>(Arc::new(n)) }
    })
    .with_revision(move || revision_clone.load(Ordering::SeqCst));

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    // Unchanged revision: nothing to do
    assert!(!query.poll());

    revision.fetch_add(1, Ordering::SeqCst);
    assert!(query.poll());
    // Old data stays visible while the refetch runs
    assert_eq!(query.data(), Some(&0));

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_dropping_query_aborts_fetch() {
    let finished = Arc::new(AtomicU32::new(0));
    let finished_clone = finished.clone();
    let mut query = Query::new(move || {
      let finished = finished_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        finished.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(Arc::new(()))
      }
    });

    query.fetch();
    drop(query);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_mutation_outcome() {
    let mut mutation = Mutation::default();
    assert!(!mutation.is_pending());
    assert!(mutation.poll().is_none());

    assert!(mutation.start(async { Ok::<_, String>("saved") }));
    assert!(mutation.is_pending());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(mutation.poll(), Some(Ok("saved")));
    assert!(!mutation.is_pending());
    assert!(mutation.poll().is_none());
  }

  #[tokio::test]
  async fn test_mutation_error() {
    let mut mutation: Mutation<()> = Mutation::default();
    assert!(mutation.start(async { Err("HTTP 400: bad".to_string()) }));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(mutation.poll(), Some(Err("HTTP 400: bad".to_string())));
  }

  #[tokio::test]
  async fn test_start_is_rejected_while_pending() {
    let mut mutation: Mutation<u32> = Mutation::default();
    let second_ran = Arc::new(AtomicU32::new(0));

    assert!(mutation.start(async {
      tokio::time::sleep(Duration::from_millis(30)).await;
      Ok::<_, String>(1)
    }));

    let flag = second_ran.clone();
    let started = mutation.start(async move {
      flag.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(2)
    });
    assert!(!started);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(mutation.poll(), Some(Ok(1)));
    assert_eq!(second_ran.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_dropped_mutation_still_completes() {
    let finished = Arc::new(AtomicU32::new(0));

    let mut mutation: Mutation<()> = Mutation::default();
    let flag = finished.clone();
    assert!(mutation.start(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      flag.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(())
    }));
    drop(mutation);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
  }
}
