//! In-memory TTL response cache with request coalescing.
//!
//! [`ResponseCache::get_or_fetch`] returns a fresh stored value when there is
//! one. Otherwise it runs the supplied fetch, stores a successful result and
//! hands it back. Concurrent misses on one key share a single fetch, which
//! runs on its own task so that a caller going away does not cancel it for
//! the others. Failed fetches are never stored.

pub mod clock;
pub mod entry;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;

/// TTL used when a call site does not ask for a specific one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Failures produced by the cache itself rather than by a fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("fetch for cache key '{key}' panicked")]
    FetchPanicked { key: String },

    #[error("fetch for cache key '{key}' was aborted")]
    Aborted { key: String },
}

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// A running fetch and the task driving it.
struct InFlight<V, E> {
    id: u64,
    fetch: SharedFetch<V, E>,
    task: AbortHandle,
}

struct Inner<V, E> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    in_flight: Mutex<HashMap<String, InFlight<V, E>>>,
    next_fetch_id: AtomicU64,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl<V, E> Inner<V, E> {
    /// Drop `key` from the in-flight table if it still belongs to fetch `id`.
    async fn finish_fetch(&self, key: &str, id: u64) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.get(key).is_some_and(|running| running.id == id) {
            in_flight.remove(key);
        }
    }
}

/// Cloneable handle; clones share one store.
pub struct ResponseCache<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for ResponseCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> ResponseCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<CacheError> + 'static,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                next_fetch_id: AtomicU64::new(0),
                clock,
                default_ttl,
            }),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Return the value for `key` if it is fresh, otherwise run `fetch`
    /// (or join a fetch already running for `key`) and store its success.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = key.into();

        if let Some(value) = self.lookup(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(value);
        }

        let pending = {
            let mut in_flight = self.inner.in_flight.lock().await;

            // A fetch may have landed between the lookup and taking the lock.
            if let Some(value) = self.peek(&key).await {
                debug!("Cache hit after wait: {}", key);
                return Ok(value);
            }

            // A task that has ended but is still listed was cancelled
            // before it could report back (e.g. its runtime shut down).
            let joinable = in_flight
                .get(&key)
                .filter(|running| !running.task.is_finished())
                .map(|running| running.fetch.clone());

            match joinable {
                Some(pending) => {
                    debug!("Joining in-flight fetch: {}", key);
                    pending
                }
                None => {
                    if in_flight.remove(&key).is_some() {
                        warn!("Discarding cancelled fetch for cache key '{}'", key);
                    }
                    debug!("Cache miss, fetching: {} (ttl {:?})", key, ttl);
                    let running = self.spawn_fetch(key.clone(), ttl, fetch());
                    let pending = running.fetch.clone();
                    in_flight.insert(key.clone(), running);
                    pending
                }
            }
        };

        pending.await
    }

    pub async fn get_or_fetch_default<F, Fut>(
        &self,
        key: impl Into<String>,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.get_or_fetch(key, self.inner.default_ttl, fetch).await
    }

    /// Fresh value for `key`, without fetching or expiring anything.
    pub async fn peek(&self, key: &str) -> Option<V> {
        let now = self.inner.clock.now();
        let entries = self.inner.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.value.clone())
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.inner.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.inner.entries.write().await.clear();
    }

    /// Stored entries, including expired ones not yet looked up again.
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Fetches currently running.
    pub async fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().await.len()
    }

    /// Fresh value for `key`; an expired entry is dropped on the way.
    async fn lookup(&self, key: &str) -> Option<V> {
        let now = self.inner.clock.now();
        {
            let entries = self.inner.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.inner.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_fresh(now)) {
            entries.remove(key);
            debug!("Cache entry expired: {}", key);
        }
        None
    }

    fn spawn_fetch<Fut>(&self, key: String, ttl: Duration, fetch: Fut) -> InFlight<V, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let waiter_inner: Weak<Inner<V, E>> = Arc::downgrade(&self.inner);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(fetch).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    error!("Fetch for cache key '{}' panicked", task_key);
                    Err(E::from(CacheError::FetchPanicked {
                        key: task_key.clone(),
                    }))
                }
            };

            if let Ok(value) = &result {
                let entry = CacheEntry::new(value.clone(), inner.clock.now(), ttl);
                inner.entries.write().await.insert(task_key.clone(), entry);
            }
            inner.finish_fetch(&task_key, id).await;

            result
        });
        let task = handle.abort_handle();

        let fetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Fetch task for cache key '{}' failed: {}", key, e);
                    if let Some(inner) = waiter_inner.upgrade() {
                        inner.finish_fetch(&key, id).await;
                    }
                    Err(E::from(CacheError::Aborted { key }))
                }
            }
        }
        .boxed()
        .shared();

        InFlight { id, fetch, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Upstream(String),
        Cache(CacheError),
    }

    impl From<CacheError> for TestError {
        fn from(e: CacheError) -> Self {
            TestError::Cache(e)
        }
    }

    type TestCache = ResponseCache<u32, TestError>;

    const TTL: Duration = Duration::from_secs(60);

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// Fetch that counts its executions and takes a little while.
    fn counted(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, TestError>> + use<> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    fn failing(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, TestError>> + use<> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Upstream("503 Service Unavailable".to_string()))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_a_hit() {
        let cache = TestCache::new(TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get_or_fetch("k", TTL, counted(&calls, 1)).await, Ok(1));
        assert_eq!(cache.get_or_fetch("k", TTL, counted(&calls, 2)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TestCache::with_clock(TTL, clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get_or_fetch("k", TTL, counted(&calls, 1)).await, Ok(1));

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get_or_fetch("k", TTL, counted(&calls, 2)).await, Ok(1));

        clock.advance(Duration::from_secs(1));
        // Lazy expiry: still stored until the next lookup.
        assert_eq!(cache.peek("k").await, None);
        assert_eq!(cache.len().await, 1);

        assert_eq!(cache.get_or_fetch("k", TTL, counted(&calls, 2)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_stored_ttl_governs_freshness() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TestCache::with_clock(TTL, clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let day = Duration::from_secs(24 * 60 * 60);
        cache.get_or_fetch("apod", day, counted(&calls, 1)).await.unwrap();

        clock.advance(Duration::from_secs(60 * 60));
        assert_eq!(cache.get_or_fetch_default("apod", counted(&calls, 2)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = TestCache::new(TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        let err = cache.get_or_fetch("k", TTL, failing(&calls)).await;
        assert_eq!(
            err,
            Err(TestError::Upstream("503 Service Unavailable".to_string()))
        );
        assert!(cache.is_empty().await);
        assert_eq!(cache.in_flight().await, 0);

        assert_eq!(cache.get_or_fetch("k", TTL, counted(&calls, 5)).await, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache = TestCache::new(TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        let waiters = (0..8).map(|i| cache.get_or_fetch("k", TTL, counted(&calls, i)));
        let results = futures::future::join_all(waiters).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| *r == Ok(0)));
        assert_eq!(cache.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_failure_fans_out() {
        let cache = TestCache::new(TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        let slow_failure = {
            let calls = Arc::clone(&calls);
            move || {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err::<u32, _>(TestError::Upstream("timeout".to_string()))
                }
                .boxed()
            }
        };
        let (a, b) = tokio::join!(
            cache.get_or_fetch("k", TTL, slow_failure),
            cache.get_or_fetch("k", TTL, failing(&calls)),
        );

        assert_eq!(a, Err(TestError::Upstream("timeout".to_string())));
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        let cache = TestCache::new(TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_fetch("a", TTL, counted(&calls, 1)),
            cache.get_or_fetch("b", TTL, counted(&calls, 2)),
        );
        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(cache.invalidate("a").await);
        assert_eq!(cache.peek("a").await, None);
        assert_eq!(cache.peek("b").await, Some(2));
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cancel_shared_fetch() {
        let cache = TestCache::new(TTL);
        let (tx, rx) = oneshot::channel::<u32>();

        let leader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("k", TTL, move || async move {
                        rx.await
                            .map_err(|_| TestError::Upstream("gate dropped".to_string()))
                    })
                    .await
            })
        };

        while cache.in_flight().await == 0 {
            tokio::task::yield_now().await;
        }
        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        tx.send(7).unwrap();
        let value = cache
            .get_or_fetch("k", TTL, || async {
                Err(TestError::Upstream("should have joined".to_string()))
            })
            .await;
        assert_eq!(value, Ok(7));
        assert_eq!(cache.peek("k").await, Some(7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_fetch_across_workers() {
        let cache = TestCache::new(TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        let callers: Vec<_> = (0..32)
            .map(|i| {
                let cache = cache.clone();
                let fetch = counted(&calls, i);
                tokio::spawn(async move { cache.get_or_fetch("k", TTL, fetch).await })
            })
            .collect();

        let mut results = Vec::new();
        for caller in callers {
            results.push(caller.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.is_ok() && *r == results[0]));
        assert_eq!(cache.in_flight().await, 0);
    }

    #[test]
    fn test_fetch_cancelled_with_its_runtime_is_retried() {
        let cache = TestCache::new(TTL);

        let first = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        first.block_on(async {
            let caller = {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_fetch("k", TTL, || async {
                            tokio::time::sleep(Duration::from_secs(60 * 60)).await;
                            Ok(1)
                        })
                        .await
                })
            };
            while cache.in_flight().await == 0 {
                tokio::task::yield_now().await;
            }
            caller.abort();
        });
        // Shutting the runtime down cancels the fetch task mid-flight.
        drop(first);

        let second = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        second.block_on(async {
            assert_eq!(cache.in_flight().await, 1);
            assert_eq!(cache.get_or_fetch("k", TTL, || async { Ok(2) }).await, Ok(2));
            assert_eq!(cache.in_flight().await, 0);
            assert_eq!(cache.get_or_fetch("k", TTL, || async { Ok(3) }).await, Ok(2));
        });
    }

    #[tokio::test]
    async fn test_panicking_fetch_leaves_key_empty() {
        let cache = TestCache::new(TTL);

        let result = cache
            .get_or_fetch("k", TTL, || async {
                let missing: Option<u32> = None;
                Ok(missing.expect("upstream handed back nothing"))
            })
            .await;

        assert_eq!(
            result,
            Err(TestError::Cache(CacheError::FetchPanicked {
                key: "k".to_string()
            }))
        );
        assert!(cache.is_empty().await);
        assert_eq!(cache.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = TestCache::new(DEFAULT_TTL);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get_or_fetch_default("a", counted(&calls, 1)).await.unwrap();
        cache.get_or_fetch_default("b", counted(&calls, 2)).await.unwrap();

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert_eq!(cache.default_ttl(), DEFAULT_TTL);
    }
}
