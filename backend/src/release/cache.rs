//! Time-bounded cache in front of the release lookup.

use super::fetcher::VersionFetcher;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default time a fetched version is served without asking the remote again.
///
/// The unauthenticated GitHub API allows 60 requests per hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Last successfully fetched version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVersion {
    /// Version string without the `v` prefix
    pub value: String,
    /// When the fetch that produced `value` completed
    pub fetched_at: Instant,
}

/// Caches the latest released version and refreshes it lazily on read.
///
/// Failed refreshes never clear the cached value; an expired value keeps
/// being served until a refresh succeeds. At most one refresh runs at a
/// time: callers arriving while one is in flight wait for it and return
/// whatever it left behind.
pub struct VersionCache {
    fetcher: Arc<dyn VersionFetcher>,
    ttl: Duration,
    cached: RwLock<Option<CachedVersion>>,
    /// Held for the duration of a refresh
    refresh: Mutex<()>,
    /// Completed refresh attempts, successful or not
    attempts: AtomicU64,
}

impl VersionCache {
    pub fn new(fetcher: Arc<dyn VersionFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            cached: RwLock::new(None),
            refresh: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current cached record, if any fetch has ever succeeded.
    pub fn snapshot(&self) -> Option<CachedVersion> {
        self.cached.read().clone()
    }

    /// Get the latest released version, refreshing it first if stale.
    ///
    /// Returns `None` only while no fetch has ever succeeded.
    pub async fn latest_version(&self) -> Option<String> {
        if let Some(value) = self.fresh_value() {
            return Some(value);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.refresh.lock().await;

        // Another caller finished a refresh while we were waiting for the lock
        if self.attempts.load(Ordering::Acquire) != seen {
            return self.current_value();
        }
        if let Some(value) = self.fresh_value() {
            return Some(value);
        }

        let result = self.fetcher.fetch().await;

        let value = match result {
            Ok(value) => {
                let previous = {
                    let mut cached = self.cached.write();
                    cached
                        .replace(CachedVersion {
                            value: value.clone(),
                            fetched_at: Instant::now(),
                        })
                        .map(|c| c.value)
                };
                if previous.as_deref() != Some(value.as_str()) {
                    info!("Latest released version is now {}", value);
                } else {
                    debug!("Latest released version unchanged ({})", value);
                }
                Some(value)
            }
            Err(e) => {
                let current = self.current_value();
                warn!(
                    "Release check failed, serving {}: {}",
                    current.as_deref().unwrap_or("no version"),
                    e
                );
                current
            }
        };

        self.attempts.fetch_add(1, Ordering::AcqRel);
        value
    }

    fn fresh_value(&self) -> Option<String> {
        let cached = self.cached.read();
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() <= self.ttl)
            .map(|c| c.value.clone())
    }

    fn current_value(&self) -> Option<String> {
        self.cached.read().as_ref().map(|c| c.value.clone())
    }
}

impl std::fmt::Debug for VersionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionCache")
            .field("ttl", &self.ttl)
            .field("cached", &*self.cached.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::fetcher::FetchError;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Fetcher replaying a fixed list of results, then failing.
    struct ScriptedFetcher {
        results: SyncMutex<VecDeque<Result<String, FetchError>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedFetcher {
        fn new(results: Vec<Result<String, FetchError>>) -> Arc<Self> {
            Self::with_delay(results, Duration::ZERO)
        }

        fn with_delay(results: Vec<Result<String, FetchError>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                results: SyncMutex::new(results.into()),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VersionFetcher for ScriptedFetcher {
        async fn fetch(&self) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Unreachable("script exhausted".to_string())))
        }
    }

    fn ok(v: &str) -> Result<String, FetchError> {
        Ok(v.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_without_success_is_none() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::BadStatus(403))]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        assert!(cache.snapshot().is_none());
        assert_eq!(cache.latest_version().await, None);
        assert!(cache.snapshot().is_none());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_stores_value_and_timestamp() {
        let fetcher = ScriptedFetcher::new(vec![ok("1.2.3")]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        let now = Instant::now();
        assert_eq!(cache.latest_version().await.as_deref(), Some("1.2.3"));

        let snapshot = cache.snapshot().unwrap();
        assert_eq!(snapshot.value, "1.2.3");
        assert_eq!(snapshot.fetched_at, now);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_served_without_call() {
        let fetcher = ScriptedFetcher::new(vec![ok("1.5.0"), ok("1.6.0")]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        assert_eq!(cache.latest_version().await.as_deref(), Some("1.5.0"));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.latest_version().await.as_deref(), Some("1.5.0"));
        tokio::time::advance(Duration::from_secs(9 * 60)).await;
        assert_eq!(cache.latest_version().await.as_deref(), Some("1.5.0"));

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_at_exactly_ttl_is_fresh() {
        let fetcher = ScriptedFetcher::new(vec![ok("1.0.0"), ok("1.1.0")]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        cache.latest_version().await;
        tokio::time::advance(DEFAULT_TTL).await;
        assert_eq!(cache.latest_version().await.as_deref(), Some("1.0.0"));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_value_triggers_one_call_per_request() {
        let fetcher = ScriptedFetcher::new(vec![ok("1.0.0"), ok("1.1.0")]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        cache.latest_version().await;
        tokio::time::advance(DEFAULT_TTL + Duration::from_secs(1)).await;

        let refreshed_at = Instant::now();
        assert_eq!(cache.latest_version().await.as_deref(), Some("1.1.0"));
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.snapshot().unwrap().fetched_at, refreshed_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_preserves_state() {
        let fetcher = ScriptedFetcher::new(vec![
            ok("1.5.0"),
            Err(FetchError::Unreachable("timed out".to_string())),
            Err(FetchError::BadStatus(500)),
            Err(FetchError::MalformedResponse("empty tag list".to_string())),
        ]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        cache.latest_version().await;
        let before = cache.snapshot().unwrap();

        for _ in 0..3 {
            tokio::time::advance(DEFAULT_TTL * 2).await;
            assert_eq!(cache.latest_version().await.as_deref(), Some("1.5.0"));
            assert_eq!(cache.snapshot().unwrap(), before);
        }

        // Every stale request retried, no backoff
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failures() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::Unreachable("connection refused".to_string())),
            ok("2.0.0"),
        ]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        assert_eq!(cache.latest_version().await, None);
        assert_eq!(cache.latest_version().await.as_deref(), Some("2.0.0"));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_is_reflected_verbatim() {
        let fetcher = ScriptedFetcher::new(vec![ok("2.0.0"), ok("1.9.0")]);
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        cache.latest_version().await;
        tokio::time::advance(DEFAULT_TTL * 2).await;
        assert_eq!(cache.latest_version().await.as_deref(), Some("1.9.0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_readers_share_one_fetch() {
        let fetcher = ScriptedFetcher::with_delay(vec![ok("3.0.0")], Duration::from_secs(2));
        let cache = Arc::new(VersionCache::new(fetcher.clone(), DEFAULT_TTL));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.latest_version().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_deref(), Some("3.0.0"));
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_readers_share_failed_fetch() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![Err(FetchError::Unreachable("timed out".to_string()))],
            Duration::from_secs(3),
        );
        let cache = Arc::new(VersionCache::new(fetcher.clone(), DEFAULT_TTL));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.latest_version().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), None);
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_value_served_to_concurrent_readers_of_failed_refresh() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![
                ok("1.0.0"),
                Err(FetchError::Unreachable("timed out".to_string())),
                Err(FetchError::BadStatus(503)),
            ],
            Duration::from_secs(1),
        );
        let cache = Arc::new(VersionCache::new(fetcher.clone(), DEFAULT_TTL));

        assert_eq!(cache.latest_version().await.as_deref(), Some("1.0.0"));
        tokio::time::advance(DEFAULT_TTL * 2).await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.latest_version().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_deref(), Some("1.0.0"));
        }
        assert_eq!(fetcher.calls(), 2);

        // The next stale request tries again on its own
        assert_eq!(cache.latest_version().await.as_deref(), Some("1.0.0"));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_refresh_leaves_no_state() {
        let fetcher = ScriptedFetcher::with_delay(vec![ok("4.0.0")], Duration::from_secs(60));
        let cache = VersionCache::new(fetcher.clone(), DEFAULT_TTL);

        let result =
            tokio::time::timeout(Duration::from_secs(1), cache.latest_version()).await;
        assert!(result.is_err());
        assert!(cache.snapshot().is_none());
    }
}
