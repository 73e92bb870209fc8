//! Signing-key cache in front of the issuer's JWKS endpoint.
//!
//! ```text
//! lookup(kid) → fresh set has kid?         → hit
//!             → miss / stale set            → take refresh lock
//!                 → another task refreshed  → answer from its result
//!                 → throttled forced refresh → UnknownKey
//!                   (fresh set, or last attempt failed)
//!                 → fetch + replace set     → answer
//! ```
//!
//! At most one fetch is in flight at any time; tasks that miss while it runs wait on the
//! refresh lock and reuse its result instead of fetching again.

use std::{
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use super::{JwksFetcher, KeyMap, KeyProviderError, SigningKey, parse_key_set};

/// Default key-set TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default minimum spacing between forced (miss-driven) refreshes.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Source of verification keys for the token validator.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Returns the key for `kid`, refreshing the key set at most once on a miss.
    async fn signing_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyProviderError>;
}

#[derive(Default)]
struct KeyCache {
    keys: KeyMap,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
    last_attempt_failed: bool,
    // Bumped after every refresh attempt, successful or not.
    attempts: u64,
}

impl KeyCache {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < ttl)
    }
}

pub struct JwksKeyProvider {
    fetcher: Arc<dyn JwksFetcher>,
    ttl: Duration,
    min_refresh_interval: Duration,
    cache: RwLock<KeyCache>,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for JwksKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeyProvider")
            .field("source", &self.fetcher.source())
            .field("ttl", &self.ttl)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish()
    }
}

impl JwksKeyProvider {
    pub fn new(fetcher: Arc<dyn JwksFetcher>, ttl: Duration, min_refresh_interval: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            min_refresh_interval,
            cache: RwLock::new(KeyCache::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Fetches the key set now, replacing the cached one on success.
    ///
    /// Returns the number of usable keys. On failure the previous set is kept.
    pub async fn refresh(&self) -> Result<usize, KeyProviderError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Number of keys currently cached (fresh or not).
    #[cfg(test)]
    pub fn cached_keys(&self) -> usize {
        self.read().keys.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, KeyCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    // Caller must hold `refresh_lock`.
    async fn refresh_locked(&self) -> Result<usize, KeyProviderError> {
        let result = match self.fetcher.fetch().await {
            Ok(body) => parse_key_set(&body),
            Err(err) => Err(err),
        };

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        cache.attempts += 1;
        cache.last_attempt = Some(now);
        cache.last_attempt_failed = result.is_err();

        match result {
            Ok(keys) => {
                let count = keys.len();
                cache.keys = keys;
                cache.fetched_at = Some(now);
                info!(source = %self.fetcher.source(), keys = count, "signing key set refreshed");
                Ok(count)
            }
            Err(err) => {
                warn!(source = %self.fetcher.source(), error = %err, "signing key set refresh failed");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl KeyProvider for JwksKeyProvider {
    async fn signing_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeyProviderError> {
        let observed = {
            let cache = self.read();
            if cache.is_fresh(self.ttl)
                && let Some(key) = cache.keys.get(kid)
            {
                return Ok(key.clone());
            }
            cache.attempts
        };

        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.read();

            if cache.attempts != observed {
                // Another task refreshed while we waited; its result is as fresh as ours would be.
                debug!(kid, "key lookup served by concurrent refresh");
                return match cache.keys.get(kid) {
                    Some(key) if cache.is_fresh(self.ttl) => Ok(key.clone()),
                    _ => Err(KeyProviderError::UnknownKey {
                        kid: kid.to_string(),
                    }),
                };
            }

            // A failed attempt throttles regardless of freshness so an unreachable issuer
            // is not retried on every miss.
            let throttled = (cache.is_fresh(self.ttl) || cache.last_attempt_failed)
                && cache
                    .last_attempt
                    .is_some_and(|at| at.elapsed() < self.min_refresh_interval);
            if throttled {
                debug!(kid, "forced key refresh throttled");
                return Err(KeyProviderError::UnknownKey {
                    kid: kid.to_string(),
                });
            }
        }

        self.refresh_locked().await?;

        self.read()
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| KeyProviderError::UnknownKey {
                kid: kid.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::test_support::{ScriptedFetcher, TestKey};

    fn provider(fetcher: Arc<ScriptedFetcher>, min_refresh: Duration) -> Arc<JwksKeyProvider> {
        Arc::new(JwksKeyProvider::new(fetcher, DEFAULT_CACHE_TTL, min_refresh))
    }

    #[tokio::test]
    async fn first_lookup_fetches_then_serves_from_cache() {
        let key = TestKey::new("k1", 1);
        let fetcher = ScriptedFetcher::serving(vec![key.jwk()]);
        let provider = provider(fetcher.clone(), Duration::ZERO);

        let found = provider.signing_key("k1").await.unwrap();
        assert_eq!(found.kid, "k1");
        provider.signing_key("k1").await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cached_keys(), 1);
    }

    #[tokio::test]
    async fn unknown_kid_after_forced_refresh_is_reported() {
        let fetcher = ScriptedFetcher::serving(vec![TestKey::new("k1", 1).jwk()]);
        let provider = provider(fetcher.clone(), Duration::ZERO);
        provider.refresh().await.unwrap();

        let err = provider.signing_key("other").await.unwrap_err();

        assert!(matches!(err, KeyProviderError::UnknownKey { ref kid } if kid == "other"));
        // warm-up + exactly one forced refresh
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rotated_key_is_picked_up_by_forced_refresh() {
        let old = TestKey::new("old", 1);
        let new = TestKey::new("new", 2);
        let fetcher = ScriptedFetcher::serving(vec![old.jwk()]);
        let provider = provider(fetcher.clone(), Duration::ZERO);
        provider.refresh().await.unwrap();

        fetcher.set_keys(vec![new.jwk()]);

        assert_eq!(provider.signing_key("new").await.unwrap().kid, "new");
        assert!(provider.signing_key("old").await.is_err());
    }

    #[tokio::test]
    async fn forced_refresh_is_throttled() {
        let fetcher = ScriptedFetcher::serving(vec![TestKey::new("k1", 1).jwk()]);
        let provider = provider(fetcher.clone(), Duration::from_secs(60));
        provider.refresh().await.unwrap();

        for kid in ["a", "b", "c"] {
            assert!(provider.signing_key(kid).await.is_err());
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_keys() {
        let fetcher = ScriptedFetcher::serving(vec![TestKey::new("k1", 1).jwk()]);
        let provider = provider(fetcher.clone(), Duration::ZERO);
        provider.refresh().await.unwrap();

        fetcher.fail.store(true, Ordering::SeqCst);

        let err = provider.signing_key("missing").await.unwrap_err();
        assert!(matches!(err, KeyProviderError::Fetch(_)));
        assert!(provider.signing_key("k1").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_issuer_is_not_refetched_on_every_miss() {
        let fetcher = ScriptedFetcher::serving(vec![TestKey::new("k1", 1).jwk()]);
        fetcher.fail.store(true, Ordering::SeqCst);
        let provider = provider(fetcher.clone(), DEFAULT_MIN_REFRESH_INTERVAL);

        for n in 0..20 {
            assert!(provider.signing_key(&format!("rand{n}")).await.is_err());
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        // Retried once the interval has passed, and recovers.
        fetcher.fail.store(false, Ordering::SeqCst);
        tokio::time::advance(DEFAULT_MIN_REFRESH_INTERVAL + Duration::from_secs(1)).await;

        assert!(provider.signing_key("k1").await.is_ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_of_stale_set_backs_off() {
        let fetcher = ScriptedFetcher::serving(vec![TestKey::new("k1", 1).jwk()]);
        let provider = Arc::new(JwksKeyProvider::new(
            fetcher.clone(),
            Duration::from_secs(10),
            Duration::from_secs(30),
        ));
        provider.refresh().await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        fetcher.fail.store(true, Ordering::SeqCst);

        for _ in 0..5 {
            assert!(provider.signing_key("k1").await.is_err());
        }
        // warm-up + one failed refresh of the stale set
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_set_is_refetched_after_ttl() {
        let fetcher = ScriptedFetcher::serving(vec![TestKey::new("k1", 1).jwk()]);
        let provider = Arc::new(JwksKeyProvider::new(
            fetcher.clone(),
            Duration::from_secs(10),
            Duration::from_secs(60),
        ));

        provider.signing_key("k1").await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        provider.signing_key("k1").await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_share_one_fetch() {
        let key = TestKey::new("shared", 1);
        let fetcher = ScriptedFetcher::slow(vec![key.jwk()], Duration::from_millis(50));
        let provider = provider(fetcher.clone(), Duration::ZERO);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let provider = provider.clone();
            handles.push(tokio::spawn(async move { provider.signing_key("shared").await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_for_absent_kid_share_one_fetch() {
        let fetcher = ScriptedFetcher::slow(vec![TestKey::new("k1", 1).jwk()], Duration::from_millis(50));
        let provider = provider(fetcher.clone(), Duration::from_secs(60));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let provider = provider.clone();
            handles.push(tokio::spawn(async move { provider.signing_key("ghost").await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
