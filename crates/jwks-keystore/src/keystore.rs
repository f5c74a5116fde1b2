//! Signing-key resolution cache.
//!
//! A [`KeyStore`] owns the cached key set for one JWKS endpoint and
//! coordinates refreshes so that any number of concurrent token
//! validations trigger at most one HTTP fetch at a time.
//!
//! # Security
//!
//! - Keys are cached with a configurable TTL to pick up rotations without
//!   refetching on every verification
//! - [`KeyStore::key_for_header`] allow-lists RSA-family algorithms before
//!   any lookup, blocking algorithm-confusion tokens
//! - A failed refresh serves previously cached keys rather than rejecting
//!   every in-flight validation

use crate::config::KeyStoreConfig;
use crate::errors::KeyStoreError;
use crate::jwks::JwksClient;
use crate::keys::PublicKey;
use jsonwebtoken::{Algorithm, Header};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify, RwLock};

/// Future returned by the lookup closure from [`KeyStore::key_fn`].
pub type KeyLookupFuture =
    Pin<Box<dyn Future<Output = Result<Arc<PublicKey>, KeyStoreError>> + Send>>;

/// Key-resolution callback for generic JWT-parsing routines.
pub type KeyLookup = Box<dyn Fn(Header) -> KeyLookupFuture + Send + Sync>;

/// Cached key set with its freshness timestamp.
///
/// The map is swapped wholesale together with `fetched_at` under the write
/// lock, so readers see either the old complete set or the new complete
/// set, never a mix.
struct KeyCache {
    /// Map of key ID to public key.
    keys: Arc<HashMap<String, Arc<PublicKey>>>,

    /// When the current set was fetched; `None` until the first success.
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() <= ttl)
    }
}

/// Refresh coordination state, guarded by its own lock so steady-state
/// cache reads never contend with refresh bookkeeping.
struct RefreshState {
    /// Whether a fetch task is currently running.
    fetching: bool,

    /// Bumped once per completed fetch; waiters compare generations to
    /// recognize that the fetch they joined has finished.
    epoch: u64,

    /// Outcome of the most recent fetch, handed to every joined waiter.
    last_error: Option<KeyStoreError>,
}

struct Inner {
    client: JwksClient,
    cache_ttl: Duration,
    cache: RwLock<KeyCache>,
    refresh: Mutex<RefreshState>,
    refresh_notify: Notify,
}

/// Thread-safe signing-key cache for one JWKS endpoint.
///
/// Cheap to clone; clones share the same cache and refresh coordination.
#[derive(Clone)]
pub struct KeyStore {
    inner: Arc<Inner>,
}

impl KeyStore {
    /// Create a key store from its configuration.
    pub fn new(config: KeyStoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client: JwksClient::new(config.jwks_url, config.http_timeout),
                cache_ttl: config.cache_ttl,
                cache: RwLock::new(KeyCache {
                    keys: Arc::new(HashMap::new()),
                    fetched_at: None,
                }),
                refresh: Mutex::new(RefreshState {
                    fetching: false,
                    epoch: 0,
                    last_error: None,
                }),
                refresh_notify: Notify::new(),
            }),
        }
    }

    /// Create a key store with default TTL and timeout.
    pub fn from_url(jwks_url: impl Into<String>) -> Self {
        Self::new(KeyStoreConfig::new(jwks_url))
    }

    /// Resolve the public key for a key identifier.
    ///
    /// Serves from cache when fresh; otherwise triggers (or joins) a single
    /// in-flight refresh. If the refresh fails but the identifier was
    /// already cached from a prior fetch, the stale key is returned -
    /// availability is favored over strict freshness on transient failures.
    ///
    /// # Errors
    ///
    /// - `KeyStoreError::Fetch` if a refresh was required, failed, and no
    ///   previously cached key exists for `kid`
    /// - `KeyStoreError::UnknownKeyId` if the current JWKS document does
    ///   not contain `kid`; permanent, callers must not retry blindly
    pub async fn get_key(&self, kid: &str) -> Result<Arc<PublicKey>, KeyStoreError> {
        let (existing, fresh) = {
            let cache = self.inner.cache.read().await;
            (
                cache.keys.get(kid).cloned(),
                cache.is_fresh(self.inner.cache_ttl),
            )
        };

        if fresh {
            if let Some(key) = existing {
                return Ok(key);
            }
        }

        if let Err(err) = self.refresh().await {
            // Stale-key fallback for identifiers seen in a prior fetch
            return existing.ok_or(err);
        }

        let cache = self.inner.cache.read().await;
        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| KeyStoreError::UnknownKeyId(kid.to_string()))
    }

    /// Resolve the key for a parsed token header.
    ///
    /// Enforces the RSA-family algorithm allow-list and the presence of a
    /// `kid` claim before touching the cache or the network, then delegates
    /// to [`KeyStore::get_key`].
    ///
    /// # Errors
    ///
    /// `KeyStoreError::UnsupportedAlgorithm` for non-RSA algorithms,
    /// `KeyStoreError::MissingKeyId` for headers without a `kid`, plus the
    /// [`KeyStore::get_key`] errors.
    pub async fn key_for_header(&self, header: &Header) -> Result<Arc<PublicKey>, KeyStoreError> {
        if !matches!(
            header.alg,
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
        ) {
            return Err(KeyStoreError::UnsupportedAlgorithm(format!(
                "{:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(KeyStoreError::MissingKeyId)?;

        self.get_key(kid).await
    }

    /// Build a key-resolution callback for a generic JWT-parsing routine.
    ///
    /// This is the sanctioned integration surface for JWT libraries; the
    /// returned closure applies the same header checks as
    /// [`KeyStore::key_for_header`].
    #[must_use]
    pub fn key_fn(&self) -> KeyLookup {
        let store = self.clone();
        Box::new(move |header| {
            let store = store.clone();
            Box::pin(async move { store.key_for_header(&header).await })
        })
    }

    /// Release held resources.
    ///
    /// Currently a no-op reserved for a future background refresh
    /// scheduler. Safe to call any number of times.
    pub fn close(&self) -> Result<(), KeyStoreError> {
        Ok(())
    }

    /// Trigger a refresh, or join the one already in flight.
    ///
    /// Every caller that joins an in-flight fetch receives the outcome of
    /// that fetch, never a second attempt. The fetch itself runs in a
    /// spawned task, so cancelling one waiter cannot cancel a fetch other
    /// waiters share.
    async fn refresh(&self) -> Result<(), KeyStoreError> {
        let inner = &self.inner;
        let mut joined_epoch: Option<u64> = None;

        loop {
            // Arm the waiter before inspecting state so a completion
            // between the check and the await cannot be missed.
            let notified = inner.refresh_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = inner.refresh.lock().await;

                if let Some(epoch) = joined_epoch {
                    if state.epoch != epoch {
                        // The fetch this caller joined has completed
                        return match &state.last_error {
                            None => Ok(()),
                            Some(err) => Err(err.clone()),
                        };
                    }
                }

                if state.fetching {
                    joined_epoch.get_or_insert(state.epoch);
                } else {
                    // A fetch that completed while this caller queued for
                    // the lock may already have refreshed the cache.
                    if inner.cache.read().await.is_fresh(inner.cache_ttl) {
                        return Ok(());
                    }

                    state.fetching = true;
                    joined_epoch = Some(state.epoch);
                    tokio::spawn(Arc::clone(inner).run_fetch());
                }
            }

            notified.await;
        }
    }
}

impl Inner {
    /// Perform one fetch cycle: HTTP + decode outside all locks, publish
    /// the new set and freshness timestamp together under the write lock,
    /// then record the outcome and wake every waiter.
    async fn run_fetch(self: Arc<Self>) {
        let outcome = match self.client.fetch_keys().await {
            Ok(keys) => {
                tracing::debug!(
                    target: "keystore.cache",
                    key_count = keys.len(),
                    "Key cache refreshed"
                );
                let mut cache = self.cache.write().await;
                cache.keys = Arc::new(keys);
                cache.fetched_at = Some(Instant::now());
                None
            }
            Err(err) => {
                tracing::warn!(target: "keystore.cache", error = %err, "Key refresh failed");
                Some(err)
            }
        };

        {
            let mut state = self.refresh.lock().await;
            state.fetching = false;
            state.epoch = state.epoch.wrapping_add(1);
            state.last_error = outcome;
        }
        self.refresh_notify.notify_waiters();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_cache_freshness() {
        let cache = KeyCache {
            keys: Arc::new(HashMap::new()),
            fetched_at: None,
        };
        assert!(!cache.is_fresh(Duration::from_secs(3600)));

        let cache = KeyCache {
            keys: Arc::new(HashMap::new()),
            fetched_at: Some(Instant::now()),
        };
        assert!(cache.is_fresh(Duration::from_secs(3600)));
        assert!(!cache.is_fresh(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_key_for_header_rejects_hmac_algorithm() {
        let store = KeyStore::from_url("http://localhost:1/.well-known/jwks.json");
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_string());

        let result = store.key_for_header(&header).await;
        assert!(matches!(
            result,
            Err(KeyStoreError::UnsupportedAlgorithm(alg)) if alg == "HS256"
        ));
    }

    #[tokio::test]
    async fn test_key_for_header_rejects_missing_kid() {
        let store = KeyStore::from_url("http://localhost:1/.well-known/jwks.json");
        let header = Header::new(Algorithm::RS256);

        let result = store.key_for_header(&header).await;
        assert!(matches!(result, Err(KeyStoreError::MissingKeyId)));
    }

    #[tokio::test]
    async fn test_key_for_header_rejects_empty_kid() {
        let store = KeyStore::from_url("http://localhost:1/.well-known/jwks.json");
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(String::new());

        let result = store.key_for_header(&header).await;
        assert!(matches!(result, Err(KeyStoreError::MissingKeyId)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = KeyStore::from_url("http://localhost:1/.well-known/jwks.json");
        assert!(store.close().is_ok());
        assert!(store.close().is_ok());
    }
}
