use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::CacheSettings;

use super::entry::{RegisteredEntry, StoredValue};
use super::{CacheContents, CacheEntry, CacheError, CacheKey};

type Store = moka::future::Cache<CacheKey, StoredValue>;

/// A [`moka::Expiry`] implementing sliding expiration: every successful read
/// extends the entry's lifetime by its own window, counted from "now".
struct SlidingExpiration;

impl moka::Expiry<CacheKey, StoredValue> for SlidingExpiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_in)
    }

    fn expire_after_read(
        &self,
        _key: &CacheKey,
        value: &StoredValue,
        _read_at: Instant,
        _duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_in)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_in)
    }
}

/// Why a populate attempt did not insert a value.
#[derive(Debug)]
enum PopulateMiss {
    /// The supplier produced a valid empty result.
    Empty,
    /// The supplier failed.
    Error(CacheError),
}

/// The process-local cache provider.
///
/// Values are stored in their serialized form with sliding expiration; the
/// typed decode happens at the call site. Concurrent misses on the same key
/// are coalesced so the supplier runs at most once per population event.
///
/// The provider also keeps a registry of the most recently seen entry
/// definition per key, which drives [`refresh`](Self::refresh) and the
/// background [`refresh_all`](Self::refresh_all) sweep without the caller
/// having to re-register anything.
pub struct InMemoryCacheProvider {
    store: Store,
    pub(super) registry: Mutex<HashMap<CacheKey, RegisteredEntry>>,
    /// Skip the store and always invoke the supplier (restricted contexts).
    bypass: bool,
}

impl std::fmt::Debug for InMemoryCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered = self
            .registry
            .try_lock()
            .map(|r| r.len())
            .unwrap_or_default();
        f.debug_struct("InMemoryCacheProvider")
            .field("stored values", &self.store.entry_count())
            .field("registered entries", &registered)
            .field("bypass", &self.bypass)
            .finish()
    }
}

impl InMemoryCacheProvider {
    pub fn new(settings: &CacheSettings) -> Self {
        let store = Store::builder()
            .max_capacity(settings.capacity)
            .name("eventcache")
            .expire_after(SlidingExpiration)
            .build();

        Self {
            store,
            registry: Mutex::new(HashMap::new()),
            bypass: settings.bypass,
        }
    }

    /// Returns `true` iff the store currently holds a non-expired value for
    /// `key`.
    ///
    /// This is not a read in the sliding-expiration sense; it does not extend
    /// the entry's lifetime.
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.store.contains_key(key)
    }

    /// Returns the cached value for the entry's key, populating it through
    /// the supplier on a miss.
    ///
    /// The entry definition is recorded in the registry first, regardless of
    /// whether population succeeds. A hit extends the sliding expiration; a
    /// miss runs the supplier once (concurrent misses for the same key share
    /// the one computation) and stores the value unless it was empty.
    pub async fn get_or_add<V>(
        &self,
        entry: CacheEntry<V>,
        token: CancellationToken,
    ) -> CacheContents<Option<V>>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
    {
        let registered = entry.to_registered();
        let key = registered.key.clone();
        self.registry
            .lock()
            .unwrap()
            .insert(key.clone(), registered.clone());

        // Restricted contexts always pay the supplier cost so reads stay
        // deterministic.
        if self.bypass {
            return entry.supply(token).await;
        }

        metric!(counter("caches.access") += 1);

        let result = self
            .store
            .entry_by_ref(&key)
            .or_try_insert_with(populate(&registered, token))
            .await;

        match result {
            Ok(stored) => {
                if !stored.is_fresh() {
                    metric!(counter("caches.hit") += 1);
                }
                stored.into_value().decode().map(Some)
            }
            Err(miss) => match miss.as_ref() {
                PopulateMiss::Empty => Ok(None),
                PopulateMiss::Error(err) => Err(err.clone()),
            },
        }
    }

    /// Unconditionally re-supplies `key`, overwriting the stored value on a
    /// non-empty success.
    ///
    /// A key never seen by [`get_or_add`](Self::get_or_add) is a silent
    /// no-op, since the caller may race with first-ever population.
    pub async fn refresh(&self, key: &CacheKey, token: CancellationToken) -> CacheContents<()> {
        let Some(entry) = self.registry.lock().unwrap().get(key).cloned() else {
            return Ok(());
        };

        if let Some(data) = (entry.supply)(token).await? {
            self.store
                .insert(key.clone(), StoredValue::new(data, entry.expires_in))
                .await;
        }
        Ok(())
    }

    /// Repopulates every registered auto-refresh entry that has gone cold.
    ///
    /// Entries that still hold a valid value, or that did not opt into
    /// auto-refresh, are left untouched. All entries are attempted even if
    /// some fail; the first failure is reported after the sweep.
    pub async fn refresh_all(&self, token: CancellationToken) -> CacheContents<()> {
        let entries: Vec<_> = self.registry.lock().unwrap().values().cloned().collect();

        let mut first_error = None;
        for entry in entries {
            if !entry.auto_refresh {
                continue;
            }
            if self.store.contains_key(&entry.key) {
                continue;
            }

            tracing::info!(key = %entry.key, "Refreshing entry in cache");
            metric!(counter("caches.refresh") += 1);
            match (entry.supply)(token.clone()).await {
                Ok(Some(data)) => {
                    self.store
                        .insert(entry.key.clone(), StoredValue::new(data, entry.expires_in))
                        .await;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(
                        error = &err as &dyn std::error::Error,
                        key = %entry.key,
                        "Failed to refresh cache entry",
                    );
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Removes and returns the previously stored value, if any.
    pub async fn remove(&self, key: &CacheKey) -> Option<StoredValue> {
        self.store.remove(key).await
    }
}

/// Runs the supplier once for a missing key.
async fn populate(
    entry: &RegisteredEntry,
    token: CancellationToken,
) -> Result<StoredValue, PopulateMiss> {
    metric!(counter("caches.computation") += 1);
    match (entry.supply)(token).await {
        Ok(Some(data)) => Ok(StoredValue::new(data, entry.expires_in)),
        Ok(None) => Err(PopulateMiss::Empty),
        Err(err) => Err(PopulateMiss::Error(err)),
    }
}
