use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::{CacheBackend, CacheSettings};

use super::entry::StoredValue;
use super::memory::InMemoryCacheProvider;
use super::remote::RemoteCacheProvider;
use super::{CacheContents, CacheEntry, CacheKey};

/// The cache backend serving all cacheable computations of the process.
///
/// Which variant is constructed is a pure function of [`CacheSettings`], via
/// [`CacheProvider::from_config`]. All operations dispatch exhaustively so a
/// new backend cannot be added without deciding its behavior for each one.
#[derive(Debug)]
pub enum CacheProvider {
    InMemory(InMemoryCacheProvider),
    Remote(RemoteCacheProvider),
}

impl CacheProvider {
    /// Selects and constructs the backend from the cache settings.
    ///
    /// The selection flag is the only input; the credential is passed through
    /// to the remote backend unexamined. A misconfigured remote backend shows
    /// up as [`CacheError::BackendUnavailable`](super::CacheError) on every
    /// operation instead of silently degrading to the in-process store.
    pub fn from_config(settings: &CacheSettings) -> Self {
        match settings.backend {
            CacheBackend::Remote => {
                tracing::info!("Using remote cache backend");
                Self::Remote(RemoteCacheProvider::new(settings))
            }
            CacheBackend::InMemory => Self::InMemory(InMemoryCacheProvider::new(settings)),
        }
    }

    /// Whether a non-expired value is currently stored for `key`.
    ///
    /// Checking is not a read; it does not extend a sliding expiration.
    pub fn contains_key(&self, key: &CacheKey) -> CacheContents<bool> {
        match self {
            Self::InMemory(provider) => Ok(provider.contains_key(key)),
            Self::Remote(provider) => provider.contains_key(key),
        }
    }

    /// Returns the cached value for the entry's key, populating it through
    /// the entry's supplier on a miss.
    pub async fn get_or_add<V>(
        &self,
        entry: CacheEntry<V>,
        token: CancellationToken,
    ) -> CacheContents<Option<V>>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
    {
        match self {
            Self::InMemory(provider) => provider.get_or_add(entry, token).await,
            Self::Remote(provider) => provider.get_or_add(entry, token).await,
        }
    }

    /// Unconditionally re-supplies `key`, overwriting the stored value on a
    /// non-empty success. Unknown keys are a no-op.
    pub async fn refresh(&self, key: &CacheKey, token: CancellationToken) -> CacheContents<()> {
        match self {
            Self::InMemory(provider) => provider.refresh(key, token).await,
            Self::Remote(provider) => provider.refresh(key, token).await,
        }
    }

    /// Repopulates every registered auto-refresh entry whose value has
    /// expired or was never stored.
    pub async fn refresh_all(&self, token: CancellationToken) -> CacheContents<()> {
        match self {
            Self::InMemory(provider) => provider.refresh_all(token).await,
            Self::Remote(provider) => provider.refresh_all(token).await,
        }
    }

    /// Removes and returns the previously stored value, if any.
    pub async fn remove(&self, key: &CacheKey) -> CacheContents<Option<StoredValue>> {
        match self {
            Self::InMemory(provider) => Ok(provider.remove(key).await),
            Self::Remote(provider) => provider.remove(key).await,
        }
    }
}
