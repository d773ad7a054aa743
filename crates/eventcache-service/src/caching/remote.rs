use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::CacheSettings;

use super::entry::StoredValue;
use super::{CacheContents, CacheEntry, CacheError, CacheKey};

/// The shared, out-of-process cache provider.
///
/// This backend can be selected through configuration so deployments can
/// commit to the shared topology ahead of time, but no operation is wired up
/// yet: every call fails with [`CacheError::BackendUnavailable`]. Nothing is
/// ever silently degraded to the in-process store.
pub struct RemoteCacheProvider {
    /// Kept for the eventual connection handshake.
    #[allow(dead_code)]
    credential: Option<String>,
}

impl std::fmt::Debug for RemoteCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCacheProvider")
            .field("credential", &self.credential.as_deref().map(|_| "<set>"))
            .finish()
    }
}

impl RemoteCacheProvider {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            credential: settings.remote_credential.clone(),
        }
    }

    fn unavailable() -> CacheError {
        CacheError::BackendUnavailable("remote cache backend is not implemented".into())
    }

    pub fn contains_key(&self, _key: &CacheKey) -> CacheContents<bool> {
        Err(Self::unavailable())
    }

    pub async fn get_or_add<V>(
        &self,
        _entry: CacheEntry<V>,
        _token: CancellationToken,
    ) -> CacheContents<Option<V>>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
    {
        Err(Self::unavailable())
    }

    pub async fn refresh(&self, _key: &CacheKey, _token: CancellationToken) -> CacheContents<()> {
        Err(Self::unavailable())
    }

    pub async fn refresh_all(&self, _token: CancellationToken) -> CacheContents<()> {
        Err(Self::unavailable())
    }

    pub async fn remove(&self, _key: &CacheKey) -> CacheContents<Option<StoredValue>> {
        Err(Self::unavailable())
    }
}
