use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::{CacheContents, CacheError, CacheKey};

/// The asynchronous, fallible computation that (re)computes a cacheable value
/// from its source of truth.
///
/// Returning `Ok(None)` means "valid empty result"; it is surfaced to the
/// caller but never stored. Cancellation must surface as
/// [`CacheError::Cancelled`], never as `Ok(None)`.
pub type Supplier<V> =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, CacheContents<Option<V>>> + Send + Sync>;

/// Describes one cacheable computation: a stable key, a sliding expiration,
/// the supplier, and whether the entry opts into background refresh.
///
/// Entries are immutable after construction and are built at each call site.
/// Requesting the same key again with a different entry supersedes the
/// previous definition in the provider's registry.
pub struct CacheEntry<V> {
    key: CacheKey,
    expires_in: Duration,
    supplier: Supplier<V>,
    auto_refresh: bool,
}

impl<V> fmt::Debug for CacheEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("expires_in", &self.expires_in)
            .field("auto_refresh", &self.auto_refresh)
            .finish()
    }
}

impl<V> CacheEntry<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    /// Creates an entry with sliding expiration `expires_in` and background
    /// refresh disabled.
    pub fn new<F>(key: CacheKey, expires_in: Duration, supplier: F) -> Self
    where
        F: Fn(CancellationToken) -> BoxFuture<'static, CacheContents<Option<V>>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            key,
            expires_in,
            supplier: Arc::new(supplier),
            auto_refresh: false,
        }
    }

    /// Marks this entry as eligible for background repopulation when it has
    /// gone cold.
    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// Invokes the supplier, turning cancellation into a failure.
    pub(super) fn supply(&self, token: CancellationToken) -> BoxFuture<'static, CacheContents<Option<V>>> {
        supply_guarded(Arc::clone(&self.supplier), token)
    }

    /// Type-erases this entry for the provider registry.
    ///
    /// The registry deals in serialized payloads only, so background refresh
    /// never needs to know the value type; the typed decode happens at the
    /// call site in `get_or_add`.
    pub(super) fn to_registered(&self) -> RegisteredEntry {
        let supplier = Arc::clone(&self.supplier);
        let supply: ByteSupplier = Arc::new(move |token| {
            let fut = supply_guarded(Arc::clone(&supplier), token);
            Box::pin(async move {
                match fut.await? {
                    Some(value) => {
                        let data =
                            serde_json::to_vec(&value).map_err(CacheError::from_std_error)?;
                        Ok(Some(Arc::from(data.into_boxed_slice())))
                    }
                    None => Ok(None),
                }
            })
        });

        RegisteredEntry {
            key: self.key.clone(),
            expires_in: self.expires_in,
            auto_refresh: self.auto_refresh,
            supply,
        }
    }
}

fn supply_guarded<V>(
    supplier: Supplier<V>,
    token: CancellationToken,
) -> BoxFuture<'static, CacheContents<Option<V>>>
where
    V: Send + 'static,
{
    Box::pin(async move {
        let fut = (supplier)(token.clone());
        tokio::select! {
            _ = token.cancelled() => Err(CacheError::Cancelled),
            contents = fut => contents,
        }
    })
}

/// A type-erased supplier producing the serialized payload.
pub(super) type ByteSupplier = Arc<
    dyn Fn(CancellationToken) -> BoxFuture<'static, CacheContents<Option<Arc<[u8]>>>>
        + Send
        + Sync,
>;

/// The last entry definition seen for a key, as kept in the registry.
#[derive(Clone)]
pub(super) struct RegisteredEntry {
    pub key: CacheKey,
    pub expires_in: Duration,
    pub auto_refresh: bool,
    pub supply: ByteSupplier,
}

impl fmt::Debug for RegisteredEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredEntry")
            .field("key", &self.key)
            .field("expires_in", &self.expires_in)
            .field("auto_refresh", &self.auto_refresh)
            .finish()
    }
}

/// A value as kept in the store: the serialized payload plus the sliding
/// window it was inserted with.
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub(super) data: Arc<[u8]>,
    pub(super) expires_in: Duration,
}

impl StoredValue {
    pub(super) fn new(data: Arc<[u8]>, expires_in: Duration) -> Self {
        Self { data, expires_in }
    }

    /// Decodes the payload back into the typed value of the call site.
    pub fn decode<V: DeserializeOwned>(&self) -> CacheContents<V> {
        serde_json::from_slice(&self.data).map_err(|e| CacheError::Malformed(e.to_string()))
    }

    /// The raw serialized payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
