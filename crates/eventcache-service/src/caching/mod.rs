//! Core caching functionality.
//!
//! The cache is organized around three ideas:
//!
//! - A [`CacheEntry`] describes one cacheable computation: a stable
//!   [`CacheKey`], a sliding expiration window, an async supplier closure that
//!   recomputes the value from its source of truth, and an opt-in flag for
//!   background refresh. Entries are cheap to build and are constructed at
//!   each call site.
//! - A [`CacheProvider`] serves those entries. The in-process backend keeps
//!   serialized values in a bounded [`moka`] cache with sliding expiration and
//!   coalesces concurrent misses per key; a remote backend exists as a
//!   configuration target but serves no operations yet. Which backend runs is
//!   decided once at startup by [`CacheProvider::from_config`].
//! - Every value that passes through the provider is serialized, so the
//!   registry driving background refresh is type-erased. The typed decode
//!   happens at the call site, where the value type is statically known.
//!
//! Failures are represented as a [`CacheError`], with the convenience alias
//! [`CacheContents`] used throughout. An `Ok(None)` result is a valid empty
//! value and is never stored; an `Err` is likewise never stored, so the next
//! access retries the supplier.

mod cache_error;
mod cache_key;
mod entry;
mod memory;
mod provider;
mod remote;

pub use cache_error::{CacheContents, CacheError};
pub use cache_key::{CacheKey, EntryScope};
pub use entry::{CacheEntry, StoredValue, Supplier};
pub use memory::InMemoryCacheProvider;
pub use provider::CacheProvider;
pub use remote::RemoteCacheProvider;
