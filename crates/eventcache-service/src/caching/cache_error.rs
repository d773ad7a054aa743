use thiserror::Error;

/// An error that happens when populating or serving a cache entry.
///
/// This error enum is the boundary between the cache engine and its callers:
/// provider operations surface it directly, the job scheduler swallows and
/// logs it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The supplier failed to produce a value.
    ///
    /// The attached string contains the supplier's error message. A failed
    /// supply is never stored.
    #[error("supply failed: {0}")]
    SupplyFailed(String),
    /// The supplier was cancelled before it produced a value.
    ///
    /// Cancellation is a failure, not an empty result; an empty result means
    /// "valid empty value" and is handled separately.
    #[error("cancelled")]
    Cancelled,
    /// A stored value could not be decoded back into its typed form.
    ///
    /// This happens when two call sites use the same key with different value
    /// types. Key uniqueness is the caller's responsibility.
    #[error("malformed: {0}")]
    Malformed(String),
    /// The selected cache backend cannot serve the operation.
    ///
    /// This is a deployment/configuration error, fatal to the operation. It is
    /// never retried by the provider.
    #[error("cache backend unavailable: {0}")]
    BackendUnavailable(String),
    /// An unexpected error in the cache engine itself.
    #[error("internal error")]
    InternalError,
}

impl CacheError {
    #[track_caller]
    pub fn from_std_error<E: std::error::Error + 'static>(e: E) -> Self {
        let dynerr: &dyn std::error::Error = &e; // tracing expects a `&dyn Error`
        tracing::error!(error = dynerr);
        Self::InternalError
    }
}

/// The contents of a cache operation, either `Ok(T)` or an error denoting the
/// reason why a value could not be supplied or is otherwise unusable.
pub type CacheContents<T = ()> = Result<T, CacheError>;
