use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::caching::CacheProvider;
use crate::config::JobSettings;

use super::Job;

/// Keeps auto-refresh cache entries warm by sweeping the provider registry.
///
/// The sweep only repopulates entries whose value has expired or was never
/// stored, so a tight interval is cheap when the cache is warm.
pub struct RefreshCachesJob {
    provider: Arc<CacheProvider>,
    interval: Duration,
}

impl RefreshCachesJob {
    pub fn new(provider: Arc<CacheProvider>, settings: &JobSettings) -> Self {
        Self {
            provider,
            interval: settings.refresh_caches_interval,
        }
    }
}

impl Job for RefreshCachesJob {
    fn name(&self) -> &'static str {
        "refresh-caches"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn run(&self, token: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.provider.refresh_all(token).await?;
            Ok(())
        })
    }
}
