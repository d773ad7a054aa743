//! Brings up the cache provider and the background job scheduler.
use std::sync::Arc;

use anyhow::Result;

use eventcache_service::caching::CacheProvider;
use eventcache_service::config::Config;
use eventcache_service::jobs::{JobScheduler, RefreshCachesJob};

/// Runs the service until it receives a shutdown signal.
pub fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let provider = Arc::new(CacheProvider::from_config(&config.cache));
        tracing::info!(?provider, "Cache provider ready");

        let mut scheduler = JobScheduler::new();
        scheduler.register(RefreshCachesJob::new(Arc::clone(&provider), &config.jobs));
        scheduler.start();
        tracing::info!("Job scheduler started");

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutting down");
        scheduler.shutdown();

        Ok(())
    })
}
