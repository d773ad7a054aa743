use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::config::JobSettings;

use super::Job;

/// Read side of the leaderboard refresh: per-user activity counts over a
/// trailing window.
pub trait ActivityStats: Send + Sync + 'static {
    fn count_activity_by_user(
        &self,
        window: Duration,
        token: CancellationToken,
    ) -> BoxFuture<'_, anyhow::Result<HashMap<String, u64>>>;
}

/// Write side of the leaderboard refresh: the precomputed top-users listing.
pub trait LeaderboardStore: Send + Sync + 'static {
    fn batch_update_top_users(
        &self,
        scores: HashMap<String, u64>,
        token: CancellationToken,
    ) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Recomputes the most-active-users aggregate from raw activity counts.
///
/// The aggregation is expensive and writes a shared listing, so the job is
/// exclusive: a run that outlasts the interval suppresses the next one
/// instead of competing with it.
pub struct RefreshLeaderboardJob {
    stats: Arc<dyn ActivityStats>,
    store: Arc<dyn LeaderboardStore>,
    interval: Duration,
    window: Duration,
}

impl RefreshLeaderboardJob {
    pub fn new(
        stats: Arc<dyn ActivityStats>,
        store: Arc<dyn LeaderboardStore>,
        settings: &JobSettings,
    ) -> Self {
        Self {
            stats,
            store,
            interval: settings.leaderboard_interval,
            window: settings.leaderboard_window,
        }
    }
}

impl Job for RefreshLeaderboardJob {
    fn name(&self) -> &'static str {
        "refresh-leaderboard"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn exclusive(&self) -> bool {
        true
    }

    fn run(&self, token: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let scores = self
                .stats
                .count_activity_by_user(self.window, token.clone())
                .await?;
            tracing::info!(users = scores.len(), "Recomputed leaderboard scores");
            self.store.batch_update_top_users(scores, token).await?;
            Ok(())
        })
    }
}
