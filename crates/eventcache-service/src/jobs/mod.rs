//! Periodic background jobs and the scheduler driving them.
//!
//! A [`Job`] is one unit of recurring work with a stable name and an
//! interval. The [`JobScheduler`] runs each registered job on its own ticking
//! loop: the first run happens immediately at startup, missed ticks are
//! dropped rather than queued, and a failing or panicking run never takes the
//! loop down. Jobs that declare themselves exclusive skip a run while the
//! previous one is still in flight.
//!
//! The standard jobs are [`RefreshCachesJob`] (keeps auto-refresh cache
//! entries warm), [`RefreshLeaderboardJob`] (recomputes the most-active-users
//! aggregate) and [`CleanupSweepJob`] (tears down resources of archived
//! records).

mod cleanup;
mod leaderboard;
mod refresh;
mod scheduler;

pub use cleanup::{CleanupSweepJob, EnvironmentCleaner, SweepRecord, SweepStore};
pub use leaderboard::{ActivityStats, LeaderboardStore, RefreshLeaderboardJob};
pub use refresh::RefreshCachesJob;
pub use scheduler::{Job, JobScheduler};
