use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::config::JobSettings;

use super::Job;

/// One record the cleanup sweep considers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepRecord {
    pub id: String,
    /// Whether the owning record has been archived. Live records keep their
    /// resources.
    pub archived: bool,
}

/// Enumerates cleanup candidates and persists their progress.
pub trait SweepStore: Send + Sync + 'static {
    /// All records whose resources have not been cleaned up yet.
    fn list_pending(
        &self,
        token: CancellationToken,
    ) -> BoxFuture<'_, anyhow::Result<Vec<SweepRecord>>>;

    /// Marks `id` as cleaned so later sweeps skip it.
    fn mark_cleaned<'a>(
        &'a self,
        id: &'a str,
        token: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Tears down the external resources belonging to one record.
pub trait EnvironmentCleaner: Send + Sync + 'static {
    fn clean<'a>(
        &'a self,
        id: &'a str,
        token: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Sweeps archived records and tears down their external resources.
///
/// A record is only marked cleaned after its teardown succeeded, so an
/// interrupted or partially failed sweep picks up exactly the remaining
/// records on the next run. Records that are still live are left alone until
/// they are archived.
pub struct CleanupSweepJob {
    store: Arc<dyn SweepStore>,
    cleaner: Arc<dyn EnvironmentCleaner>,
    interval: Duration,
}

impl CleanupSweepJob {
    pub fn new(
        store: Arc<dyn SweepStore>,
        cleaner: Arc<dyn EnvironmentCleaner>,
        settings: &JobSettings,
    ) -> Self {
        Self {
            store,
            cleaner,
            interval: settings.cleanup_interval,
        }
    }

    async fn sweep(&self, token: CancellationToken) -> anyhow::Result<()> {
        let pending = self.store.list_pending(token.clone()).await?;

        let mut first_error = None;
        for record in pending {
            if !record.archived {
                continue;
            }

            tracing::info!(id = %record.id, "Cleaning up archived record");
            let result = async {
                self.cleaner.clean(&record.id, token.clone()).await?;
                self.store.mark_cleaned(&record.id, token.clone()).await
            }
            .await;

            if let Err(error) = result {
                tracing::error!(id = %record.id, "Cleanup failed: {error:?}");
                metric!(counter("jobs.cleanup.failed") += 1);
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Job for CleanupSweepJob {
    fn name(&self) -> &'static str {
        "cleanup-sweep"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn exclusive(&self) -> bool {
        true
    }

    fn run(&self, token: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(self.sweep(token))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// A store over a fixed record set that tracks which ids were marked.
    #[derive(Default)]
    struct FakeStore {
        records: Mutex<HashMap<String, SweepRecord>>,
    }

    impl FakeStore {
        fn with_records(records: impl IntoIterator<Item = (&'static str, bool)>) -> Arc<Self> {
            let records = records
                .into_iter()
                .map(|(id, archived)| {
                    (
                        id.to_owned(),
                        SweepRecord {
                            id: id.to_owned(),
                            archived,
                        },
                    )
                })
                .collect();
            Arc::new(Self {
                records: Mutex::new(records),
            })
        }
    }

    impl SweepStore for FakeStore {
        fn list_pending(
            &self,
            _token: CancellationToken,
        ) -> BoxFuture<'_, anyhow::Result<Vec<SweepRecord>>> {
            Box::pin(async move {
                let mut pending: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
                pending.sort_by(|a, b| a.id.cmp(&b.id));
                Ok(pending)
            })
        }

        fn mark_cleaned<'a>(
            &'a self,
            id: &'a str,
            _token: CancellationToken,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                self.records.lock().unwrap().remove(id);
                Ok(())
            })
        }
    }

    /// Counts teardown calls per id and fails the ids it is told to fail.
    #[derive(Default)]
    struct FakeCleaner {
        cleaned: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl EnvironmentCleaner for FakeCleaner {
        fn clean<'a>(
            &'a self,
            id: &'a str,
            _token: CancellationToken,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                if self.failing.iter().any(|f| f == id) {
                    anyhow::bail!("teardown of {id} failed");
                }
                self.cleaned.lock().unwrap().push(id.to_owned());
                Ok(())
            })
        }
    }

    fn job(store: &Arc<FakeStore>, cleaner: &Arc<FakeCleaner>) -> CleanupSweepJob {
        CleanupSweepJob::new(
            Arc::clone(store) as Arc<dyn SweepStore>,
            Arc::clone(cleaner) as Arc<dyn EnvironmentCleaner>,
            &JobSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_cleans_archived_records_only() {
        eventcache_test::setup();

        let store = FakeStore::with_records([("alpha", true), ("beta", false), ("gamma", true)]);
        let cleaner = Arc::new(FakeCleaner::default());

        job(&store, &cleaner)
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            cleaner.cleaned.lock().unwrap().as_slice(),
            &["alpha", "gamma"]
        );
        // The live record stays pending until it is archived.
        let remaining: Vec<_> = store.records.lock().unwrap().keys().cloned().collect();
        assert_eq!(remaining, vec!["beta"]);
    }

    #[tokio::test]
    async fn test_cleaned_records_are_not_revisited() {
        eventcache_test::setup();

        let store = FakeStore::with_records([("alpha", true)]);
        let cleaner = Arc::new(FakeCleaner::default());
        let job = job(&store, &cleaner);

        job.run(CancellationToken::new()).await.unwrap();
        job.run(CancellationToken::new()).await.unwrap();

        assert_eq!(cleaner.cleaned.lock().unwrap().as_slice(), &["alpha"]);
    }

    #[tokio::test]
    async fn test_failed_cleanup_is_retried_next_sweep() {
        eventcache_test::setup();

        let store = FakeStore::with_records([("alpha", true), ("beta", true)]);
        let cleaner = Arc::new(FakeCleaner {
            cleaned: Mutex::default(),
            failing: vec!["alpha".to_owned()],
        });

        // The failure must not stop the sweep, and the failed record must
        // stay pending.
        let result = job(&store, &cleaner).run(CancellationToken::new()).await;
        assert!(result.is_err());
        assert_eq!(cleaner.cleaned.lock().unwrap().as_slice(), &["beta"]);
        assert!(store.records.lock().unwrap().contains_key("alpha"));

        // Once the teardown recovers, the next sweep finishes the job.
        let cleaner = Arc::new(FakeCleaner::default());
        job(&store, &cleaner)
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(cleaner.cleaned.lock().unwrap().as_slice(), &["alpha"]);
        assert!(store.records.lock().unwrap().is_empty());
    }
}
