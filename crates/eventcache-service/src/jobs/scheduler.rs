use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// One unit of recurring background work.
pub trait Job: Send + Sync + 'static {
    /// A stable name, used in logs and metrics and for manual triggering.
    fn name(&self) -> &'static str;

    /// How often the job runs. The first run happens immediately at startup.
    fn interval(&self) -> Duration;

    /// Whether a run must be skipped while the previous one is in flight.
    fn exclusive(&self) -> bool {
        false
    }

    /// Performs one run. The token is cancelled on scheduler shutdown.
    fn run(&self, token: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>>;
}

struct ScheduledJob {
    job: Arc<dyn Job>,
    enabled: AtomicBool,
    running: AtomicBool,
}

impl ScheduledJob {
    async fn execute(&self, token: CancellationToken) {
        let name = self.job.name();

        // Only exclusive jobs track the in-flight flag; for everything else
        // overlapping runs are acceptable.
        if self.job.exclusive()
            && self
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            tracing::warn!(job = name, "Previous run still in progress, skipping");
            metric!(counter("jobs.skipped") += 1, "job" => name);
            return;
        }

        metric!(counter("jobs.execution") += 1, "job" => name);
        tracing::debug!(job = name, "Starting job run");
        let started = Instant::now();

        // The run gets its own task so a panicking job takes down neither the
        // ticking loop nor its sibling jobs.
        let job = Arc::clone(&self.job);
        let outcome = tokio::spawn(async move { job.run(token).await }).await;

        let elapsed = started.elapsed();
        metric!(timer("jobs.duration") = elapsed, "job" => name);

        match outcome {
            Ok(Ok(())) => tracing::debug!(job = name, "Job run finished in {elapsed:?}"),
            Ok(Err(error)) => {
                tracing::error!(job = name, "Job run failed: {error:?}");
                metric!(counter("jobs.failed") += 1, "job" => name);
            }
            Err(_) => {
                tracing::error!(job = name, "Job run panicked");
                metric!(counter("jobs.failed") += 1, "job" => name);
            }
        }

        if elapsed > self.job.interval() {
            tracing::warn!(
                job = name,
                "Job run took longer than its interval ({elapsed:?})"
            );
        }

        if self.job.exclusive() {
            self.running.store(false, Ordering::SeqCst);
        }
    }
}

/// Runs registered [`Job`]s on their configured intervals.
///
/// Jobs are registered up front, then [`start`](Self::start) spawns one
/// ticking loop per job onto the current runtime. Shutdown is cooperative: it
/// stops the loops and cancels the token handed to in-flight runs.
pub struct JobScheduler {
    jobs: Vec<Arc<ScheduledJob>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.jobs.iter().map(|e| e.job.name()).collect();
        f.debug_struct("JobScheduler").field("jobs", &names).finish()
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl JobScheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Adds a job; it starts ticking once [`start`](Self::start) is called.
    pub fn register(&mut self, job: impl Job) {
        self.jobs.push(Arc::new(ScheduledJob {
            job: Arc::new(job),
            enabled: AtomicBool::new(true),
            running: AtomicBool::new(false),
        }));
    }

    /// Spawns one ticking loop per registered job.
    ///
    /// Every job runs once immediately. When a run outlasts its interval the
    /// missed ticks are dropped, not queued, so a slow job is never hammered
    /// with a backlog afterwards.
    pub fn start(&self) {
        for entry in &self.jobs {
            let entry = Arc::clone(entry);
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(entry.job.interval());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    if !entry.enabled.load(Ordering::SeqCst) {
                        continue;
                    }
                    entry.execute(shutdown.child_token()).await;
                }
                tracing::debug!(job = entry.job.name(), "Job loop stopped");
            });
        }
    }

    /// Runs `name` once, right now, outside its schedule.
    ///
    /// Returns whether a job with that name is registered. Exclusivity and
    /// the enabled flag are honored the same way scheduled runs honor them.
    pub async fn trigger(&self, name: &str) -> bool {
        let Some(entry) = self.jobs.iter().find(|e| e.job.name() == name) else {
            return false;
        };
        if entry.enabled.load(Ordering::SeqCst) {
            entry.execute(self.shutdown.child_token()).await;
        }
        true
    }

    /// Enables or disables future runs of `name`; an in-flight run is not
    /// interrupted. Returns whether the job is registered.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.jobs.iter().find(|e| e.job.name() == name) {
            Some(entry) => {
                tracing::info!(job = name, enabled, "Toggling job");
                entry.enabled.store(enabled, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Stops all job loops and cancels in-flight runs.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::Notify;

    use super::*;

    /// A job driven entirely by the test: counts its runs and, if handed a
    /// gate, blocks in the middle of each run until released.
    struct TestJob {
        name: &'static str,
        interval: Duration,
        exclusive: bool,
        runs: Arc<AtomicUsize>,
        gate: Option<Arc<Gate>>,
        fail: bool,
    }

    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl Job for TestJob {
        fn name(&self) -> &'static str {
            self.name
        }

        fn interval(&self) -> Duration {
            self.interval
        }

        fn exclusive(&self) -> bool {
            self.exclusive
        }

        fn run(&self, _token: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                self.runs.fetch_add(1, Ordering::SeqCst);
                if let Some(gate) = &self.gate {
                    gate.entered.notify_one();
                    gate.release.notified().await;
                }
                if self.fail {
                    anyhow::bail!("boom");
                }
                Ok(())
            })
        }
    }

    fn counting_job(name: &'static str, interval: Duration, runs: Arc<AtomicUsize>) -> TestJob {
        TestJob {
            name,
            interval,
            exclusive: false,
            runs,
            gate: None,
            fail: false,
        }
    }

    #[tokio::test]
    async fn test_first_run_is_immediate() {
        eventcache_test::setup();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        scheduler.register(counting_job(
            "immediate",
            Duration::from_secs(3600),
            Arc::clone(&runs),
        ));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_runs_periodically() {
        eventcache_test::setup();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        scheduler.register(counting_job(
            "periodic",
            Duration::from_millis(50),
            Arc::clone(&runs),
        ));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(240)).await;
        scheduler.shutdown();

        let observed = runs.load(Ordering::SeqCst);
        assert!((3..=6).contains(&observed), "got {observed} runs");
    }

    #[tokio::test]
    async fn test_exclusive_run_is_skipped_while_in_flight() {
        eventcache_test::setup();

        let runs = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });

        let mut scheduler = JobScheduler::new();
        scheduler.register(TestJob {
            name: "exclusive",
            interval: Duration::from_secs(3600),
            exclusive: true,
            runs: Arc::clone(&runs),
            gate: Some(Arc::clone(&gate)),
            fail: false,
        });
        let scheduler = Arc::new(scheduler);
        scheduler.start();

        // The immediate first run is now blocked inside the gate.
        gate.entered.notified().await;
        assert!(scheduler.trigger("exclusive").await);
        assert_eq!(runs.load(Ordering::SeqCst), 1, "overlapping run must skip");

        gate.release.notify_one();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let trigger = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.trigger("exclusive").await })
        };
        gate.entered.notified().await;
        gate.release.notify_one();
        assert!(trigger.await.unwrap());
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_failing_job_keeps_ticking() {
        eventcache_test::setup();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        scheduler.register(TestJob {
            name: "failing",
            interval: Duration::from_millis(50),
            exclusive: false,
            runs: Arc::clone(&runs),
            gate: None,
            fail: true,
        });
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.shutdown();

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_panicking_job_keeps_ticking() {
        eventcache_test::setup();

        struct PanickingJob(Arc<AtomicUsize>);

        impl Job for PanickingJob {
            fn name(&self) -> &'static str {
                "panicking"
            }

            fn interval(&self) -> Duration {
                Duration::from_millis(50)
            }

            fn run(&self, _token: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>> {
                Box::pin(async move {
                    self.0.fetch_add(1, Ordering::SeqCst);
                    panic!("job panicked");
                })
            }
        }

        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        scheduler.register(PanickingJob(Arc::clone(&runs)));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.shutdown();

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_disabled_job_does_not_run() {
        eventcache_test::setup();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        scheduler.register(counting_job(
            "disabled",
            Duration::from_millis(30),
            Arc::clone(&runs),
        ));
        assert!(scheduler.set_enabled("disabled", false));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(scheduler.trigger("disabled").await);
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_unknown_job_name() {
        eventcache_test::setup();

        let scheduler = JobScheduler::new();
        assert!(!scheduler.trigger("nope").await);
        assert!(!scheduler.set_enabled("nope", true));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_run() {
        eventcache_test::setup();

        struct WaitingJob(Arc<AtomicBool>);

        impl Job for WaitingJob {
            fn name(&self) -> &'static str {
                "waiting"
            }

            fn interval(&self) -> Duration {
                Duration::from_secs(3600)
            }

            fn run(&self, token: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>> {
                Box::pin(async move {
                    token.cancelled().await;
                    self.0.store(true, Ordering::SeqCst);
                    Ok(())
                })
            }
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let mut scheduler = JobScheduler::new();
        scheduler.register(WaitingJob(Arc::clone(&cancelled)));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!cancelled.load(Ordering::SeqCst));

        scheduler.shutdown();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cancelled.load(Ordering::SeqCst));
    }
}
