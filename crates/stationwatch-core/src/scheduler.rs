//! Interval scheduler
//!
//! Maps job names to a cadence and a callback. Each tick spawns the callback
//! as its own task, so a slow cycle never delays the next tick; overlapping
//! cycles of the same job are logged rather than serialized.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

type JobFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct ScheduledJob {
    name: String,
    every: Duration,
    immediate: bool,
    run: JobFn,
}

/// A registered job, as listed by [`Scheduler::jobs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    /// Job name
    pub name: String,
    /// Cadence
    pub every: Duration,
    /// Whether the first run happens at startup
    pub immediate: bool,
}

/// Runs named jobs on fixed cadences
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` at startup and then every `every`
    pub fn every<F, Fut>(&mut self, name: impl Into<String>, every: Duration, job: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push(name.into(), every, true, job)
    }

    /// Run `job` every `every`, the first time one period after startup
    pub fn every_delayed<F, Fut>(&mut self, name: impl Into<String>, every: Duration, job: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push(name.into(), every, false, job)
    }

    fn push<F, Fut>(&mut self, name: String, every: Duration, immediate: bool, job: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.jobs.push(ScheduledJob {
            name,
            every: every.max(Duration::from_millis(1)),
            immediate,
            run: Arc::new(move || job().boxed()),
        });
        self
    }

    /// Registered jobs in registration order
    pub fn jobs(&self) -> Vec<JobInfo> {
        self.jobs
            .iter()
            .map(|j| JobInfo {
                name: j.name.clone(),
                every: j.every,
                immediate: j.immediate,
            })
            .collect()
    }

    /// Drive every job until `shutdown` resolves, then wait for in-flight runs
    pub async fn run_until<S>(self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut loops = JoinSet::new();
        for job in self.jobs {
            info!(
                job = %job.name,
                every = %humantime::format_duration(job.every),
                "Scheduled job"
            );
            loops.spawn(run_job(job, stop_rx.clone()));
        }

        shutdown.await;
        info!("Shutdown requested, waiting for in-flight cycles");
        let _ = stop_tx.send(true);

        while loops.join_next().await.is_some() {}
        info!("Scheduler stopped");
    }
}

async fn run_job(job: ScheduledJob, mut stop: watch::Receiver<bool>) {
    let start = if job.immediate {
        Instant::now()
    } else {
        Instant::now() + job.every
    };
    let mut ticker = interval_at(start, job.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !in_flight.is_empty() {
                    warn!(job = %job.name, running = in_flight.len(), "Previous run still in progress");
                }
                debug!(job = %job.name, "Running job");
                in_flight.spawn((job.run)());
            }
            Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = result {
                    warn!(job = %job.name, error = %e, "Job run aborted");
                }
            }
            _ = stop.changed() => break,
        }
    }

    while in_flight.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_jobs_listed_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler
            .every("Monitor gas station", Duration::from_secs(60), || async {})
            .every_delayed("Check Balance", Duration::from_secs(86_400), || async {});

        let jobs = scheduler.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name, "Monitor gas station");
        assert!(jobs[0].immediate);
        assert_eq!(jobs[1].every, Duration::from_secs(86_400));
        assert!(!jobs[1].immediate);
    }

    #[tokio::test]
    async fn test_runs_on_cadence_until_shutdown() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let mut scheduler = Scheduler::new();
        scheduler.every("tick", Duration::from_millis(50), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(180)))
            .await;

        let runs = count.load(Ordering::SeqCst);
        assert!((3..=5).contains(&runs), "unexpected run count {runs}");
    }

    #[tokio::test]
    async fn test_delayed_job_does_not_run_at_startup() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let mut scheduler = Scheduler::new();
        scheduler.every_delayed("daily", Duration::from_secs(3600), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_run() {
        let finished = Arc::new(AtomicUsize::new(0));
        let flag = finished.clone();

        let mut scheduler = Scheduler::new();
        scheduler.every("slow", Duration::from_secs(3600), move || {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                flag.fetch_add(1, Ordering::SeqCst);
            }
        });

        scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(20)))
            .await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
