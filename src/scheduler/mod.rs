// src/scheduler/mod.rs
//! Process-wide background scheduler: runs one injected job on a fixed interval.
//!
//! - One run-loop task per `start()`; a second `start()` while running is a no-op.
//! - `stop()` cancels the loop token. The interval sleep wakes immediately; an
//!   in-flight job is not interrupted, the loop exits right after it.
//! - Observers read a cloned `SchedulerState` snapshot. Each loop publishes under
//!   its own generation, so a loop that outlived `stop()` can never overwrite the
//!   state of its successor.
//! - The application installs exactly one instance with [`install`]; construction
//!   is guarded by a `OnceCell`, so concurrent first callers share it.

pub mod job;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Local};
use metrics::{counter, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use job::{FnJob, IngestJob, Job};

/// How long `stop()` waits for the loop to acknowledge cancellation.
pub const STOP_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler must be started from within a tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SchedulerStatus {
    Stopped,
    Running,
    Processing,
    Waiting,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerState {
    pub status: SchedulerStatus,
    pub last_run: Option<DateTime<Local>>,
    pub next_run: Option<DateTime<Local>>,
    pub interval_ms: u64,
}

impl SchedulerState {
    fn stopped(interval: Duration) -> Self {
        Self {
            status: SchedulerStatus::Stopped,
            last_run: None,
            next_run: None,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Human-readable status for dashboards.
    pub fn status_line(&self) -> String {
        match &self.status {
            SchedulerStatus::Stopped => "Stopped".to_string(),
            SchedulerStatus::Running => "Running".to_string(),
            SchedulerStatus::Processing => "Processing...".to_string(),
            SchedulerStatus::Waiting => match self.next_run {
                Some(t) => format!("Waiting (next run: {})", t.format("%H:%M:%S")),
                None => "Waiting".to_string(),
            },
            SchedulerStatus::Error(reason) => format!("Error: {reason}"),
        }
    }
}

/// Snapshot plus the generation allowed to modify it.
struct Shared {
    published: RwLock<(u64, SchedulerState)>,
    /// Serializes job executions across loop generations.
    job_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    fn snapshot(&self) -> SchedulerState {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .clone()
    }

    /// Start a new generation; returns its id.
    fn advance(&self, status: SchedulerStatus) -> u64 {
        let mut g = self.published.write().unwrap_or_else(PoisonError::into_inner);
        g.0 += 1;
        g.1.status = status;
        g.0
    }

    /// Apply `f` only if `generation` is still current.
    fn publish(&self, generation: u64, f: impl FnOnce(&mut SchedulerState)) -> bool {
        let mut g = self.published.write().unwrap_or_else(PoisonError::into_inner);
        if g.0 != generation {
            return false;
        }
        f(&mut g.1);
        true
    }
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Scheduler {
    interval: Duration,
    job: Arc<dyn Job>,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
    spawned: AtomicU64,
}

static GLOBAL: OnceCell<Arc<Scheduler>> = OnceCell::new();

/// Install the process-wide scheduler. The first call constructs it; later (or
/// concurrent) calls return that same instance and drop their `job`.
pub fn install(interval: Duration, job: Arc<dyn Job>) -> Arc<Scheduler> {
    GLOBAL
        .get_or_init(|| {
            info!(target: "scheduler", interval_ms = interval.as_millis() as u64, job = job.name(), "scheduler installed");
            Arc::new(Scheduler::new(interval, job))
        })
        .clone()
}

/// The installed scheduler, if any.
pub fn global() -> Option<Arc<Scheduler>> {
    GLOBAL.get().cloned()
}

impl Scheduler {
    /// Standalone instance. The application should go through [`install`].
    pub fn new(interval: Duration, job: Arc<dyn Job>) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            interval,
            job,
            shared: Arc::new(Shared {
                published: RwLock::new((0, SchedulerState::stopped(interval))),
                job_lock: tokio::sync::Mutex::new(()),
            }),
            worker: Mutex::new(None),
            spawned: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.snapshot()
    }

    pub fn is_running(&self) -> bool {
        let slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    /// Run-loops spawned over this instance's lifetime.
    pub fn workers_spawned(&self) -> u64 {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Launch the run-loop. Returns `Ok(false)` if it was already running.
    pub fn start(&self) -> Result<bool, SchedulerError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            debug!(target: "scheduler", "start ignored: already running");
            return Ok(false);
        }

        let generation = self.shared.advance(SchedulerStatus::Running);
        let cancel = CancellationToken::new();
        let handle = rt.spawn(run_loop(
            self.shared.clone(),
            self.job.clone(),
            self.interval,
            generation,
            cancel.clone(),
        ));
        *slot = Some(Worker { cancel, handle });
        self.spawned.fetch_add(1, Ordering::SeqCst);

        info!(target: "scheduler", generation, interval_ms = self.interval.as_millis() as u64, "scheduler started");
        Ok(true)
    }

    /// Request termination and wait up to [`STOP_GRACE`] for the loop to exit.
    /// Returns `false` if nothing was running.
    pub async fn stop(&self) -> bool {
        let worker = {
            let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            slot.take()
        };
        let Some(worker) = worker else {
            return false;
        };

        worker.cancel.cancel();
        // New generation: a lingering loop can no longer publish.
        self.shared.advance(SchedulerStatus::Stopped);

        match tokio::time::timeout(STOP_GRACE, worker.handle).await {
            Ok(_) => info!(target: "scheduler", "scheduler stopped"),
            Err(_) => warn!(
                target: "scheduler",
                "scheduler stopped; job still in flight, loop exits when it returns"
            ),
        }
        true
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    job: Arc<dyn Job>,
    interval: Duration,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        let guard = tokio::select! {
            _ = cancel.cancelled() => break,
            g = shared.job_lock.lock() => g,
        };
        if cancel.is_cancelled() {
            break;
        }

        shared.publish(generation, |s| s.status = SchedulerStatus::Processing);
        debug!(target: "scheduler", job = job.name(), "executing job");
        let outcome = run_job_isolated(job.clone()).await;
        drop(guard);

        match outcome {
            Ok(()) => {
                let now = Local::now();
                let next = chrono::Duration::from_std(interval)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d));
                shared.publish(generation, |s| {
                    s.last_run = Some(now);
                    s.next_run = next;
                    s.status = SchedulerStatus::Waiting;
                });
                counter!("scheduler_runs_total").increment(1);
                gauge!("scheduler_last_run_ts").set(now.timestamp() as f64);
                info!(target: "scheduler", job = job.name(), "job finished");
            }
            Err(reason) => {
                counter!("scheduler_job_failures_total").increment(1);
                error!(target: "scheduler", job = job.name(), %reason, "job failed");
                shared.publish(generation, |s| s.status = SchedulerStatus::Error(reason));
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(target: "scheduler", generation, "run-loop exited");
}

/// Run the job on its own task so a panic is reported like any other failure.
async fn run_job_isolated(job: Arc<dyn Job>) -> Result<(), String> {
    match tokio::spawn(async move { job.run().await }).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(join) if join.is_panic() => Err("job panicked".to_string()),
        Err(join) => Err(join.to_string()),
    }
}
