// tests/scheduler_lifecycle.rs
//
// Start/stop semantics of the background scheduler with real time.
// Jobs count their executions; intervals are long unless the test needs ticks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use market_debate::scheduler::{Job, Scheduler, SchedulerStatus};
use tokio::time::{sleep, timeout, Instant};

struct Counting {
    runs: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Job for Counting {
    async fn run(&self) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(anyhow!("feed unreachable"))
        } else {
            Ok(())
        }
    }
}

/// Sleeps far longer than the stop grace period.
struct Slow;

#[async_trait]
impl Job for Slow {
    async fn run(&self) -> anyhow::Result<()> {
        sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

fn counting(interval: Duration, fail: bool) -> (Scheduler, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let job = Counting {
        runs: runs.clone(),
        fail,
    };
    (Scheduler::new(interval, Arc::new(job)), runs)
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn starting_twice_spawns_one_worker() {
    let (s, runs) = counting(Duration::from_secs(3600), false);
    assert_eq!(s.start(), Ok(true));
    assert_eq!(s.start(), Ok(false));
    assert_eq!(s.workers_spawned(), 1);
    assert!(s.is_running());

    wait_until(|| s.state().status == SchedulerStatus::Waiting).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let st = s.state();
    assert!(st.last_run.is_some());
    assert!(st.next_run.unwrap() > st.last_run.unwrap());

    assert!(s.stop().await);
}

#[tokio::test]
async fn stop_then_start_runs_a_fresh_loop() {
    let (s, runs) = counting(Duration::from_secs(3600), false);
    s.start().unwrap();
    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;

    assert!(s.stop().await);
    assert!(!s.is_running());
    assert_eq!(s.state().status, SchedulerStatus::Stopped);

    assert_eq!(s.start(), Ok(true));
    assert_eq!(s.workers_spawned(), 2);
    wait_until(|| runs.load(Ordering::SeqCst) == 2).await;
    assert!(s.stop().await);
}

#[tokio::test]
async fn stopping_a_stopped_scheduler_is_a_no_op() {
    let (s, runs) = counting(Duration::from_secs(3600), false);
    assert!(!s.stop().await);
    assert_eq!(s.state().status, SchedulerStatus::Stopped);
    assert_eq!(s.workers_spawned(), 0);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_job_reports_error_and_loop_keeps_ticking() {
    let (s, runs) = counting(Duration::from_millis(20), true);
    s.start().unwrap();
    let mut seen = None;
    wait_until(|| {
        let st = s.state();
        if runs.load(Ordering::SeqCst) >= 3 && matches!(st.status, SchedulerStatus::Error(_)) {
            seen = Some(st.status);
            true
        } else {
            false
        }
    })
    .await;

    match seen {
        Some(SchedulerStatus::Error(reason)) => assert!(reason.contains("feed unreachable")),
        other => panic!("expected error status, got {other:?}"),
    }
    assert!(s.is_running());
    assert!(s.stop().await);
}

#[tokio::test]
async fn stop_wakes_the_interval_sleep_promptly() {
    let (s, runs) = counting(Duration::from_secs(3600), false);
    s.start().unwrap();
    wait_until(|| runs.load(Ordering::SeqCst) == 1).await;

    let t0 = Instant::now();
    assert!(s.stop().await);
    assert!(t0.elapsed() < Duration::from_millis(500), "stop took {:?}", t0.elapsed());
}

#[tokio::test]
async fn stop_during_long_job_returns_within_grace() {
    let s = Scheduler::new(Duration::from_secs(3600), Arc::new(Slow));
    s.start().unwrap();
    wait_until(|| s.state().status == SchedulerStatus::Processing).await;

    let t0 = Instant::now();
    assert!(s.stop().await);
    let took = t0.elapsed();
    assert!(took < Duration::from_secs(3), "stop took {took:?}");
    // lingering loop cannot overwrite the stopped state
    assert_eq!(s.state().status, SchedulerStatus::Stopped);
}

#[tokio::test]
async fn panicking_job_becomes_error_status() {
    struct Panics;
    #[async_trait]
    impl Job for Panics {
        async fn run(&self) -> anyhow::Result<()> {
            panic!("bad feed payload");
        }
    }

    let s = Scheduler::new(Duration::from_secs(3600), Arc::new(Panics));
    s.start().unwrap();
    wait_until(|| matches!(s.state().status, SchedulerStatus::Error(_))).await;
    assert_eq!(
        s.state().status,
        SchedulerStatus::Error("job panicked".into())
    );
    assert!(s.is_running());
    s.stop().await;
}
