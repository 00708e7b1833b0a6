// tests/scheduler_singleton.rs
//
// Own test binary so the process-wide instance starts out uninstalled.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use market_debate::scheduler::{self, FnJob, Job};

fn noop() -> Arc<dyn Job> {
    Arc::new(FnJob(|| async { Ok::<(), anyhow::Error>(()) }))
}

#[test]
fn concurrent_first_callers_share_one_instance() {
    assert!(scheduler::global().is_none());

    let n = 8;
    let barrier = Arc::new(Barrier::new(n));
    let handles: Vec<_> = (0..n)
        .map(|i| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                scheduler::install(Duration::from_secs(60 + i as u64), noop())
            })
        })
        .collect();
    let got: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let first = &got[0];
    assert!(got.iter().all(|s| Arc::ptr_eq(s, first)));
    assert!(Arc::ptr_eq(&scheduler::global().unwrap(), first));

    // later installs keep the original configuration
    let again = scheduler::install(Duration::from_secs(1), noop());
    assert!(Arc::ptr_eq(&again, first));
    assert_eq!(again.interval(), first.interval());
    assert_eq!(first.workers_spawned(), 0);
}
