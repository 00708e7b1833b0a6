// tests/store_concurrency.rs
//
// Read-modify-write stores under parallel callers: no lost updates, no write errors,
// no temp files left behind.

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _;

use market_debate::config::AppConfig;
use market_debate::news::feeds::FeedStore;
use market_debate::scheduler::{FnJob, Scheduler};
use market_debate::stats::StatsStore;
use market_debate::{create_router, AppState};

fn router(dir: &tempfile::TempDir) -> Router {
    let mut cfg = AppConfig::default();
    cfg.data_dir = dir.path().to_path_buf();
    let scheduler = Arc::new(Scheduler::new(
        Duration::from_secs(3600),
        Arc::new(FnJob(|| async { Ok::<(), anyhow::Error>(()) })),
    ));
    create_router(AppState::new(cfg, scheduler, None))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_visits_are_all_counted() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(&dir);

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let req = Request::post("/stats/visit").body(Body::empty()).unwrap();
                app.oneshot(req).await.unwrap().status()
            })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }

    let resp = app
        .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = body::to_bytes(resp.into_body(), 1024).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["visitors"], 64);

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files, vec!["stats.json".to_string()]);
}

#[test]
fn separate_store_instances_share_the_file_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.json");
    std::thread::scope(|s| {
        for _ in 0..8 {
            let path = path.clone();
            s.spawn(move || {
                let store = StatsStore::new(path);
                for _ in 0..10 {
                    store.increment_visitor_count().unwrap();
                }
            });
        }
    });
    assert_eq!(StatsStore::new(path).load().visitors, 80);
}

#[test]
fn parallel_feed_registrations_keep_every_url() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeedStore::new(dir.path().join("feeds.json"));
    std::thread::scope(|s| {
        for i in 0..24 {
            let store = store.clone();
            s.spawn(move || {
                let url = format!("https://news.example.com/rss/{}", i % 12);
                store.add(&format!("feed {i}"), &url, "stock").unwrap();
            });
        }
    });
    let feeds = store.list();
    assert_eq!(feeds.len(), 12, "one entry per distinct url");
}
