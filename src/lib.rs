// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyst;
pub mod api;
pub mod config;
pub mod debate;
pub mod metrics;
pub mod model;
pub mod news;
pub mod scheduler;
pub mod stats;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::debate::{DebateError, DebateLog, DebateOrchestrator};
pub use crate::scheduler::{Scheduler, SchedulerState, SchedulerStatus};

use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

use crate::analyst::{Analyst, ReportStore};
use crate::config::AppConfig;
use crate::news::feeds::FeedStore;
use crate::news::sources::RegistrySource;
use crate::news::NewsStore;
use crate::scheduler::IngestJob;

/// Wire stores, sources, model client and the process-wide scheduler, start the
/// scheduler, and return the HTTP router (without `/metrics`).
pub async fn app(cfg: AppConfig) -> anyhow::Result<Router> {
    let client = model::build_model_client(&cfg.model);

    let feeds = FeedStore::new(cfg.feeds_path());
    let registered = feeds.list().len();
    if registered == 0 {
        warn!(path = %cfg.feeds_path().display(), "no feeds registered yet; add some via POST /feeds");
    }
    let source = Arc::new(RegistrySource::new(feeds, cfg.max_per_source));

    let mut job = IngestJob::new(NewsStore::new(cfg.news_path(), cfg.news_cap), source);
    if let Some(c) = &client {
        job = job.with_analysis(
            Analyst::new(c.clone(), cfg.debate_news_window),
            ReportStore::new(cfg.reports_path(), cfg.report_cap),
        );
    }

    let scheduler = scheduler::install(cfg.interval(), Arc::new(job));
    scheduler.start()?;
    info!(
        feeds = registered,
        model = client.as_ref().map(|m| m.provider_name()).unwrap_or("none"),
        "application wired"
    );

    let state = AppState::new(cfg, scheduler, client);
    Ok(create_router(state))
}
