// src/api.rs
//! JSON HTTP surface over the stores, the scheduler and the debate orchestrator.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::debate::chart::{extract_chart_data, SectorOutlook};
use crate::debate::{DebateLog, DebateLogStore, DebateOrchestrator};
use crate::model::DynModelClient;
use crate::news::feeds::{Feed, FeedStore};
use crate::news::{most_recent, NewsItem, NewsStore};
use crate::scheduler::{Scheduler, SchedulerState};
use crate::stats::{Stats, StatsStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub news: NewsStore,
    pub feeds: FeedStore,
    pub debates: DebateLogStore,
    pub stats: StatsStore,
    pub scheduler: Arc<Scheduler>,
    /// `None` when no model is configured; debate runs then answer 503.
    pub model: Option<DynModelClient>,
    /// One operator-triggered debate at a time.
    debate_gate: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(config: AppConfig, scheduler: Arc<Scheduler>, model: Option<DynModelClient>) -> Self {
        Self {
            news: NewsStore::new(config.news_path(), config.news_cap),
            feeds: FeedStore::new(config.feeds_path()),
            debates: DebateLogStore::new(config.debates_path(), config.debate_log_cap),
            stats: StatsStore::new(config.stats_path()),
            config: Arc::new(config),
            scheduler,
            model,
            debate_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/scheduler/status", get(scheduler_status))
        .route("/scheduler/start", post(scheduler_start))
        .route("/scheduler/stop", post(scheduler_stop))
        .route("/news", get(list_news))
        .route("/news/today", get(news_today))
        .route("/feeds", get(list_feeds).post(add_feed).delete(remove_feed))
        .route("/debates/run", post(run_debate))
        .route("/debates/latest", get(latest_debate))
        .route("/debates/latest/chart", get(latest_chart))
        .route("/stats", get(get_stats))
        .route("/stats/visit", post(record_visit))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerState> {
    Json(state.scheduler.state())
}

async fn scheduler_start(State(state): State<AppState>) -> Response {
    match state.scheduler.start() {
        Ok(changed) => Json(json!({ "changed": changed })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn scheduler_stop(State(state): State<AppState>) -> Json<serde_json::Value> {
    let changed = state.scheduler.stop().await;
    Json(json!({ "changed": changed }))
}

#[derive(serde::Deserialize)]
struct NewsQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn list_news(State(state): State<AppState>, Query(q): Query<NewsQuery>) -> Json<Vec<NewsItem>> {
    let limit = q.limit.unwrap_or(50).min(state.config.news_cap);
    Json(most_recent(&state.news.load(), limit))
}

async fn news_today(State(state): State<AppState>) -> Json<serde_json::Value> {
    let count = state.news.today(Local::now()).len();
    Json(json!({ "count": count, "required": state.config.min_debate_news }))
}

async fn list_feeds(State(state): State<AppState>) -> Json<Vec<Feed>> {
    Json(state.feeds.list())
}

async fn add_feed(State(state): State<AppState>, Json(feed): Json<Feed>) -> Response {
    if !feed.url.trim().starts_with("http") || feed.name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "feed needs a name and an http(s) url");
    }
    match state.feeds.add(&feed.name, &feed.url, &feed.category) {
        Ok(added) => {
            info!(target: "api", url = %feed.url, added, "feed registration");
            Json(json!({ "added": added })).into_response()
        }
        Err(e) => {
            warn!(target: "api", error = ?e, "failed to persist feed registry");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "could not save feed")
        }
    }
}

#[derive(serde::Deserialize)]
struct FeedQuery {
    url: String,
}

async fn remove_feed(State(state): State<AppState>, Query(q): Query<FeedQuery>) -> Response {
    match state.feeds.remove(&q.url) {
        Ok(removed) => Json(json!({ "removed": removed })).into_response(),
        Err(e) => {
            warn!(target: "api", error = ?e, "failed to persist feed registry");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "could not save feed")
        }
    }
}

async fn run_debate(State(state): State<AppState>) -> Response {
    let Some(client) = state.model.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "model client is not configured");
    };

    let today = state.news.today(Local::now());
    let required = state.config.min_debate_news;
    if today.len() < required {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("need at least {required} news items from today, have {}", today.len()),
        );
    }

    let Ok(_running) = state.debate_gate.try_lock() else {
        return error_response(StatusCode::CONFLICT, "a debate is already running");
    };

    let orchestrator = DebateOrchestrator::new(client)
        .with_pacing(Duration::from_millis(state.config.model.pacing_ms))
        .with_news_window(state.config.debate_news_window);

    let outcome = orchestrator
        .run_debate(&today, |msg, fraction| {
            info!(target: "api", progress = fraction, "{msg}");
        })
        .await;

    match outcome {
        Ok(log) => {
            if let Err(e) = state.debates.append(log.clone()) {
                warn!(target: "api", error = ?e, "failed to persist debate log");
            }
            Json(log).into_response()
        }
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

async fn latest_debate(State(state): State<AppState>) -> Json<Option<DebateLog>> {
    Json(state.debates.latest())
}

async fn latest_chart(State(state): State<AppState>) -> Json<Vec<SectorOutlook>> {
    let chart = state
        .debates
        .latest()
        .and_then(|d| d.final_report_text().map(extract_chart_data))
        .unwrap_or_default();
    Json(chart)
}

async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.stats.load())
}

async fn record_visit(State(state): State<AppState>) -> Response {
    match state.stats.increment_visitor_count() {
        Ok(visitors) => Json(Stats { visitors }).into_response(),
        Err(e) => {
            warn!(target: "api", error = ?e, "failed to persist visitor count");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "could not record visit")
        }
    }
}
