// src/news/mod.rs
pub mod feeds;
pub mod sources;
pub mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::storage::{read_json_or_default, with_path_lock, write_json_atomic};
pub use types::{NewsItem, NewsSource};

pub const DEFAULT_NEWS_CAP: usize = 1000;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Completed ingestion runs.");
        describe_counter!(
            "ingest_new_items_total",
            "Items added to the news collection after dedup."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "News source fetch/parse errors."
        );
        describe_gauge!("ingest_collection_size", "News items currently stored.");
    });
}

/// Result of merging a fresh batch into the stored collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub items: Vec<NewsItem>,
    pub added: usize,
    /// False when some `fetched_at` could not be parsed; those items trail the sorted ones.
    pub sorted: bool,
}

/// `incoming \ existing` by link, prepended, sorted newest-first by `fetched_at`,
/// truncated to `cap`. Duplicates inside `incoming` collapse to the first one.
pub fn merge_news(existing: Vec<NewsItem>, incoming: Vec<NewsItem>, cap: usize) -> MergeOutcome {
    let mut seen: HashSet<String> = existing.iter().map(|it| it.link.clone()).collect();
    let mut fresh = Vec::new();
    for it in incoming {
        if seen.insert(it.link.clone()) {
            fresh.push(it);
        }
    }
    let added = fresh.len();

    let mut all = fresh;
    all.extend(existing);

    let sorted = sort_newest_first(&mut all);
    all.truncate(cap);

    MergeOutcome {
        items: all,
        added,
        sorted,
    }
}

/// Stable sort descending by `fetched_at`. Items whose timestamp does not parse keep
/// their relative order and go after every dated item, so the cap drops them first.
fn sort_newest_first(items: &mut Vec<NewsItem>) -> bool {
    let mut dated: Vec<(DateTime<Local>, NewsItem)> = Vec::with_capacity(items.len());
    let mut undated = Vec::new();
    for it in items.drain(..) {
        match it.fetched_at_local() {
            Some(t) => dated.push((t, it)),
            None => undated.push(it),
        }
    }
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    items.extend(dated.into_iter().map(|(_, it)| it));

    if undated.is_empty() {
        return true;
    }
    warn!(
        target: "ingest",
        count = undated.len(),
        "unparseable fetched_at, placing items after dated ones"
    );
    items.extend(undated);
    false
}

/// Items fetched on the same local calendar day as `now`.
pub fn same_day(items: &[NewsItem], now: DateTime<Local>) -> Vec<NewsItem> {
    let today = now.date_naive();
    items
        .iter()
        .filter(|it| {
            it.fetched_at_local()
                .map(|t| t.date_naive() == today)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// The `limit` most recently fetched items, newest first.
pub fn most_recent(items: &[NewsItem], limit: usize) -> Vec<NewsItem> {
    let mut v = items.to_vec();
    sort_newest_first(&mut v);
    v.truncate(limit);
    v
}

/// News collection persisted as a JSON array.
#[derive(Debug, Clone)]
pub struct NewsStore {
    path: PathBuf,
    cap: usize,
}

impl NewsStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap: cap.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or corrupt file reads as an empty collection.
    pub fn load(&self) -> Vec<NewsItem> {
        read_json_or_default(&self.path)
    }

    /// Merge `incoming` into the stored collection and persist. Returns the number of new items.
    pub fn ingest(&self, incoming: Vec<NewsItem>) -> Result<usize> {
        ensure_metrics_described();
        let outcome = with_path_lock(&self.path, || {
            let outcome = merge_news(self.load(), incoming, self.cap);
            write_json_atomic(&self.path, &outcome.items).map(|()| outcome)
        })?;

        counter!("ingest_new_items_total").increment(outcome.added as u64);
        gauge!("ingest_collection_size").set(outcome.items.len() as f64);
        info!(
            target: "ingest",
            added = outcome.added,
            total = outcome.items.len(),
            sorted = outcome.sorted,
            "news collection updated"
        );
        Ok(outcome.added)
    }

    /// Fetch from `source`, then merge. Source errors propagate to the caller (the scheduler job).
    pub async fn fetch_and_update(&self, source: &dyn NewsSource) -> Result<usize> {
        ensure_metrics_described();
        let fresh = match source.fetch_latest().await {
            Ok(v) => v,
            Err(e) => {
                counter!("ingest_source_errors_total").increment(1);
                return Err(e.context(format!("fetching from {}", source.name())));
            }
        };
        let added = self.ingest(fresh)?;
        counter!("ingest_runs_total").increment(1);
        Ok(added)
    }

    pub fn today(&self, now: DateTime<Local>) -> Vec<NewsItem> {
        same_day(&self.load(), now)
    }
}
