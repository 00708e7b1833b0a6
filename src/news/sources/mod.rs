// src/news/sources/mod.rs
pub mod rss;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;

use crate::news::feeds::{Feed, FeedStore};
use crate::news::types::{NewsItem, NewsSource};
pub use rss::RssSource;

/// Fans out to several sources in order. One failing source is logged and skipped;
/// links repeated across sources are kept once (first wins).
pub struct CompositeSource {
    sources: Vec<Box<dyn NewsSource>>,
}

impl CompositeSource {
    pub fn new(sources: Vec<Box<dyn NewsSource>>) -> Self {
        Self { sources }
    }

    /// One `RssSource` per registered feed; malformed entries are skipped.
    pub fn from_feeds(feeds: &[Feed], max_per_source: usize) -> Self {
        let mut sources: Vec<Box<dyn NewsSource>> = Vec::with_capacity(feeds.len());
        for f in feeds {
            match RssSource::new(&f.name, &f.url, &f.category, max_per_source) {
                Ok(s) => sources.push(Box::new(s)),
                Err(e) => tracing::warn!(target: "ingest", error = ?e, feed = %f.url, "skipping feed"),
            }
        }
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl NewsSource for CompositeSource {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        let mut raw = Vec::new();
        for s in &self.sources {
            match s.fetch_latest().await {
                Ok(mut v) => {
                    tracing::debug!(target: "ingest", source = s.name(), count = v.len(), "fetched");
                    raw.append(&mut v);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, source = s.name(), "source error");
                    counter!("ingest_source_errors_total").increment(1);
                }
            }
        }

        let mut seen = HashSet::new();
        raw.retain(|it| seen.insert(it.link.clone()));
        tracing::info!(target: "ingest", total = raw.len(), sources = self.sources.len(), "collected news");
        Ok(raw)
    }

    fn name(&self) -> &str {
        "composite"
    }
}

/// Re-reads the feed registry on every fetch, so feeds added or removed at
/// runtime take effect on the next scheduler tick.
pub struct RegistrySource {
    feeds: FeedStore,
    max_per_source: usize,
}

impl RegistrySource {
    pub fn new(feeds: FeedStore, max_per_source: usize) -> Self {
        Self {
            feeds,
            max_per_source,
        }
    }
}

#[async_trait]
impl NewsSource for RegistrySource {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        let feeds = self.feeds.list();
        if feeds.is_empty() {
            tracing::warn!(target: "ingest", "no feeds registered");
            return Ok(Vec::new());
        }
        CompositeSource::from_feeds(&feeds, self.max_per_source)
            .fetch_latest()
            .await
    }

    fn name(&self) -> &str {
        "registry"
    }
}

/// Fixed batch; for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub items: Vec<NewsItem>,
}

impl StaticSource {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl NewsSource for StaticSource {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        Ok(self.items.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
