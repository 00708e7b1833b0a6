// src/scheduler/job.rs
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::analyst::{Analyst, ReportStore};
use crate::debate::Opinion;
use crate::news::{NewsSource, NewsStore};

/// Work executed on every scheduler tick. Errors are reported, never fatal.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self) -> Result<()>;
    fn name(&self) -> &'static str {
        "job"
    }
}

/// Adapts an async closure into a `Job`.
pub struct FnJob<F>(pub F);

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn run(&self) -> Result<()> {
        (self.0)().await
    }
    fn name(&self) -> &'static str {
        "fn"
    }
}

/// Ingest fresh news, then (if a model is configured) write a single-shot brief.
pub struct IngestJob {
    news: NewsStore,
    source: Arc<dyn NewsSource>,
    analysis: Option<(Analyst, ReportStore)>,
}

impl IngestJob {
    pub fn new(news: NewsStore, source: Arc<dyn NewsSource>) -> Self {
        Self {
            news,
            source,
            analysis: None,
        }
    }

    pub fn with_analysis(mut self, analyst: Analyst, reports: ReportStore) -> Self {
        self.analysis = Some((analyst, reports));
        self
    }
}

#[async_trait]
impl Job for IngestJob {
    async fn run(&self) -> Result<()> {
        let added = self.news.fetch_and_update(self.source.as_ref()).await?;
        info!(target: "scheduler", added, source = self.source.name(), "news fetched");

        let Some((analyst, reports)) = &self.analysis else {
            info!(target: "scheduler", "analysis skipped: no model configured");
            return Ok(());
        };

        let items = self.news.load();
        if items.is_empty() {
            info!(target: "scheduler", "analysis skipped: no news");
            return Ok(());
        }

        match analyst.analyze(&items).await {
            Opinion::Ok { text } => {
                reports.save(items.len(), &text)?;
                info!(target: "scheduler", news = items.len(), "analysis report saved");
            }
            Opinion::Failed { reason } => {
                warn!(target: "scheduler", %reason, "analysis failed, report not saved");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ingest"
    }
}
