// src/analyst.rs
//! Single-shot market brief used by the periodic job (no debate, one model call).

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::debate::persona::render_news_block;
use crate::debate::Opinion;
use crate::model::DynModelClient;
use crate::news::{most_recent, NewsItem};
use crate::storage::BoundedLog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub timestamp: String,
    pub news_count: usize,
    pub text: String,
}

pub struct Analyst {
    client: DynModelClient,
    news_window: usize,
}

impl Analyst {
    pub fn new(client: DynModelClient, news_window: usize) -> Self {
        Self {
            client,
            news_window: news_window.max(1),
        }
    }

    pub fn prompt(now: &str, news_block: &str) -> String {
        format!(
            "Current time: {now}\n\
             You are a senior equity strategist writing a short market brief.\n\
             - Summarize the market mood implied by the headlines.\n\
             - List sectors likely to benefit and sectors that need caution, with reasons.\n\
             - Name related tickers where the news supports it.\n\
             - Be concise; Markdown bullet points.\n\n\
             **Latest news:**\n{news_block}"
        )
    }

    /// One model call over the newest `news_window` items.
    pub async fn analyze(&self, news: &[NewsItem]) -> Opinion {
        let now = Local::now().format("%Y-%m-%d %H:%M").to_string();
        let block = render_news_block(&most_recent(news, self.news_window));
        self.client.generate(&Self::prompt(&now, &block)).await.into()
    }
}

/// Bounded, most-recent-first log of successful briefs.
#[derive(Debug, Clone)]
pub struct ReportStore {
    log: BoundedLog<AnalysisReport>,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            log: BoundedLog::new(path, cap),
        }
    }

    pub fn save(&self, news_count: usize, text: &str) -> Result<AnalysisReport> {
        let report = AnalysisReport {
            timestamp: Local::now().to_rfc3339(),
            news_count,
            text: text.to_string(),
        };
        self.log.append(report.clone())?;
        Ok(report)
    }

    pub fn latest(&self) -> Option<AnalysisReport> {
        self.log.latest()
    }
}
