// src/news/types.rs
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    /// Identity key for dedup.
    pub link: String,
    #[serde(default)]
    pub summary: String,
    pub source: String, // e.g., "Naver Finance", "Hankyung"
    #[serde(default)]
    pub category: String,
    /// Free-form, as published by the source.
    #[serde(default, rename = "published", alias = "published_at")]
    pub published_at: String,
    /// RFC 3339 (or naive ISO 8601, read as local time).
    pub fetched_at: String,
}

impl NewsItem {
    /// Parsed `fetched_at`; `None` if the stored text is not a timestamp.
    pub fn fetched_at_local(&self) -> Option<DateTime<Local>> {
        parse_timestamp(&self.fetched_at)
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }
    None
}

/// Timestamp format written into `fetched_at`.
pub fn now_stamp() -> String {
    Local::now().to_rfc3339()
}

/// Producer of fresh items; scraping/feeds live behind this seam.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &str;
}
