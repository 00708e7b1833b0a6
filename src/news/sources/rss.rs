// src/news/sources/rss.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::news::types::{now_stamp, NewsItem, NewsSource};

const MIN_TITLE_CHARS: usize = 5;
const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Decode entities, drop tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));

    let decoded = html_escape::decode_html_entities(s).to_string();
    let stripped = re_tags.replace_all(&decoded, "");
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// RFC 2822 `pubDate` re-rendered as "YYYY-MM-DD HH:MM" UTC; raw text if it doesn't parse.
fn normalize_pub_date(ts: &str) -> String {
    let fmt = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| dt.to_offset(UtcOffset::UTC).format(&fmt).ok())
        .unwrap_or_else(|| ts.trim().to_string())
}

/// Parse an RSS 2.0 document into news items stamped with the current fetch time.
pub fn parse_feed(xml: &str, source: &str, category: &str, max_items: usize) -> Result<Vec<NewsItem>> {
    let rss: Rss = from_str(xml).with_context(|| format!("parsing rss xml for {source}"))?;
    let fetched_at = now_stamp();
    let mut out = Vec::with_capacity(rss.channel.item.len().min(max_items));

    for it in rss.channel.item {
        if out.len() >= max_items {
            break;
        }
        let title = clean_text(it.title.as_deref().unwrap_or_default());
        if title.chars().count() < MIN_TITLE_CHARS {
            continue;
        }
        let link = it.link.as_deref().unwrap_or_default().trim().to_string();
        if !link.starts_with("http") {
            continue;
        }
        let summary: String = clean_text(it.description.as_deref().unwrap_or_default())
            .chars()
            .take(SUMMARY_MAX_CHARS)
            .collect();

        out.push(NewsItem {
            title,
            link,
            summary,
            source: source.to_string(),
            category: category.to_string(),
            published_at: it.pub_date.as_deref().map(normalize_pub_date).unwrap_or_default(),
            fetched_at: fetched_at.clone(),
        });
    }
    Ok(out)
}

enum Origin {
    Url { http: reqwest::Client, url: String },
    Fixture(String),
}

/// RSS feed source. Use `from_fixture` in tests.
pub struct RssSource {
    name: String,
    category: String,
    max_items: usize,
    origin: Origin,
}

impl RssSource {
    pub fn new(name: &str, url: &str, category: &str, max_items: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("market-debate/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
            max_items,
            origin: Origin::Url {
                http,
                url: url.to_string(),
            },
        })
    }

    pub fn from_fixture(name: &str, category: &str, content: &str, max_items: usize) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            max_items,
            origin: Origin::Fixture(content.to_string()),
        }
    }
}

#[async_trait]
impl NewsSource for RssSource {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();

        let xml = match &self.origin {
            Origin::Fixture(s) => s.clone(),
            Origin::Url { http, url } => http
                .get(url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?
                .error_for_status()
                .with_context(|| format!("non-2xx from {url}"))?
                .text()
                .await
                .context("reading rss body")?,
        };
        let out = parse_feed(&xml, &self.name, &self.category, self.max_items)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_fetch_ms").record(ms);
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_tags_and_entities() {
        assert_eq!(
            clean_text("  <b>KOSPI</b>&nbsp;rises &amp; \n closes "),
            "KOSPI rises & closes"
        );
    }

    #[test]
    fn pub_date_is_normalized_to_utc_minutes() {
        assert_eq!(
            normalize_pub_date("Mon, 03 Mar 2025 09:30:00 +0900"),
            "2025-03-03 00:30"
        );
        assert_eq!(normalize_pub_date("today"), "today");
    }
}
