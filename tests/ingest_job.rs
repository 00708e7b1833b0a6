// tests/ingest_job.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use market_debate::analyst::{Analyst, ReportStore};
use market_debate::model::{DynModelClient, EchoProvider, ModelClient, ModelError, RetryPolicy, RetryingClient};
use market_debate::news::sources::StaticSource;
use market_debate::news::{NewsItem, NewsSource, NewsStore};
use market_debate::scheduler::{IngestJob, Job};

fn items(n: usize) -> Vec<NewsItem> {
    (0..n)
        .map(|i| NewsItem {
            title: format!("KOSPI update {i}"),
            link: format!("https://news.example.com/k/{i}"),
            summary: String::new(),
            source: "Wire".into(),
            category: "stock".into(),
            published_at: String::new(),
            fetched_at: Local::now().to_rfc3339(),
        })
        .collect()
}

struct Down;

#[async_trait]
impl NewsSource for Down {
    async fn fetch_latest(&self) -> anyhow::Result<Vec<NewsItem>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &str {
        "down"
    }
}

struct Quota;

#[async_trait]
impl ModelClient for Quota {
    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Upstream("quota exceeded".into()))
    }
    fn provider_name(&self) -> &'static str {
        "quota"
    }
}

#[tokio::test]
async fn without_model_only_news_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let news = NewsStore::new(dir.path().join("news.json"), 1000);
    let job = IngestJob::new(news.clone(), Arc::new(StaticSource::new(items(4))));

    job.run().await.unwrap();
    assert_eq!(news.load().len(), 4);
    assert!(!dir.path().join("reports.json").exists());
}

#[tokio::test]
async fn with_model_a_report_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let news = NewsStore::new(dir.path().join("news.json"), 1000);
    let reports = ReportStore::new(dir.path().join("reports.json"), 10);
    let client: DynModelClient = Arc::new(RetryingClient::new(EchoProvider, RetryPolicy::default()));
    let job = IngestJob::new(news.clone(), Arc::new(StaticSource::new(items(3))))
        .with_analysis(Analyst::new(client, 50), reports.clone());

    job.run().await.unwrap();
    let report = reports.latest().expect("report saved");
    assert_eq!(report.news_count, 3);
    assert!(report.text.contains("KOSPI update 0"));
}

#[tokio::test]
async fn failed_analysis_is_not_a_job_failure() {
    let dir = tempfile::tempdir().unwrap();
    let news = NewsStore::new(dir.path().join("news.json"), 1000);
    let reports = ReportStore::new(dir.path().join("reports.json"), 10);
    let job = IngestJob::new(news.clone(), Arc::new(StaticSource::new(items(2))))
        .with_analysis(Analyst::new(Arc::new(Quota), 50), reports.clone());

    job.run().await.unwrap();
    assert_eq!(news.load().len(), 2);
    assert!(reports.latest().is_none());
}

#[tokio::test]
async fn source_error_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let news = NewsStore::new(dir.path().join("news.json"), 1000);
    let job = IngestJob::new(news.clone(), Arc::new(Down));
    let err = job.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("connection refused"));
    assert!(news.load().is_empty());
}
