// src/config/mod.rs
pub mod ai;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use ai::ModelConfig;

pub const ENV_CONFIG_PATH: &str = "MARKET_DEBATE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// Application config. Every field has a default so a partial (or absent) file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub interval_secs: u64,
    pub news_cap: usize,
    pub debate_log_cap: usize,
    pub report_cap: usize,
    /// Same-day items required before the API lets a debate run.
    pub min_debate_news: usize,
    /// Most-recent items rendered into debate/analysis prompts.
    pub debate_news_window: usize,
    pub max_per_source: usize,
    pub model: ModelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            interval_secs: 600,
            news_cap: 1000,
            debate_log_cap: 10,
            report_cap: 10,
            min_debate_news: 5,
            debate_news_window: 50,
            max_per_source: 30,
            model: ModelConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing app config toml")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading app config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// 1) $MARKET_DEBATE_CONFIG (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from_file(PathBuf::from(p));
        }
        let p = Path::new(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(p);
        }
        Ok(Self::default().sanitized())
    }

    fn sanitized(mut self) -> Self {
        let d = Self::default();
        if self.interval_secs == 0 {
            self.interval_secs = d.interval_secs;
        }
        if self.news_cap == 0 {
            self.news_cap = d.news_cap;
        }
        if self.debate_log_cap == 0 {
            self.debate_log_cap = d.debate_log_cap;
        }
        if self.report_cap == 0 {
            self.report_cap = d.report_cap;
        }
        if self.debate_news_window == 0 {
            self.debate_news_window = d.debate_news_window;
        }
        if self.max_per_source == 0 {
            self.max_per_source = d.max_per_source;
        }
        self.model = self.model.normalized();
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn news_path(&self) -> PathBuf {
        self.data_dir.join("news.json")
    }
    pub fn debates_path(&self) -> PathBuf {
        self.data_dir.join("debates.json")
    }
    pub fn reports_path(&self) -> PathBuf {
        self.data_dir.join("reports.json")
    }
    pub fn feeds_path(&self) -> PathBuf {
        self.data_dir.join("feeds.json")
    }
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join("stats.json")
    }
}
