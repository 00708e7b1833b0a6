//! Model client: provider abstraction + retry with exponential backoff on rate limits.

pub mod providers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tracing::{info, warn};

use crate::config::ModelConfig;
pub use providers::{EchoProvider, GeminiProvider, OpenAiProvider};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Transient; the only class that is retried.
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model client disabled")]
    Disabled,
}

impl ModelError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ModelError::RateLimited(_))
    }
}

/// "Generate text from prompt", as seen by the debate orchestrator and analyst.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynModelClient = Arc<dyn ModelClient>;

/// Low-level provider: one *real* remote call, no retries. Separated so the same
/// retry wrapper serves production and tests.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------
// Retry policy + wrapper
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &ModelConfig) -> Self {
        Self {
            max_attempts: cfg.max_retries.max(1),
            base_delay: Duration::from_secs(cfg.backoff_base_secs),
        }
    }

    /// `base * 2^attempt`, attempt counted from 0.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub struct RetryingClient<P: Provider> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: Provider> RetryingClient<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<P: Provider> ModelClient for RetryingClient<P> {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let mut attempt = 0u32;
        loop {
            counter!("model_calls_total").increment(1);
            match self.inner.complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limit() && attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        target: "model",
                        provider = self.inner.name(),
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        "rate limited, backing off"
                    );
                    counter!("model_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(target: "model", provider = self.inner.name(), error = %e, "model call failed");
                    counter!("model_failures_total").increment(1);
                    return Err(e);
                }
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// Factory
// ------------------------------------------------------------

/// Build a client according to config and environment.
///
/// * `AI_TEST_MODE=mock` or provider "mock" → echo provider (deterministic).
/// * provider "disabled", an unknown provider or a missing key → `None`
///   (callers treat that as "no analysis capability").
/// * Otherwise the real provider wrapped in `RetryingClient`.
pub fn build_model_client(cfg: &ModelConfig) -> Option<DynModelClient> {
    let policy = RetryPolicy::from_config(cfg);
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let mock_env = std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);

    if mock_env || cfg.provider == "mock" {
        info!(target: "model", "using echo model client (mock mode)");
        return Some(Arc::new(RetryingClient::new(EchoProvider, policy)));
    }

    if !cfg.has_key() {
        warn!(target: "model", provider = %cfg.provider, "no api key configured, model disabled");
        return None;
    }

    let model = Some(cfg.model.as_str());
    let built: Result<DynModelClient, ModelError> = match cfg.provider.as_str() {
        "gemini" => GeminiProvider::new(&cfg.api_key, model, timeout)
            .map(|p| Arc::new(RetryingClient::new(p, policy)) as DynModelClient),
        "openai" => OpenAiProvider::new(&cfg.api_key, model, timeout)
            .map(|p| Arc::new(RetryingClient::new(p, policy)) as DynModelClient),
        _ => Err(ModelError::Disabled),
    };

    match built {
        Ok(c) => {
            info!(target: "model", provider = c.provider_name(), key_len = cfg.api_key.len(), "model client ready");
            Some(c)
        }
        Err(e) => {
            warn!(target: "model", provider = %cfg.provider, error = %e, "model client unavailable");
            None
        }
    }
}
