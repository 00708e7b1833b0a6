// tests/model_backoff.rs
//
// Retry/backoff behaviour of RetryingClient under paused tokio time, so delays are exact.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use market_debate::model::{ModelClient, ModelError, Provider, RetryPolicy, RetryingClient};
use tokio::time::Instant;

/// Fails `failures` times with `err`, then answers "ok". Records call instants.
struct Scripted {
    failures: usize,
    err: ModelError,
    calls: Arc<Mutex<Vec<Instant>>>,
}

#[async_trait]
impl Provider for Scripted {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Instant::now());
        if calls.len() <= self.failures {
            Err(self.err.clone())
        } else {
            Ok("ok".to_string())
        }
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn client(failures: usize, err: ModelError) -> (RetryingClient<Scripted>, Arc<Mutex<Vec<Instant>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let p = Scripted {
        failures,
        err,
        calls: calls.clone(),
    };
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_secs(2),
    };
    (RetryingClient::new(p, policy), calls)
}

fn gaps(calls: &[Instant]) -> Vec<Duration> {
    calls.windows(2).map(|w| w[1] - w[0]).collect()
}

#[tokio::test(start_paused = true)]
async fn rate_limited_twice_then_succeeds_with_doubling_delays() {
    let (c, calls) = client(2, ModelError::RateLimited("429".into()));
    let out = c.generate("p").await;
    assert_eq!(out, Ok("ok".to_string()));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        gaps(&calls),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test(start_paused = true)]
async fn single_rate_limit_costs_one_base_delay() {
    let (c, calls) = client(1, ModelError::RateLimited("RESOURCE_EXHAUSTED".into()));
    assert!(c.generate("p").await.is_ok());
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(gaps(&calls), vec![Duration::from_secs(2)]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_rate_limit() {
    let (c, calls) = client(10, ModelError::RateLimited("429".into()));
    let out = c.generate("p").await;
    assert!(matches!(out, Err(ModelError::RateLimited(_))));
    // no sleep after the final attempt
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        gaps(&calls),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_is_not_retried() {
    let (c, calls) = client(1, ModelError::Upstream("400 bad request".into()));
    let start = Instant::now();
    let out = c.generate("p").await;
    assert_eq!(out, Err(ModelError::Upstream("400 bad request".into())));
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(Instant::now() - start, Duration::ZERO);
}
