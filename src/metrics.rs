use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Call once, from the binary.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("scheduler_runs_total", "Successful scheduler job runs.");
        describe_counter!(
            "scheduler_job_failures_total",
            "Scheduler job runs that ended in an error."
        );
        describe_gauge!("scheduler_last_run_ts", "Unix ts of the last successful job run.");
        describe_counter!("model_calls_total", "Model provider calls, including retries.");
        describe_counter!("model_retries_total", "Backoff retries after a rate limit.");
        describe_counter!("model_failures_total", "Model calls that surfaced an error.");
        describe_counter!("debate_runs_total", "Debate runs by outcome.");
        describe_histogram!("debate_duration_ms", "Wall time of a debate run in milliseconds.");
        describe_histogram!("ingest_fetch_ms", "RSS fetch + parse time in milliseconds.");

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus text format, merged into the app router by the binary.
    pub fn router(&self) -> Router {
        exposition_router(self.handle.clone())
    }
}

fn exposition_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
