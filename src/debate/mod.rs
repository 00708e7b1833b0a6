// src/debate/mod.rs
//! Multi-round persona debate: independent analysis, rebuttal, moderator synthesis.
//!
//! Calls are strictly sequential (shared upstream rate limits). A failed persona
//! call is recorded as `Opinion::Failed` in its slot and the run continues; only
//! an empty input set (or cancellation) aborts.

pub mod chart;
pub mod persona;
pub mod store;
pub mod types;

use std::time::{Duration, Instant};

use chrono::Local;
use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::model::DynModelClient;
use crate::news::{most_recent, NewsItem};
use persona::{Persona, Transcript};
pub use store::DebateLogStore;
pub use types::{DebateLog, Opinion, Role, Round};

pub const DEFAULT_NEWS_WINDOW: usize = 50;
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebateError {
    #[error("no news items to debate")]
    InsufficientInput,
    #[error("debate cancelled")]
    Cancelled,
}

/// Milestones reported through the progress callback, in run order.
mod milestone {
    pub const ROUND1: f32 = 0.10;
    pub const BULL: f32 = 0.15;
    pub const BEAR: f32 = 0.25;
    pub const ANALYST: f32 = 0.35;
    pub const ROUND2: f32 = 0.45;
    pub const BULL_REBUTTAL: f32 = 0.50;
    pub const BEAR_REBUTTAL: f32 = 0.60;
    pub const VERDICT: f32 = 0.70;
    pub const MODERATOR: f32 = 0.85;
    pub const DONE: f32 = 1.0;
}

pub struct DebateOrchestrator {
    client: DynModelClient,
    pacing: Duration,
    news_window: usize,
}

/// Per-run bookkeeping: pacing between calls and cancellation checkpoints.
struct RunCtx<'a> {
    cancel: &'a CancellationToken,
    calls: usize,
}

impl DebateOrchestrator {
    pub fn new(client: DynModelClient) -> Self {
        Self {
            client,
            pacing: DEFAULT_PACING,
            news_window: DEFAULT_NEWS_WINDOW,
        }
    }

    /// Courtesy delay inserted between consecutive model calls.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_news_window(mut self, window: usize) -> Self {
        self.news_window = window.max(1);
        self
    }

    pub async fn run_debate<F>(&self, news: &[NewsItem], progress: F) -> Result<DebateLog, DebateError>
    where
        F: FnMut(&str, f32) + Send,
    {
        self.run_debate_with_cancel(news, progress, &CancellationToken::new())
            .await
    }

    /// Like `run_debate`, but `cancel` is honoured before every persona call and
    /// during pacing delays. An in-flight call is never interrupted.
    pub async fn run_debate_with_cancel<F>(
        &self,
        news: &[NewsItem],
        mut progress: F,
        cancel: &CancellationToken,
    ) -> Result<DebateLog, DebateError>
    where
        F: FnMut(&str, f32) + Send,
    {
        if news.is_empty() {
            return Err(DebateError::InsufficientInput);
        }
        let t0 = Instant::now();
        let started = Local::now();
        let now = started.format("%Y-%m-%d %H:%M").to_string();
        let selected = most_recent(news, self.news_window);
        let news_block = persona::render_news_block(&selected);
        let mut ctx = RunCtx { cancel, calls: 0 };

        info!(
            target: "debate",
            news = news.len(),
            rendered = selected.len(),
            provider = self.client.provider_name(),
            "debate started"
        );

        let outcome = self
            .run_stages(&now, &news_block, &mut progress, &mut ctx)
            .await;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("debate_duration_ms").record(ms);

        let (rounds, final_report) = match outcome {
            Ok(v) => v,
            Err(e) => {
                counter!("debate_runs_total", "outcome" => "cancelled").increment(1);
                warn!(target: "debate", error = %e, calls = ctx.calls, "debate aborted");
                return Err(e);
            }
        };

        counter!("debate_runs_total", "outcome" => "completed").increment(1);
        progress("Debate complete", milestone::DONE);
        info!(
            target: "debate",
            calls = ctx.calls,
            report_ok = final_report.is_ok(),
            elapsed_ms = ms as u64,
            "debate finished"
        );

        Ok(DebateLog {
            timestamp: started.to_rfc3339(),
            news_count: news.len(),
            rounds,
            final_report,
        })
    }

    async fn run_stages<F>(
        &self,
        now: &str,
        news_block: &str,
        progress: &mut F,
        ctx: &mut RunCtx<'_>,
    ) -> Result<(Vec<Round>, Opinion), DebateError>
    where
        F: FnMut(&str, f32) + Send,
    {
        // Round 1: independent analysis
        progress("Round 1: each AI analyzes the news independently", milestone::ROUND1);
        let mut round1 = Round::new(1, "Independent analysis");
        for (persona, role, msg, frac) in [
            (Persona::Bull, Role::Bull, "Bull AI is looking for opportunities", milestone::BULL),
            (Persona::Bear, Role::Bear, "Bear AI is assessing risks", milestone::BEAR),
            (Persona::Analyst, Role::Analyst, "Analyst AI is running a neutral analysis", milestone::ANALYST),
        ] {
            progress(msg, frac);
            let prompt = persona::round1_prompt(persona, now, news_block);
            let op = self.ask(role, &prompt, ctx).await?;
            round1.opinions.insert(role, op);
        }

        // Round 2: rebuttals reference the original round-1 opinions only
        progress("Round 2: the AIs rebut each other", milestone::ROUND2);
        let mut round2 = Round::new(2, "Rebuttal");

        progress("Bull AI is rebutting the Bear", milestone::BULL_REBUTTAL);
        let bull_rebuttal = match round1.opinion(Role::Bear).and_then(Opinion::text) {
            Some(bear) => {
                self.ask(Role::BullRebuttal, &persona::bull_rebuttal_prompt(bear), ctx)
                    .await?
            }
            None => skipped(Role::Bear),
        };
        round2.opinions.insert(Role::BullRebuttal, bull_rebuttal);

        progress("Bear AI is rebutting the Bull", milestone::BEAR_REBUTTAL);
        let bear_rebuttal = match round1.opinion(Role::Bull).and_then(Opinion::text) {
            Some(bull) => {
                self.ask(Role::BearRebuttal, &persona::bear_rebuttal_prompt(bull), ctx)
                    .await?
            }
            None => skipped(Role::Bull),
        };
        round2.opinions.insert(Role::BearRebuttal, bear_rebuttal);

        progress("Analyst AI is weighing both sides", milestone::VERDICT);
        let verdict_prompt = persona::analyst_verdict_prompt(
            &persona::render_opinion(round1.opinion(Role::Bull)),
            &persona::render_opinion(round1.opinion(Role::Bear)),
            &persona::render_opinion(round2.opinion(Role::BullRebuttal)),
            &persona::render_opinion(round2.opinion(Role::BearRebuttal)),
        );
        let verdict = self.ask(Role::AnalystVerdict, &verdict_prompt, ctx).await?;
        round2.opinions.insert(Role::AnalystVerdict, verdict);

        // Final synthesis
        progress("Moderator AI is writing the final report", milestone::MODERATOR);
        let texts: Vec<String> = [
            round1.opinion(Role::Bull),
            round1.opinion(Role::Bear),
            round1.opinion(Role::Analyst),
            round2.opinion(Role::BullRebuttal),
            round2.opinion(Role::BearRebuttal),
            round2.opinion(Role::AnalystVerdict),
        ]
        .into_iter()
        .map(persona::render_opinion)
        .collect();
        let transcript = Transcript {
            bull: &texts[0],
            bear: &texts[1],
            analyst: &texts[2],
            bull_rebuttal: &texts[3],
            bear_rebuttal: &texts[4],
            analyst_verdict: &texts[5],
        };
        let final_prompt = persona::moderator_prompt(now, &transcript);
        let final_report = self.call(&final_prompt, ctx).await?;
        if let Opinion::Failed { reason } = &final_report {
            warn!(target: "debate", %reason, "final report failed");
        }

        Ok((vec![round1, round2], final_report))
    }

    async fn ask(&self, role: Role, prompt: &str, ctx: &mut RunCtx<'_>) -> Result<Opinion, DebateError> {
        let op = self.call(prompt, ctx).await?;
        if let Opinion::Failed { reason } = &op {
            warn!(target: "debate", role = role.as_str(), %reason, "persona call failed");
        }
        Ok(op)
    }

    async fn call(&self, prompt: &str, ctx: &mut RunCtx<'_>) -> Result<Opinion, DebateError> {
        if ctx.calls > 0 && !self.pacing.is_zero() {
            tokio::select! {
                _ = ctx.cancel.cancelled() => return Err(DebateError::Cancelled),
                _ = tokio::time::sleep(self.pacing) => {}
            }
        }
        if ctx.cancel.is_cancelled() {
            return Err(DebateError::Cancelled);
        }
        ctx.calls += 1;
        Ok(self.client.generate(prompt).await.into())
    }
}

fn skipped(source: Role) -> Opinion {
    Opinion::failed(format!("skipped: {} opinion unavailable", source.as_str()))
}
