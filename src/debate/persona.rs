// src/debate/persona.rs
//! Fixed persona profiles and the prompt templates built from them.

use crate::debate::types::Opinion;
use crate::news::NewsItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    Bull,
    Bear,
    Analyst,
    Moderator,
}

impl Persona {
    pub fn label(self) -> &'static str {
        match self {
            Persona::Bull => "Bull AI (optimist)",
            Persona::Bear => "Bear AI (pessimist)",
            Persona::Analyst => "Analyst AI (neutral analyst)",
            Persona::Moderator => "Moderator AI (chief strategist)",
        }
    }

    pub fn instructions(self) -> &'static str {
        match self {
            Persona::Bull => {
                "You are an optimistic investment expert who always looks for opportunity.\n\
                 - Find positive signals and investment opportunities in the news.\n\
                 - Recommend sectors and stocks with upside potential.\n\
                 - No unfounded optimism: stay grounded in the news data.\n\
                 - Be concise; bullet points only."
            }
            Persona::Bear => {
                "You are a conservative investment expert who sees through risk.\n\
                 - Find warning signs and hidden negatives in the market.\n\
                 - Warn about overheated sectors and stocks to avoid.\n\
                 - Only well-founded pessimism.\n\
                 - Be concise; bullet points only."
            }
            Persona::Analyst => {
                "You are a neutral, data-driven market analyst.\n\
                 - Leave emotion out; focus on data and facts.\n\
                 - Assess the impact of each news item quantitatively.\n\
                 - Verify the claims of both the Bull and the Bear side.\n\
                 - Be concise; bullet points only."
            }
            Persona::Moderator => {
                "You are the chief strategist of an investment advisory firm.\n\
                 - Synthesize the opinions of Bull, Bear and Analyst.\n\
                 - Where they conflict, adopt the better-supported argument.\n\
                 - Write the final investment guide."
            }
        }
    }

    fn round1_task(self) -> &'static str {
        match self {
            Persona::Bull => "Based on the news above, analyze the investment opportunities.",
            Persona::Bear => "Based on the news above, analyze the risks and points of caution.",
            Persona::Analyst | Persona::Moderator => {
                "Based on the news above, give an objective market analysis."
            }
        }
    }
}

/// Enumerated, source-tagged headline list, newest first.
pub fn render_news_block(items: &[NewsItem]) -> String {
    let mut out = String::new();
    for (i, it) in items.iter().enumerate() {
        let source = if it.source.trim().is_empty() {
            "unknown source"
        } else {
            it.source.as_str()
        };
        let title = if it.title.trim().is_empty() {
            "untitled"
        } else {
            it.title.as_str()
        };
        out.push_str(&format!("{}. [{}] {}\n", i + 1, source, title));
    }
    out
}

/// Opinion body as it appears inside a later prompt.
pub fn render_opinion(op: Option<&Opinion>) -> String {
    match op {
        Some(Opinion::Ok { text }) => text.clone(),
        Some(Opinion::Failed { reason }) => format!("(opinion unavailable: {reason})"),
        None => "(opinion unavailable)".to_string(),
    }
}

pub fn round1_prompt(persona: Persona, now: &str, news_block: &str) -> String {
    format!(
        "Current time: {now}\n{}\n\n**Today's news:**\n{news_block}\n{}",
        persona.instructions(),
        persona.round1_task()
    )
}

pub fn bull_rebuttal_prompt(bear_opinion: &str) -> String {
    format!(
        "You are an optimistic investment expert.\n\
         Bear AI raised the following risks:\n\n\
         **Bear AI opinion:**\n{bear_opinion}\n\n\
         Point out what is exaggerated or wrong in this opinion and argue why the market still offers opportunity.\n\
         No unfounded rebuttals: explain your reasoning."
    )
}

pub fn bear_rebuttal_prompt(bull_opinion: &str) -> String {
    format!(
        "You are a conservative investment expert.\n\
         Bull AI presented the following opportunities:\n\n\
         **Bull AI opinion:**\n{bull_opinion}\n\n\
         Point out the danger in the optimistic parts of this opinion and argue why caution is needed.\n\
         No unfounded pessimism: explain your reasoning."
    )
}

pub fn analyst_verdict_prompt(bull: &str, bear: &str, bull_rebuttal: &str, bear_rebuttal: &str) -> String {
    format!(
        "You are a neutral market analyst.\n\
         Review the debate between Bull and Bear.\n\n\
         **Bull AI original opinion:**\n{bull}\n\n\
         **Bear AI original opinion:**\n{bear}\n\n\
         **Bull rebuttal:**\n{bull_rebuttal}\n\n\
         **Bear rebuttal:**\n{bear_rebuttal}\n\n\
         Objectively assess whose argument is more convincing and where both sides can agree."
    )
}

/// Texts of both rounds, in the order the moderator template lists them.
pub struct Transcript<'a> {
    pub bull: &'a str,
    pub bear: &'a str,
    pub analyst: &'a str,
    pub bull_rebuttal: &'a str,
    pub bear_rebuttal: &'a str,
    pub analyst_verdict: &'a str,
}

pub fn moderator_prompt(now: &str, t: &Transcript<'_>) -> String {
    format!(
        r#"{instructions}
You are acting as the CIO. Consolidate today's AI debate into a final investment guide.

=== Debate transcript ===

**[Round 1: Independent analysis]**

Bull AI:
{bull}

Bear AI:
{bear}

Analyst AI:
{analyst}

**[Round 2: Rebuttal]**

Bull rebuttal:
{bull_rebuttal}

Bear rebuttal:
{bear_rebuttal}

Analyst verdict:
{analyst_verdict}

=== Requirements ===
1. Integrate the debate logically.
2. Separate points of consensus from points of disagreement.
3. Give a clear final recommendation.
4. Rate your confidence from 1 to 10.

**Report format (Markdown):**

# AI Debate Report ({now})

## Consensus
* (what Bull, Bear and Analyst agree on)

## Disagreements
* (where opinions split and each side's position)

## Sector outlook
### 맑음 (expected beneficiaries)
* **[sector]**: reason
  * *related tickers: ...*

### 흐림 (caution)
* **[sector]**: reason
  * *related tickers: ...*

## Final recommendation
* (concrete buy / sell / hold guidance)
* **Confidence: X/10** (why)

---
**[Chart data]**
```json
[
  {{"sector": "Semiconductors", "sentiment": "맑음", "score": 8, "reason": "reason", "tickers": ["Samsung Electronics"]}},
  {{"sector": "Batteries", "sentiment": "흐림", "score": 4, "reason": "reason", "tickers": ["LG Energy Solution"]}}
]
```
"#,
        instructions = Persona::Moderator.instructions(),
        bull = t.bull,
        bear = t.bear,
        analyst = t.analyst,
        bull_rebuttal = t.bull_rebuttal,
        bear_rebuttal = t.bear_rebuttal,
        analyst_verdict = t.analyst_verdict,
    )
}
