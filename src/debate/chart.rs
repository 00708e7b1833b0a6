// src/debate/chart.rs
//! Sector chart data embedded in the moderator's final report as a ```json fence.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorOutlook {
    pub sector: String,
    /// "맑음" / "흐림" style label; kept as free text.
    pub sentiment: String,
    pub score: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub tickers: Vec<String>,
}

/// First ```json fenced block, parsed. Absent or malformed payloads yield an empty list.
pub fn extract_chart_data(report: &str) -> Vec<SectorOutlook> {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("static regex"));

    let Some(payload) = re.captures(report).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<SectorOutlook>>(payload.as_str()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(target: "debate", error = %e, "malformed chart payload");
            Vec::new()
        }
    }
}
