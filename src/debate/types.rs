// src/debate/types.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Outcome of one persona call. Failure is a tag, never an "Error: ..." string in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Opinion {
    Ok { text: String },
    Failed { reason: String },
}

impl Opinion {
    pub fn ok(text: impl Into<String>) -> Self {
        Opinion::Ok { text: text.into() }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Opinion::Failed {
            reason: reason.into(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Opinion::Ok { text } => Some(text),
            Opinion::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Opinion::Ok { .. })
    }
}

impl From<Result<String, ModelError>> for Opinion {
    fn from(r: Result<String, ModelError>) -> Self {
        match r {
            Ok(text) => Opinion::Ok { text },
            Err(e) => Opinion::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Opinion slot within a round. Serialized as the snake_case map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bull,
    Bear,
    Analyst,
    BullRebuttal,
    BearRebuttal,
    AnalystVerdict,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Bull => "bull",
            Role::Bear => "bear",
            Role::Analyst => "analyst",
            Role::BullRebuttal => "bull_rebuttal",
            Role::BearRebuttal => "bear_rebuttal",
            Role::AnalystVerdict => "analyst_verdict",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    #[serde(rename = "round")]
    pub index: u32,
    pub title: String,
    pub opinions: BTreeMap<Role, Opinion>,
}

impl Round {
    pub fn new(index: u32, title: &str) -> Self {
        Self {
            index,
            title: title.to_string(),
            opinions: BTreeMap::new(),
        }
    }

    pub fn opinion(&self, role: Role) -> Option<&Opinion> {
        self.opinions.get(&role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateLog {
    /// RFC 3339, captured once at the start of the run.
    pub timestamp: String,
    pub news_count: usize,
    pub rounds: Vec<Round>,
    pub final_report: Opinion,
}

impl DebateLog {
    pub fn final_report_text(&self) -> Option<&str> {
        self.final_report.text()
    }
}
