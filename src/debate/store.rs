// src/debate/store.rs
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::debate::types::DebateLog;
use crate::storage::BoundedLog;

pub const DEFAULT_DEBATE_LOG_CAP: usize = 10;

/// Most-recent-first debate history, capped and atomically replaced on every append.
#[derive(Debug, Clone)]
pub struct DebateLogStore {
    log: BoundedLog<DebateLog>,
}

impl DebateLogStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            log: BoundedLog::new(path, cap),
        }
    }

    pub fn append(&self, entry: DebateLog) -> Result<()> {
        let ts = entry.timestamp.clone();
        self.log.append(entry)?;
        info!(target: "debate", timestamp = %ts, path = %self.log.path().display(), "debate log saved");
        Ok(())
    }

    pub fn latest(&self) -> Option<DebateLog> {
        self.log.latest()
    }

    pub fn all(&self) -> Vec<DebateLog> {
        self.log.load()
    }

    pub fn cap(&self) -> usize {
        self.log.cap()
    }
}
