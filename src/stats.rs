//! Visitor counter persisted as `{"visitors": n}`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::storage::{read_json_or_default, with_path_lock, write_json_atomic};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    #[serde(default)]
    pub visitors: u64,
}

#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Stats {
        read_json_or_default(&self.path)
    }

    /// Call once per visitor session; returns the new total.
    pub fn increment_visitor_count(&self) -> Result<u64> {
        with_path_lock(&self.path, || {
            let mut s = self.load();
            s.visitors = s.visitors.saturating_add(1);
            write_json_atomic(&self.path, &s)?;
            Ok(s.visitors)
        })
    }
}
