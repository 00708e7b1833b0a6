// src/news/feeds.rs
//! Registered feed list (`feeds.json`).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::storage::{read_json_or_default, with_path_lock, write_json_atomic};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct FeedStore {
    path: PathBuf,
}

impl FeedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn list(&self) -> Vec<Feed> {
        read_json_or_default(&self.path)
    }

    /// Returns false (and writes nothing) if the URL is already registered.
    pub fn add(&self, name: &str, url: &str, category: &str) -> Result<bool> {
        with_path_lock(&self.path, || {
            let mut feeds = self.list();
            if feeds.iter().any(|f| f.url == url) {
                return Ok(false);
            }
            feeds.push(Feed {
                name: name.trim().to_string(),
                url: url.trim().to_string(),
                category: category.trim().to_string(),
            });
            write_json_atomic(&self.path, &feeds)?;
            Ok(true)
        })
    }

    pub fn remove(&self, url: &str) -> Result<bool> {
        with_path_lock(&self.path, || {
            let mut feeds = self.list();
            let before = feeds.len();
            feeds.retain(|f| f.url != url);
            if feeds.len() == before {
                return Ok(false);
            }
            write_json_atomic(&self.path, &feeds)?;
            Ok(true)
        })
    }
}
