// src/storage.rs
//! JSON file persistence: atomic replace-on-write and a bounded, most-recent-first log.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

/// Serialize `value` as pretty JSON into a fresh temp file beside `path`, fsync it,
/// then rename over `path`. Readers see either the old document or the new one.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating data dir {}", dir.display()))?;

    let json = serde_json::to_vec_pretty(value).context("serializing json document")?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Run `f` while holding the process-wide write lock for `path`.
///
/// Every read-modify-write on a store goes through here, so concurrent handlers
/// (and separate store instances over the same file) never lose updates.
pub fn with_path_lock<R>(path: &Path, f: impl FnOnce() -> R) -> R {
    static LOCKS: OnceCell<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceCell::new();
    let lock = {
        let mut map = LOCKS
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(path.to_path_buf()).or_default().clone()
    };
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    f()
}

/// Strict read: errors on missing file or bad JSON.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))
}

/// Lenient read used on every load path: a missing store is silently the default,
/// a corrupt one is logged and also treated as the default.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    match read_json(path) {
        Ok(v) => v,
        Err(e) => {
            warn!(target: "storage", error = ?e, path = %path.display(), "unreadable store, using default");
            T::default()
        }
    }
}

/// Persisted, capped, most-recent-first collection.
///
/// `append` never mutates the stored list in place: it builds the new bounded
/// snapshot and replaces the file atomically.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    path: PathBuf,
    cap: usize,
    _entry: PhantomData<fn() -> T>,
}

impl<T> BoundedLog<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap: cap.max(1),
            _entry: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn load(&self) -> Vec<T> {
        read_json_or_default(&self.path)
    }

    pub fn append(&self, entry: T) -> Result<()> {
        with_path_lock(&self.path, || {
            let next = prepend_capped(entry, self.load(), self.cap);
            write_json_atomic(&self.path, &next)
        })
    }

    pub fn latest(&self) -> Option<T> {
        self.load().into_iter().next()
    }
}

/// New head followed by the newest `cap - 1` existing entries.
pub fn prepend_capped<T>(head: T, existing: Vec<T>, cap: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(cap.min(existing.len() + 1));
    out.push(head);
    out.extend(existing.into_iter().take(cap.saturating_sub(1)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_capped_keeps_newest_first() {
        let v = prepend_capped(9, vec![8, 7, 6], 3);
        assert_eq!(v, vec![9, 8, 7]);
    }

    #[test]
    fn missing_and_corrupt_files_fall_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let v: Vec<u32> = read_json_or_default(&missing);
        assert!(v.is_empty());

        let corrupt = dir.path().join("bad.json");
        fs::write(&corrupt, "[1, 2,").unwrap();
        let v: Vec<u32> = read_json_or_default(&corrupt);
        assert!(v.is_empty());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("x.json");
        write_json_atomic(&p, &vec!["a", "b"]).unwrap();
        assert!(p.exists());
        let leftovers = fs::read_dir(p.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1, "only the target file remains");
        let back: Vec<String> = read_json(&p).unwrap();
        assert_eq!(back, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn bounded_log_caps_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let log: BoundedLog<u32> = BoundedLog::new(dir.path().join("log.json"), 3);
        assert!(log.latest().is_none());
        for i in 0..5 {
            log.append(i).unwrap();
        }
        assert_eq!(log.load(), vec![4, 3, 2]);
        assert_eq!(log.latest(), Some(4));
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let log: BoundedLog<u32> = BoundedLog::new(dir.path().join("log.json"), 100);
        std::thread::scope(|s| {
            for i in 0..16 {
                let log = log.clone();
                s.spawn(move || log.append(i).unwrap());
            }
        });
        let mut got = log.load();
        got.sort();
        assert_eq!(got, (0..16).collect::<Vec<_>>());
    }
}
