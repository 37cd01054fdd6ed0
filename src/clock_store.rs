use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::live_clock::ClockBaseline;
use crate::persist::cache_file;

const CLOCK_FILE: &str = "live_clock.json";
const CLOCK_VERSION: u32 = 1;
const KEY_PREFIX: &str = "live_clock:";
// Longer than any match including extra time and breaks.
const MAX_BASELINE_AGE_HOURS: i64 = 4;

/// Best-effort home of live clock baselines, keyed per match.
pub trait ClockStore: Send + Debug {
    fn load(&self, match_id: &str) -> Option<ClockBaseline>;
    fn save(&mut self, match_id: &str, baseline: ClockBaseline);
    fn clear(&mut self, match_id: &str);
}

pub fn storage_key(match_id: &str) -> String {
    format!("{KEY_PREFIX}{match_id}")
}

#[derive(Debug, Clone, Default)]
pub struct MemoryClockStore {
    entries: HashMap<String, ClockBaseline>,
}

impl MemoryClockStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ClockStore for MemoryClockStore {
    fn load(&self, match_id: &str) -> Option<ClockBaseline> {
        self.entries.get(&storage_key(match_id)).copied()
    }

    fn save(&mut self, match_id: &str, baseline: ClockBaseline) {
        self.entries.insert(storage_key(match_id), baseline);
    }

    fn clear(&mut self, match_id: &str) {
        self.entries.remove(&storage_key(match_id));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ClockFile {
    version: u32,
    entries: HashMap<String, ClockBaseline>,
}

/// Baselines mirrored to a JSON file so a restart picks up running clocks.
#[derive(Debug)]
pub struct FileClockStore {
    path: Option<PathBuf>,
    entries: HashMap<String, ClockBaseline>,
}

impl FileClockStore {
    pub fn open_default() -> Self {
        Self::open(cache_file(CLOCK_FILE))
    }

    pub fn open(path: Option<PathBuf>) -> Self {
        Self::open_at(path, Utc::now())
    }

    /// Loads the file and drops baselines of matches long over.
    pub fn open_at(path: Option<PathBuf>, now: DateTime<Utc>) -> Self {
        let entries = path
            .as_ref()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|raw| serde_json::from_str::<ClockFile>(&raw).ok())
            .filter(|file| file.version == CLOCK_VERSION)
            .map(|file| file.entries)
            .unwrap_or_default();
        let mut store = Self { path, entries };
        if store.prune_before(now.timestamp_millis()) {
            let _ = store.flush();
        }
        store
    }

    /// Removes baselines established more than a few hours before `now_ms`.
    fn prune_before(&mut self, now_ms: i64) -> bool {
        let cutoff = now_ms - Duration::hours(MAX_BASELINE_AGE_HOURS).num_milliseconds();
        let before = self.entries.len();
        self.entries
            .retain(|_, baseline| baseline.established_at_ms >= cutoff);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("create clock cache dir")?;
        }
        let file = ClockFile {
            version: CLOCK_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string(&file).context("serialize clock baselines")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write clock baselines")?;
        fs::rename(&tmp, path).context("swap clock baselines")?;
        Ok(())
    }
}

impl ClockStore for FileClockStore {
    fn load(&self, match_id: &str) -> Option<ClockBaseline> {
        self.entries.get(&storage_key(match_id)).copied()
    }

    fn save(&mut self, match_id: &str, baseline: ClockBaseline) {
        let key = storage_key(match_id);
        if self.entries.get(&key) == Some(&baseline) {
            return;
        }
        self.entries.insert(key, baseline);
        self.prune_before(baseline.established_at_ms);
        let _ = self.flush();
    }

    fn clear(&mut self, match_id: &str) {
        if self.entries.remove(&storage_key(match_id)).is_some() {
            let _ = self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("matchday_clock_{}_{name}", std::process::id()));
        path.push(CLOCK_FILE);
        path
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_path("reopen");
        let _ = fs::remove_file(&path);

        let opened_at = DateTime::from_timestamp(1, 0).expect("valid timestamp");
        let mut store = FileClockStore::open_at(Some(path.clone()), opened_at);
        store.save(
            "42",
            ClockBaseline {
                minute: 31,
                established_at_ms: 1_000,
            },
        );
        drop(store);

        let reopened = FileClockStore::open_at(Some(path.clone()), opened_at);
        assert_eq!(reopened.load("42").map(|b| b.minute), Some(31));
        assert!(reopened.load("43").is_none());

        let raw = fs::read_to_string(&path).expect("clock file written");
        assert!(raw.contains("live_clock:42"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn old_baselines_are_dropped() {
        let path = temp_path("prune");
        let _ = fs::remove_file(&path);
        let hour_ms = 3_600_000;
        let kickoff = DateTime::from_timestamp(100 * 3_600, 0).expect("valid timestamp");

        let mut store = FileClockStore::open_at(Some(path.clone()), kickoff);
        store.save(
            "finished_while_closed",
            ClockBaseline {
                minute: 70,
                established_at_ms: kickoff.timestamp_millis(),
            },
        );
        store.save(
            "later",
            ClockBaseline {
                minute: 10,
                established_at_ms: kickoff.timestamp_millis() + 3 * hour_ms,
            },
        );
        assert_eq!(store.len(), 2, "three hours apart is still kept");

        // Saving a much later baseline sweeps the stale entries.
        store.save(
            "next_day",
            ClockBaseline {
                minute: 3,
                established_at_ms: kickoff.timestamp_millis() + 24 * hour_ms,
            },
        );
        assert_eq!(store.len(), 1);
        drop(store);

        let reopened =
            FileClockStore::open_at(Some(path.clone()), kickoff + Duration::hours(48));
        assert!(reopened.is_empty());
        let raw = fs::read_to_string(&path).expect("clock file rewritten");
        assert!(!raw.contains("next_day"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn clear_removes_only_that_match() {
        let mut store = MemoryClockStore::default();
        let baseline = ClockBaseline {
            minute: 5,
            established_at_ms: 0,
        };
        store.save("a", baseline);
        store.save("b", baseline);
        store.clear("a");
        assert!(store.load("a").is_none());
        assert_eq!(store.load("b"), Some(baseline));
    }

    #[test]
    fn store_without_path_is_memory_only() {
        let mut store = FileClockStore::open(None);
        store.save(
            "x",
            ClockBaseline {
                minute: 1,
                established_at_ms: 0,
            },
        );
        assert_eq!(store.len(), 1);
    }
}
