use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::state::{AppState, MatchSummary, ScorerRow, StandingRow};

const CACHE_DIR: &str = "matchday_terminal";
const CACHE_FILE: &str = "cache.json";
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    competitions: HashMap<String, CompetitionCache>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CompetitionCache {
    #[serde(default)]
    matches: Vec<MatchSummary>,
    #[serde(default)]
    matches_fetched_at: Option<u64>,
    #[serde(default)]
    standings: Vec<StandingRow>,
    #[serde(default)]
    standings_fetched_at: Option<u64>,
    #[serde(default)]
    scorers: Vec<ScorerRow>,
    #[serde(default)]
    scorers_fetched_at: Option<u64>,
}

/// Fills the current competition's lists from the last saved snapshot.
/// Clocks are not synced here; they start from the first live poll.
pub fn load_into_state(state: &mut AppState) {
    let Some(path) = cache_file(CACHE_FILE) else {
        return;
    };
    load_into_state_from(state, &path);
}

pub fn load_into_state_from(state: &mut AppState, path: &Path) {
    let Some(cache) = load_cache_file(path) else {
        return;
    };
    if cache.version != CACHE_VERSION {
        return;
    }
    let Some(entry) = cache.competitions.get(state.competition()) else {
        return;
    };

    if state.matches.is_empty() {
        state.matches = entry.matches.clone();
        state.matches_fetched_at = entry.matches_fetched_at.and_then(system_time_from_secs);
        state.matches_stale = !state.matches.is_empty();
        state.sort_matches();
    }
    if state.standings.is_empty() {
        state.standings = entry.standings.clone();
        state.standings_fetched_at = entry.standings_fetched_at.and_then(system_time_from_secs);
    }
    if state.scorers.is_empty() {
        state.scorers = entry.scorers.clone();
        state.scorers_fetched_at = entry.scorers_fetched_at.and_then(system_time_from_secs);
    }
}

pub fn save_from_state(state: &AppState) {
    let Some(path) = cache_file(CACHE_FILE) else {
        return;
    };
    save_from_state_to(state, &path);
}

pub fn save_from_state_to(state: &AppState, path: &Path) {
    let Some(dir) = path.parent() else {
        return;
    };
    let _ = fs::create_dir_all(dir);

    let mut cache = load_cache_file(path)
        .filter(|cache| cache.version == CACHE_VERSION)
        .unwrap_or_default();
    cache.version = CACHE_VERSION;
    cache.competitions.insert(
        state.competition().to_string(),
        CompetitionCache {
            matches: state.matches.clone(),
            matches_fetched_at: state.matches_fetched_at.and_then(system_time_to_secs),
            standings: state.standings.clone(),
            standings_fetched_at: state.standings_fetched_at.and_then(system_time_to_secs),
            scorers: state.scorers.clone(),
            scorers_fetched_at: state.scorers_fetched_at.and_then(system_time_to_secs),
        },
    );

    if let Ok(json) = serde_json::to_string(&cache) {
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, path);
        }
    }
}

fn load_cache_file(path: &Path) -> Option<CacheFile> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<CacheFile>(&raw).ok()
}

/// Path of `name` inside the app cache dir.
pub fn cache_file(name: &str) -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(name));
    }
    // Fallback to ~/.cache on linux-like systems.
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(name))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

fn system_time_from_secs(secs: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(std::time::Duration::from_secs(secs))
}
