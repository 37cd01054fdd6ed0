use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};

use crate::persist::cache_file;

const CACHE_VERSION: u32 = 1;
const CACHE_FILE: &str = "http_cache.json";
const MAX_ENTRIES: usize = 512;

static CACHE: Mutex<Option<HttpCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// Response body plus whether it came from the offline fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBody {
    pub body: String,
    pub stale: bool,
    pub fetched_at: Option<u64>,
}

pub fn fetch_json_cached(
    client: &Client,
    url: &str,
    extra_headers: &[(String, String)],
) -> Result<CachedBody> {
    let cached_entry = {
        let mut guard = CACHE.lock().expect("http cache lock poisoned");
        let cache = guard.get_or_insert_with(load_cache_file);
        cache.entries.get(url).cloned()
    };

    let mut req = client.get(url).header(ACCEPT, "application/json");
    for (name, value) in extra_headers {
        req = req.header(name.as_str(), value.as_str());
    }
    if let Some(entry) = cached_entry.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = match req.send() {
        Ok(resp) => resp,
        Err(err) => {
            // Offline: serve the last good body instead of an empty screen.
            if let Some(entry) = cached_entry {
                return Ok(CachedBody {
                    body: entry.body,
                    stale: true,
                    fetched_at: Some(entry.fetched_at),
                });
            }
            return Err(err).context("request failed");
        }
    };
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        if let Some(mut entry) = cached_entry {
            entry.fetched_at = now_secs();
            touch_cache_entry(url, entry.fetched_at);
            return Ok(CachedBody {
                body: entry.body,
                stale: false,
                fetched_at: Some(entry.fetched_at),
            });
        }
        return Err(anyhow::anyhow!("received 304 without cache body"));
    }

    let body = resp.text().context("failed reading body")?;
    if status.is_server_error()
        && let Some(entry) = cached_entry
    {
        return Ok(CachedBody {
            body: entry.body,
            stale: true,
            fetched_at: Some(entry.fetched_at),
        });
    }
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, truncate(&body, 200)));
    }

    let etag = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let fetched_at = now_secs();
    refresh_cache_entry(
        url,
        CacheEntry {
            body: body.clone(),
            etag,
            last_modified,
            fetched_at,
        },
    );
    Ok(CachedBody {
        body,
        stale: false,
        fetched_at: Some(fetched_at),
    })
}

fn refresh_cache_entry(key: &str, entry: CacheEntry) {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache.entries.insert(key.to_string(), entry);
    evict_oldest(&mut cache.entries, MAX_ENTRIES);
    let _ = save_cache_file(cache);
}

// A 304 only moves `fetched_at`; the file catches up on the next full write.
fn touch_cache_entry(key: &str, fetched_at: u64) {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    touch_entry(&mut cache.entries, key, fetched_at);
}

fn touch_entry(entries: &mut HashMap<String, CacheEntry>, key: &str, fetched_at: u64) -> bool {
    match entries.get_mut(key) {
        Some(entry) => {
            entry.fetched_at = fetched_at;
            true
        }
        None => false,
    }
}

fn evict_oldest(entries: &mut HashMap<String, CacheEntry>, max: usize) {
    if entries.len() <= max {
        return;
    }
    let mut by_age: Vec<(String, u64)> = entries
        .iter()
        .map(|(key, entry)| (key.clone(), entry.fetched_at))
        .collect();
    by_age.sort_by_key(|(_, fetched_at)| *fetched_at);
    let excess = entries.len() - max;
    for (key, _) in by_age.into_iter().take(excess) {
        entries.remove(&key);
    }
}

fn load_cache_file() -> HttpCacheFile {
    let Some(path) = cache_file(CACHE_FILE) else {
        return HttpCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &HttpCacheFile) -> Result<()> {
    let Some(path) = cache_file(CACHE_FILE) else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

fn truncate(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(max_chars).collect();
    out.push('…');
    out
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fetched_at: u64) -> CacheEntry {
        CacheEntry {
            body: "{}".to_string(),
            etag: None,
            last_modified: None,
            fetched_at,
        }
    }

    #[test]
    fn eviction_drops_oldest_entries_first() {
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), entry(30));
        entries.insert("b".to_string(), entry(10));
        entries.insert("c".to_string(), entry(20));
        evict_oldest(&mut entries, 2);
        assert_eq!(entries.len(), 2);
        assert!(!entries.contains_key("b"));
    }

    #[test]
    fn not_modified_only_moves_the_timestamp() {
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), entry(10));
        assert!(touch_entry(&mut entries, "a", 99));
        assert_eq!(entries["a"].fetched_at, 99);
        assert_eq!(entries["a"].body, "{}");
        assert!(!touch_entry(&mut entries, "missing", 99));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
