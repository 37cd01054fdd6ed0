use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Paginated list envelope returned by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct Page<T> {
    #[serde(default, alias = "items", alias = "data")]
    pub results: Vec<T>,
    #[serde(default, alias = "total")]
    pub count: Option<usize>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            count: None,
            next: None,
            previous: None,
        }
    }
}

pub fn parse_page<T: DeserializeOwned>(raw: &str) -> Result<Page<T>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Page::default());
    }
    // Some endpoints skip the envelope and return a bare array.
    if trimmed.starts_with('[') {
        let results: Vec<T> = serde_json::from_str(trimmed).context("invalid list json")?;
        return Ok(Page {
            count: Some(results.len()),
            results,
            next: None,
            previous: None,
        });
    }
    serde_json::from_str(trimmed).context("invalid page json")
}

/// Sets `page` and `page_size` on `base`, replacing any existing values.
pub fn page_url(base: &str, page: usize, page_size: usize) -> String {
    let (path, query) = match base.split_once('?') {
        Some((path, query)) => (path, query),
        None => (base, ""),
    };
    let mut params: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            key != "page" && key != "page_size"
        })
        .map(|pair| pair.to_string())
        .collect();
    params.push(format!("page={page}"));
    params.push(format!("page_size={page_size}"));
    format!("{path}?{}", params.join("&"))
}

/// Turns a `next` link into an absolute URL. Relative links resolve against
/// the origin (leading `/`) or the current query (leading `?`).
pub fn resolve_next(current_url: &str, next: &str) -> Option<String> {
    let next = next.trim();
    if next.is_empty() {
        return None;
    }
    if next.starts_with("http://") || next.starts_with("https://") {
        return Some(next.to_string());
    }
    if let Some(query) = next.strip_prefix('?') {
        let path = current_url.split('?').next().unwrap_or(current_url);
        return Some(format!("{path}?{query}"));
    }
    let origin = origin_of(current_url)?;
    if next.starts_with('/') {
        Some(format!("{origin}{next}"))
    } else {
        let path = current_url.split('?').next().unwrap_or(current_url);
        let dir = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(path);
        Some(format!("{dir}/{next}"))
    }
}

fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    let rest = &url[scheme_end..];
    let host_end = rest.find('/').map(|idx| scheme_end + idx).unwrap_or(url.len());
    Some(&url[..host_end])
}

/// Walks `next` links starting at `first_url` and concatenates every page.
/// `fetch` performs one GET and returns the body.
pub fn fetch_all_pages<T, F>(first_url: &str, max_pages: usize, mut fetch: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: FnMut(&str) -> Result<String>,
{
    let mut out = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut url = first_url.to_string();

    for page_no in 1..=max_pages.max(1) {
        if !seen.insert(url.clone()) {
            break;
        }
        let body = fetch(&url).with_context(|| format!("page {page_no} ({url})"))?;
        let page: Page<T> = parse_page(&body).with_context(|| format!("page {page_no}"))?;
        let empty = page.results.is_empty();
        out.extend(page.results);
        if let Some(total) = page.count
            && out.len() >= total
        {
            break;
        }
        let Some(next) = page.next.as_deref().and_then(|next| resolve_next(&url, next)) else {
            break;
        };
        if empty {
            break;
        }
        url = next;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_replaces_existing_paging() {
        assert_eq!(
            page_url("http://h/api/matches?competition=PL&page=4", 1, 50),
            "http://h/api/matches?competition=PL&page=1&page_size=50"
        );
        assert_eq!(
            page_url("http://h/api/scorers", 2, 10),
            "http://h/api/scorers?page=2&page_size=10"
        );
    }

    #[test]
    fn resolve_next_handles_relative_links() {
        let current = "https://api.test/v1/matches?page=1";
        assert_eq!(
            resolve_next(current, "https://api.test/v1/matches?page=2").as_deref(),
            Some("https://api.test/v1/matches?page=2")
        );
        assert_eq!(
            resolve_next(current, "/v1/matches?page=2").as_deref(),
            Some("https://api.test/v1/matches?page=2")
        );
        assert_eq!(
            resolve_next(current, "?page=2").as_deref(),
            Some("https://api.test/v1/matches?page=2")
        );
        assert_eq!(
            resolve_next(current, "matches?page=2").as_deref(),
            Some("https://api.test/v1/matches?page=2")
        );
        assert_eq!(resolve_next(current, "  "), None);
    }
}
