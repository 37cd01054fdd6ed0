use std::env;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_COMPETITION: &str = "PL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Api,
    Fake,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub competitions: Vec<String>,
    pub live_poll: Duration,
    pub idle_poll: Duration,
    pub details_poll: Duration,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub max_pages: usize,
    pub feed: FeedSource,
    pub persist_clocks: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: None,
            competitions: vec![DEFAULT_COMPETITION.to_string()],
            live_poll: Duration::from_secs(15),
            idle_poll: Duration::from_secs(60),
            details_poll: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            page_size: 50,
            max_pages: 20,
            feed: FeedSource::Api,
            persist_clocks: true,
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call after `dotenvy` has run.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key).and_then(|val| {
                let trimmed = val.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };
        let secs = |key: &str, default: u64, min: u64| {
            let val = get(key)
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(default)
                .max(min);
            Duration::from_secs(val)
        };

        let api_base_url = get("API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        let competitions = get("COMPETITIONS")
            .map(|raw| parse_competitions(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.competitions);
        let feed = match get("FEED").map(|val| val.to_lowercase()).as_deref() {
            Some("fake") | Some("demo") | Some("sim") => FeedSource::Fake,
            _ => FeedSource::Api,
        };
        let persist_clocks = !matches!(
            get("CLOCK_PERSIST").map(|val| val.to_lowercase()).as_deref(),
            Some("0") | Some("false") | Some("off") | Some("no")
        );

        Self {
            api_base_url,
            api_token: get("API_TOKEN"),
            competitions,
            live_poll: secs("LIVE_POLL_SECS", 15, 5),
            idle_poll: secs("IDLE_POLL_SECS", 60, 15),
            details_poll: secs("DETAILS_POLL_SECS", 30, 10),
            request_timeout: secs("HTTP_TIMEOUT_SECS", 10, 2),
            page_size: get("PAGE_SIZE")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(defaults.page_size)
                .clamp(1, 200),
            max_pages: get("MAX_PAGES")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(defaults.max_pages)
                .clamp(1, 100),
            feed,
            persist_clocks,
        }
    }

    pub fn auth_headers(&self) -> Vec<(String, String)> {
        match &self.api_token {
            Some(token) => vec![("X-Auth-Token".to_string(), token.clone())],
            None => Vec::new(),
        }
    }
}

fn parse_competitions(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split([',', ' ', ';']) {
        let code = part.trim().to_uppercase();
        if code.is_empty() || out.contains(&code) {
            continue;
        }
        out.push(code);
    }
    out
}
