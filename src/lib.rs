pub mod api;
pub mod clock_store;
pub mod config;
pub mod fake_feed;
pub mod feed;
pub mod http_cache;
pub mod http_client;
pub mod live_clock;
pub mod pagination;
pub mod persist;
pub mod state;
pub mod views;
