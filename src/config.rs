use crate::error::{AppError, Result};

pub const SOCIAL_API_URL: &str = "https://api.twitter.com";
pub const ANALYTICS_API_URL: &str = "https://api-v2.flipsidecrypto.xyz";

/// Wrapped SOL mint — the reference asset every tracked swap must pair against.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Maximum timeline pages fetched per run. A fixed cap, not a timeout.
pub const MAX_TIMELINE_PAGES: usize = 10;

/// Posts requested per timeline page (the API maximum).
pub const TIMELINE_PAGE_SIZE: usize = 100;

/// Flat delay between successive timeline pages, to stay inside the social
/// API's rate limits. Not an adaptive backoff.
pub const PAGE_DELAY_MS: u64 = 1_000;

/// Market window around the earliest mention: [t - 2h, t + 24h].
pub const WINDOW_BEFORE_HOURS: i64 = 2;
pub const WINDOW_AFTER_HOURS: i64 = 24;

/// Delay between analytics result polls, and the poll cap.
pub const QUERY_POLL_DELAY_MS: u64 = 2_000;
pub const QUERY_POLL_MAX_ATTEMPTS: usize = 60;

/// Per-request HTTP timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Social API bearer credential (X_BEARER_TOKEN). Required.
    pub bearer_token: String,
    /// Analytics warehouse API key (FLIPSIDE_API_KEY). Required.
    pub analytics_api_key: String,
    pub social_api_url: String,
    pub analytics_api_url: String,
    pub log_level: String,
    /// Max pagination continuations per timeline fetch (MAX_TIMELINE_PAGES).
    pub max_timeline_pages: usize,
    /// Inter-page sleep in milliseconds (PAGE_DELAY_MS).
    pub page_delay_ms: u64,
}

impl Config {
    /// Load once at process start and validate before first use. Both secrets
    /// are required up front so a missing credential surfaces as an
    /// authentication failure rather than a mid-run crash.
    pub fn from_env() -> Result<Self> {
        let bearer_token = std::env::var("X_BEARER_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Auth("X_BEARER_TOKEN is not set".to_string()))?;
        let analytics_api_key = std::env::var("FLIPSIDE_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Auth("FLIPSIDE_API_KEY is not set".to_string()))?;

        Ok(Self {
            bearer_token,
            analytics_api_key,
            social_api_url: std::env::var("SOCIAL_API_URL")
                .unwrap_or_else(|_| SOCIAL_API_URL.to_string()),
            analytics_api_url: std::env::var("ANALYTICS_API_URL")
                .unwrap_or_else(|_| ANALYTICS_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            max_timeline_pages: std::env::var("MAX_TIMELINE_PAGES")
                .unwrap_or_else(|_| MAX_TIMELINE_PAGES.to_string())
                .parse::<usize>()
                .map_err(|_| {
                    AppError::Config("MAX_TIMELINE_PAGES must be a positive integer".to_string())
                })?,
            page_delay_ms: std::env::var("PAGE_DELAY_MS")
                .unwrap_or_else(|_| PAGE_DELAY_MS.to_string())
                .parse::<u64>()
                .unwrap_or(PAGE_DELAY_MS),
        })
    }
}
