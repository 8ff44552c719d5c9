use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// A single post from the user's timeline. `created_at` is optional: the API
/// can omit it, and a post without a timestamp sorts last and never anchors
/// a market window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Mentions
// ---------------------------------------------------------------------------

/// Earliest mention of one distinct candidate address. `earliest_at` is the
/// minimum `created_at` over all posts containing the address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionRecord {
    pub address: String,
    pub earliest_at: DateTime<Utc>,
    pub source_text: String,
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// One hourly aggregation row from the swap warehouse. Rows with a null
/// price never reach this type — they are dropped during decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRow {
    /// UTC timestamp truncated to the top of the hour.
    pub hour: DateTime<Utc>,
    pub token_address: String,
    pub token_symbol: Option<String>,
    pub avg_price_usd: f64,
    pub swap_count: u64,
}

/// Per-address result of the market phase. `rows` is empty both for genuine
/// "no data" windows and for recovered per-address query failures.
#[derive(Debug, Clone)]
pub struct AddressReport {
    pub address: String,
    pub mentioned_at: DateTime<Utc>,
    pub rows: Vec<SwapRow>,
}

// ---------------------------------------------------------------------------
// Impact
// ---------------------------------------------------------------------------

/// Before/after price deltas around the reference timestamp. Produced only
/// when at least one row precedes the mention; the post-side fields stay
/// `None` when the window has no later rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactSummary {
    pub address: String,
    pub price_before: f64,
    pub price_at_first_post_after: Option<f64>,
    pub price_latest_in_window: Option<f64>,
    pub pct_change_short: Option<f64>,
    pub pct_change_long: Option<f64>,
}
