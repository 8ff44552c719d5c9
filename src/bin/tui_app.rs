use chrono::{Duration, Utc};

use mention_scanner::config::Config;
use mention_scanner::error::AppError;
use mention_scanner::types::{AddressReport, ImpactSummary, MentionRecord};
use mention_scanner::{impact, market, mentions, timeline};

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Input,
    Loading,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Username,
    Hours,
}

/// One address tab on the results screen: the mention, its hourly rows and
/// the derived impact metrics (None when no pre-mention data exists).
#[derive(Debug, Clone)]
pub struct AddressTab {
    pub report: AddressReport,
    pub summary: Option<ImpactSummary>,
}

pub struct AppState {
    pub cfg: Config,
    pub screen: Screen,
    pub field: InputField,
    pub username: String,
    pub hours: i64,
    pub status: Option<String>,
    pub records: Vec<MentionRecord>,
    pub tabs: Vec<AddressTab>,
    pub selected_tab: usize,
}

impl AppState {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            screen: Screen::Input,
            field: InputField::Username,
            username: String::new(),
            hours: 6,
            status: None,
            records: Vec::new(),
            tabs: Vec::new(),
            selected_tab: 0,
        }
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            InputField::Username => InputField::Hours,
            InputField::Hours => InputField::Username,
        };
    }

    pub fn adjust_hours(&mut self, delta: i64) {
        self.hours = (self.hours + delta).clamp(1, 24);
    }

    pub fn next_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.selected_tab = (self.selected_tab + 1) % self.tabs.len();
        }
    }

    pub fn prev_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.selected_tab = (self.selected_tab + self.tabs.len() - 1) % self.tabs.len();
        }
    }

    pub fn reset_to_input(&mut self) {
        self.screen = Screen::Input;
        self.status = None;
        self.records.clear();
        self.tabs.clear();
        self.selected_tab = 0;
    }

    /// Run the whole pipeline: timeline fetch, mention scan, per-address
    /// market queries, impact analysis. Failures land in `status` and drop
    /// back to the input screen; a successful run fills the address tabs.
    pub async fn run_pipeline(&mut self) {
        self.records.clear();
        self.tabs.clear();
        self.selected_tab = 0;

        if self.username.trim().is_empty() {
            self.status = Some("Please enter a username".to_string());
            self.screen = Screen::Input;
            return;
        }
        let username = self.username.trim().to_string();

        let client = match timeline::build_client() {
            Ok(c) => c,
            Err(e) => return self.fail(format!("HTTP client: {e}")),
        };

        let user_id = match timeline::resolve_user(&client, &self.cfg, &username).await {
            Ok(id) => id,
            Err(AppError::UserNotFound(name)) => {
                return self.fail(format!("User @{name} not found"));
            }
            Err(e) => return self.fail(e.to_string()),
        };

        let start_time = Utc::now() - Duration::hours(self.hours);
        let (posts, _stats) =
            timeline::fetch_recent_posts(&client, &self.cfg, &username, &user_id, start_time).await;
        if posts.is_empty() {
            return self.fail(format!(
                "No posts found for @{username} in the last {} hours",
                self.hours
            ));
        }

        self.records = mentions::build_mention_index(&posts);
        if self.records.is_empty() {
            return self.fail(format!(
                "No Solana addresses found in {} posts by @{username}",
                posts.len()
            ));
        }

        let analytics_client = match market::build_client() {
            Ok(c) => c,
            Err(e) => return self.fail(format!("HTTP client: {e}")),
        };
        let reports = match market::collect_reports(&analytics_client, &self.cfg, &self.records).await
        {
            Ok(r) => r,
            Err(e) => return self.fail(e.to_string()),
        };

        self.tabs = reports
            .into_iter()
            .map(|report| AddressTab {
                summary: impact::analyze(&report),
                report,
            })
            .collect();
        self.status = None;
        self.screen = Screen::Results;
    }

    fn fail(&mut self, message: String) {
        self.status = Some(message);
        self.screen = Screen::Input;
    }
}

// ---------------------------------------------------------------------------
// Chart data helpers
// ---------------------------------------------------------------------------

/// Hourly price series as (epoch seconds, price) points.
pub fn price_points(report: &AddressReport) -> Vec<(f64, f64)> {
    report
        .rows
        .iter()
        .map(|r| (r.hour.timestamp() as f64, r.avg_price_usd))
        .collect()
}

/// Hourly swap-count series as (epoch seconds, count) points.
pub fn count_points(report: &AddressReport) -> Vec<(f64, f64)> {
    report
        .rows
        .iter()
        .map(|r| (r.hour.timestamp() as f64, r.swap_count as f64))
        .collect()
}

/// Two-point vertical line at the reference timestamp, spanning the y range.
/// Rendered as its own dataset so the mention instant is visible on both
/// charts.
pub fn marker_points(report: &AddressReport, y_bounds: [f64; 2]) -> Vec<(f64, f64)> {
    let x = report.mentioned_at.timestamp() as f64;
    vec![(x, y_bounds[0]), (x, y_bounds[1])]
}

/// Axis bounds for a series, padded so flat series still render, with the
/// marker x included in the x range.
pub fn axis_bounds(points: &[(f64, f64)], marker_x: f64) -> ([f64; 2], [f64; 2]) {
    let mut x_min = marker_x;
    let mut x_max = marker_x;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if points.is_empty() {
        y_min = 0.0;
        y_max = 1.0;
    }
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 0.5;
        y_max += 0.5;
    }
    if (x_max - x_min).abs() < f64::EPSILON {
        x_min -= 1800.0;
        x_max += 1800.0;
    }
    ([x_min, x_max], [y_min, y_max])
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_price(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |p| format!("${p:.6}"))
}

pub fn format_pct(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |p| format!("{p:+.2}%"))
}

/// Epoch seconds to a short HH:MM axis label.
pub fn format_hour_label(epoch_secs: f64) -> String {
    let secs = epoch_secs as u64;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    format!("{h:02}:{m:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn main() {
    // Dashboard state and helpers live here — the entry point is src/bin/tui.rs
}

