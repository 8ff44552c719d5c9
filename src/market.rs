use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::{
    Config, HTTP_TIMEOUT_SECS, QUERY_POLL_DELAY_MS, QUERY_POLL_MAX_ATTEMPTS, SOL_MINT,
    WINDOW_AFTER_HOURS, WINDOW_BEFORE_HOURS,
};
use crate::error::{AppError, Result};
use crate::types::{AddressReport, MentionRecord, SwapRow};

/// Hourly SOL-pair swap aggregation for one token over one time window.
/// Implied USD price per hour = SOL-side USD notional / token quantity,
/// averaged across qualifying swaps; null-price rows are excluded before the
/// aggregation. Values are bound into the named placeholders — never
/// hand-spliced by callers.
const SWAP_WINDOW_SQL: &str = r#"
WITH token_swap_prices AS (
  SELECT
    date_trunc('hour', block_timestamp) AS hour,
    CASE
      WHEN swap_from_mint = '{{sol_mint}}' THEN swap_to_mint
      WHEN swap_to_mint = '{{sol_mint}}' THEN swap_from_mint
    END AS token_address,
    CASE
      WHEN swap_from_symbol = 'SOL' THEN swap_to_symbol
      WHEN swap_to_symbol = 'SOL' THEN swap_from_symbol
    END AS token_symbol,
    CASE
      WHEN swap_from_mint = '{{sol_mint}}' THEN swap_from_amount_usd / NULLIF(swap_to_amount, 0)
      WHEN swap_to_mint = '{{sol_mint}}' THEN swap_to_amount_usd / NULLIF(swap_from_amount, 0)
    END AS token_price_usd
  FROM solana.defi.ez_dex_swaps
  WHERE
    (
      (swap_to_mint = '{{address}}' AND swap_from_mint = '{{sol_mint}}')
      OR
      (swap_from_mint = '{{address}}' AND swap_to_mint = '{{sol_mint}}')
    )
    AND (
      (swap_from_mint = '{{sol_mint}}' AND swap_to_amount > 0)
      OR
      (swap_to_mint = '{{sol_mint}}' AND swap_from_amount > 0)
    )
    AND block_timestamp BETWEEN '{{start_time}}' AND '{{end_time}}'
)
SELECT
  hour,
  token_address,
  token_symbol,
  AVG(token_price_usd) AS avg_token_price_usd,
  COUNT(*) AS swap_count
FROM token_swap_prices
WHERE token_address IS NOT NULL
  AND token_price_usd IS NOT NULL
GROUP BY 1, 2, 3
ORDER BY 1
"#;

/// Full-string base58 check used when binding an address parameter.
/// Addresses come out of post text and are untrusted input.
static BIND_ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").unwrap());

/// Closed query interval around the reference timestamp:
/// `[t - 2h, t + 24h]`, both ends UTC.
pub fn query_window(t: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        t - chrono::Duration::hours(WINDOW_BEFORE_HOURS),
        t + chrono::Duration::hours(WINDOW_AFTER_HOURS),
    )
}

/// Bind the window query for one address. The address must pass the strict
/// base58 full-match (anything else is rejected, not escaped); the window
/// bounds are formatted from `DateTime` values and cannot carry foreign SQL.
pub fn build_swap_query(
    address: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<String> {
    if !BIND_ADDRESS_RE.is_match(address) {
        return Err(AppError::Query(format!(
            "refusing to bind non-base58 address parameter: {address:?}"
        )));
    }
    Ok(SWAP_WINDOW_SQL
        .replace("{{sol_mint}}", SOL_MINT)
        .replace("{{address}}", address)
        .replace("{{start_time}}", &format_sql_timestamp(start))
        .replace("{{end_time}}", &format_sql_timestamp(end)))
}

fn format_sql_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Warehouse client (Flipside JSON-RPC)
// ---------------------------------------------------------------------------

pub fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

/// Submit a query run and block until its rows are available (or the poll
/// cap trips). The warehouse executes asynchronously: create the run, poll
/// its state with a flat delay, then page the results.
async fn submit_query(client: &reqwest::Client, cfg: &Config, sql: &str) -> Result<Vec<Value>> {
    let create = rpc_call(
        client,
        cfg,
        "createQueryRun",
        json!([{
            "resultTTLHours": 1,
            "maxAgeMinutes": 0,
            "sql": sql,
            "tags": { "source": "mention-scanner" },
            "dataSource": "snowflake-default",
            "dataProvider": "flipside",
        }]),
    )
    .await?;

    let run_id = create
        .get("result")
        .and_then(|r| r.get("queryRun"))
        .and_then(|q| q.get("id"))
        .and_then(|id| id.as_str())
        .ok_or_else(|| AppError::Query("createQueryRun returned no run id".to_string()))?
        .to_string();

    for _ in 0..QUERY_POLL_MAX_ATTEMPTS {
        let status = rpc_call(
            client,
            cfg,
            "getQueryRun",
            json!([{ "queryRunId": run_id }]),
        )
        .await?;

        let state = status
            .get("result")
            .and_then(|r| r.get("queryRun"))
            .and_then(|q| q.get("state"))
            .and_then(|s| s.as_str())
            .unwrap_or("");

        match state {
            "QUERY_STATE_SUCCESS" => return fetch_query_rows(client, cfg, &run_id).await,
            "QUERY_STATE_FAILED" | "QUERY_STATE_CANCELED" => {
                let message = status
                    .get("result")
                    .and_then(|r| r.get("queryRun"))
                    .and_then(|q| q.get("errorMessage"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("no error message");
                return Err(AppError::Query(format!("query run {state}: {message}")));
            }
            _ => tokio::time::sleep(Duration::from_millis(QUERY_POLL_DELAY_MS)).await,
        }
    }

    Err(AppError::Query(format!(
        "query run {run_id} did not finish within {QUERY_POLL_MAX_ATTEMPTS} polls"
    )))
}

async fn fetch_query_rows(
    client: &reqwest::Client,
    cfg: &Config,
    run_id: &str,
) -> Result<Vec<Value>> {
    let results = rpc_call(
        client,
        cfg,
        "getQueryRunResults",
        json!([{
            "queryRunId": run_id,
            "format": "json",
            "page": { "number": 1, "size": 1000 },
        }]),
    )
    .await?;

    Ok(results
        .get("result")
        .and_then(|r| r.get("rows"))
        .and_then(|rows| rows.as_array())
        .cloned()
        .unwrap_or_default())
}

async fn rpc_call(
    client: &reqwest::Client,
    cfg: &Config,
    method: &str,
    params: Value,
) -> Result<Value> {
    let url = format!("{}/json-rpc", cfg.analytics_api_url);
    let resp = client
        .post(&url)
        .header("x-api-key", &cfg.analytics_api_key)
        .json(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        }))
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AppError::Auth(format!(
            "analytics API rejected the API key ({status})"
        )));
    }
    if !status.is_success() {
        return Err(AppError::Query(format!("{method} failed with HTTP {status}")));
    }

    let body: Value = resp.json().await?;
    if let Some(err) = body.get("error") {
        return Err(AppError::Query(format!("{method} RPC error: {err}")));
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

/// Decode one warehouse row. The `hour` field is variably typed depending on
/// result format — RFC 3339, naive `YYYY-MM-DD HH:MM:SS[.fff]` (taken as
/// UTC), or epoch milliseconds — and rows with a missing hour or price are
/// dropped rather than failing the batch.
fn decode_row(v: &Value) -> Option<SwapRow> {
    let hour = parse_hour(v.get("hour")?)?;
    let avg_price_usd = v.get("avg_token_price_usd").and_then(|p| p.as_f64())?;
    let token_address = v.get("token_address")?.as_str()?.to_string();
    let token_symbol = v
        .get("token_symbol")
        .and_then(|s| s.as_str())
        .map(|s| s.to_string());
    // Counts come back as integers or floats depending on result format.
    let swap_count = v
        .get("swap_count")
        .and_then(|c| c.as_u64().or_else(|| c.as_f64().map(|f| f as u64)))
        .unwrap_or(0);

    Some(SwapRow {
        hour,
        token_address,
        token_symbol,
        avg_price_usd,
        swap_count,
    })
}

/// Normalize a variably-typed timestamp to UTC. Naive strings are treated as
/// UTC so pre/post comparisons downstream never mix timezone conventions.
pub fn parse_hour(v: &Value) -> Option<DateTime<Utc>> {
    if let Some(s) = v.as_str() {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
        return None;
    }
    if let Some(ms) = v.as_i64() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    None
}

// ---------------------------------------------------------------------------
// Per-address orchestration
// ---------------------------------------------------------------------------

/// Run the window query for a single mention record.
pub async fn fetch_window_rows(
    client: &reqwest::Client,
    cfg: &Config,
    record: &MentionRecord,
) -> Result<Vec<SwapRow>> {
    let (start, end) = query_window(record.earliest_at);
    let sql = build_swap_query(&record.address, start, end)?;

    info!(
        "Querying swap window for {} ({} to {})",
        record.address,
        format_sql_timestamp(start),
        format_sql_timestamp(end),
    );

    let raw = submit_query(client, cfg, &sql).await?;
    let mut rows: Vec<SwapRow> = raw.iter().filter_map(decode_row).collect();
    rows.sort_by_key(|r| r.hour);
    Ok(rows)
}

/// Process addresses sequentially, one query per address. A failed query is
/// logged and recorded as an empty report so the remaining addresses still
/// run; zero-row addresses stay in the result set to be shown as "no data".
/// An authentication rejection is not recoverable per address and aborts.
pub async fn collect_reports(
    client: &reqwest::Client,
    cfg: &Config,
    records: &[MentionRecord],
) -> Result<Vec<AddressReport>> {
    let mut reports = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        info!("Address {}/{}: {}", i + 1, records.len(), record.address);
        let result = fetch_window_rows(client, cfg, record).await;
        if let Err(AppError::Auth(msg)) = &result {
            return Err(AppError::Auth(msg.clone()));
        }
        reports.push(report_from_result(record, result));
    }

    Ok(reports)
}

/// Fold a per-address query outcome into a report, recovering failures as
/// empty row sets.
fn report_from_result(record: &MentionRecord, result: Result<Vec<SwapRow>>) -> AddressReport {
    let rows = match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Query failed for {}: {e}", record.address);
            Vec::new()
        }
    };
    AddressReport {
        address: record.address.clone(),
        mentioned_at: record.earliest_at,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDR: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn window_is_two_hours_back_twenty_four_forward() {
        let (start, end) = query_window(ts("2024-01-01T12:00:00Z"));
        assert_eq!(start, ts("2024-01-01T10:00:00Z"));
        assert_eq!(end, ts("2024-01-02T12:00:00Z"));
    }

    #[test]
    fn build_query_binds_all_placeholders() {
        let sql = build_swap_query(ADDR, ts("2024-01-01T10:00:00Z"), ts("2024-01-02T12:00:00Z"))
            .unwrap();
        assert!(sql.contains(ADDR));
        assert!(sql.contains("2024-01-01 10:00:00"));
        assert!(sql.contains("2024-01-02 12:00:00"));
        assert!(sql.contains(SOL_MINT));
        assert!(!sql.contains("{{"), "unbound placeholder left in SQL");
    }

    #[test]
    fn build_query_rejects_non_base58_input() {
        let hostile = "x'; DROP TABLE solana.defi.ez_dex_swaps; --";
        let err = build_swap_query(hostile, ts("2024-01-01T10:00:00Z"), ts("2024-01-02T12:00:00Z"));
        assert!(matches!(err, Err(AppError::Query(_))));

        // Length alone is enough to refuse: 31 base58 chars.
        let short = "1".repeat(31);
        assert!(build_swap_query(&short, ts("2024-01-01T10:00:00Z"), ts("2024-01-02T12:00:00Z")).is_err());
    }

    #[test]
    fn parse_hour_accepts_rfc3339_naive_and_epoch_millis() {
        let expected = ts("2024-01-01T05:00:00Z");
        assert_eq!(parse_hour(&json!("2024-01-01T05:00:00Z")), Some(expected));
        assert_eq!(parse_hour(&json!("2024-01-01 05:00:00")), Some(expected));
        assert_eq!(parse_hour(&json!("2024-01-01 05:00:00.000")), Some(expected));
        assert_eq!(parse_hour(&json!(1_704_085_200_000_i64)), Some(expected));
        assert_eq!(parse_hour(&json!("garbage")), None);
        assert_eq!(parse_hour(&json!(null)), None);
    }

    #[test]
    fn decode_row_drops_null_price() {
        let good = json!({
            "hour": "2024-01-01 05:00:00",
            "token_address": ADDR,
            "token_symbol": "BONK",
            "avg_token_price_usd": 0.000012,
            "swap_count": 42,
        });
        let row = decode_row(&good).unwrap();
        assert_eq!(row.swap_count, 42);
        assert_eq!(row.token_symbol.as_deref(), Some("BONK"));

        let null_price = json!({
            "hour": "2024-01-01 05:00:00",
            "token_address": ADDR,
            "token_symbol": null,
            "avg_token_price_usd": null,
            "swap_count": 3,
        });
        assert!(decode_row(&null_price).is_none());
    }

    #[test]
    fn failed_query_yields_empty_report_not_a_missing_one() {
        let record = MentionRecord {
            address: ADDR.to_string(),
            earliest_at: ts("2024-01-01T12:00:00Z"),
            source_text: "text".to_string(),
        };
        let report = report_from_result(&record, Err(AppError::Query("boom".to_string())));
        assert_eq!(report.address, ADDR);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn one_failure_does_not_block_other_addresses() {
        let make = |address: &str| MentionRecord {
            address: address.to_string(),
            earliest_at: ts("2024-01-01T12:00:00Z"),
            source_text: String::new(),
        };
        let row = SwapRow {
            hour: ts("2024-01-01T13:00:00Z"),
            token_address: ADDR.to_string(),
            token_symbol: None,
            avg_price_usd: 1.0,
            swap_count: 1,
        };

        let outcomes: Vec<(MentionRecord, Result<Vec<SwapRow>>)> = vec![
            (make("a"), Ok(vec![row.clone()])),
            (make("b"), Err(AppError::Query("transient".to_string()))),
            (make("c"), Ok(vec![row])),
        ];

        let reports: Vec<AddressReport> = outcomes
            .into_iter()
            .map(|(record, result)| report_from_result(&record, result))
            .collect();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].rows.len(), 1);
        assert!(reports[1].rows.is_empty());
        assert_eq!(reports[2].rows.len(), 1);
    }
}
