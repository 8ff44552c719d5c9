use chrono::{DateTime, Utc};

use crate::types::{AddressReport, ImpactSummary, SwapRow};

/// Compute before/after price deltas for one address around its reference
/// timestamp. Rows strictly before the reference hour form the `pre` side,
/// rows at or after it the `post` side; all comparisons are UTC-to-UTC.
///
/// Returns `None` when no row precedes the mention — without a baseline
/// there is nothing to measure against. Missing post-side rows leave the
/// corresponding fields and deltas `None` instead of failing.
pub fn analyze(report: &AddressReport) -> Option<ImpactSummary> {
    analyze_rows(&report.address, &report.rows, report.mentioned_at)
}

pub fn analyze_rows(
    address: &str,
    rows: &[SwapRow],
    reference: DateTime<Utc>,
) -> Option<ImpactSummary> {
    let mut pre: Vec<&SwapRow> = rows.iter().filter(|r| r.hour < reference).collect();
    let mut post: Vec<&SwapRow> = rows.iter().filter(|r| r.hour >= reference).collect();
    pre.sort_by_key(|r| r.hour);
    post.sort_by_key(|r| r.hour);

    let price_before = pre.last().map(|r| r.avg_price_usd)?;
    let price_at_first_post_after = post.first().map(|r| r.avg_price_usd);
    let price_latest_in_window = post.last().map(|r| r.avg_price_usd);

    Some(ImpactSummary {
        address: address.to_string(),
        price_before,
        price_at_first_post_after,
        price_latest_in_window,
        pct_change_short: price_at_first_post_after
            .and_then(|after| pct_change(price_before, after)),
        pct_change_long: price_latest_in_window
            .and_then(|latest| pct_change(price_before, latest)),
    })
}

/// Percentage change from `before` to `after`; undefined for a zero base.
fn pct_change(before: f64, after: f64) -> Option<f64> {
    if before == 0.0 {
        return None;
    }
    Some((after - before) / before * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ADDR: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn row(offset_hours: i64, price: f64) -> SwapRow {
        SwapRow {
            hour: t0() + Duration::hours(offset_hours),
            token_address: ADDR.to_string(),
            token_symbol: Some("TEST".to_string()),
            avg_price_usd: price,
            swap_count: 1,
        }
    }

    #[test]
    fn computes_short_and_long_deltas() {
        let rows = vec![row(-3, 1.0), row(-1, 2.0), row(1, 4.0), row(25, 8.0)];
        let summary = analyze_rows(ADDR, &rows, t0()).unwrap();
        assert_eq!(summary.price_before, 2.0);
        assert_eq!(summary.price_at_first_post_after, Some(4.0));
        assert_eq!(summary.price_latest_in_window, Some(8.0));
        assert_eq!(summary.pct_change_short, Some(100.0));
        assert_eq!(summary.pct_change_long, Some(300.0));
    }

    #[test]
    fn unsorted_input_gets_the_same_answer() {
        let rows = vec![row(25, 8.0), row(-1, 2.0), row(1, 4.0), row(-3, 1.0)];
        let summary = analyze_rows(ADDR, &rows, t0()).unwrap();
        assert_eq!(summary.price_before, 2.0);
        assert_eq!(summary.pct_change_long, Some(300.0));
    }

    #[test]
    fn no_pre_rows_means_no_summary() {
        let rows = vec![row(1, 4.0), row(2, 5.0)];
        assert!(analyze_rows(ADDR, &rows, t0()).is_none());
    }

    #[test]
    fn no_post_rows_leaves_deltas_undefined() {
        let rows = vec![row(-2, 3.0)];
        let summary = analyze_rows(ADDR, &rows, t0()).unwrap();
        assert_eq!(summary.price_before, 3.0);
        assert!(summary.price_at_first_post_after.is_none());
        assert!(summary.price_latest_in_window.is_none());
        assert!(summary.pct_change_short.is_none());
        assert!(summary.pct_change_long.is_none());
    }

    #[test]
    fn zero_baseline_yields_no_percentage() {
        let rows = vec![row(-1, 0.0), row(1, 4.0)];
        let summary = analyze_rows(ADDR, &rows, t0()).unwrap();
        assert_eq!(summary.price_before, 0.0);
        assert_eq!(summary.price_at_first_post_after, Some(4.0));
        assert!(summary.pct_change_short.is_none());
    }

    #[test]
    fn row_exactly_at_reference_is_post_side() {
        let rows = vec![row(-1, 2.0), row(0, 6.0)];
        let summary = analyze_rows(ADDR, &rows, t0()).unwrap();
        assert_eq!(summary.price_before, 2.0);
        assert_eq!(summary.price_at_first_post_after, Some(6.0));
    }

    #[test]
    fn empty_row_set_yields_nothing() {
        assert!(analyze_rows(ADDR, &[], t0()).is_none());
    }
}
