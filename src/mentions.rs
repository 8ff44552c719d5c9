use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::matcher;
use crate::types::{MentionRecord, Post};

/// Fold a post set into one `MentionRecord` per distinct candidate address,
/// keeping the earliest mentioning post.
///
/// Posts are sorted ascending by `created_at` before scanning, with missing
/// timestamps sorting last; the sort is stable, so ties keep their input
/// order and first-processed wins. Because the scan runs oldest-first, the
/// first sighting of an address is also its earliest, and later sightings
/// are simply skipped. Output order is first-seen order of that scan.
///
/// Posts without a timestamp still get scanned, but an address seen only in
/// timestamp-less posts yields no record — there is no usable reference
/// instant to anchor a market window on.
pub fn build_mention_index(posts: &[Post]) -> Vec<MentionRecord> {
    let mut ordered: Vec<&Post> = posts.iter().collect();
    ordered.sort_by_key(|p| sort_key(p.created_at));

    let mut seen: HashSet<String> = HashSet::new();
    let mut records: Vec<MentionRecord> = Vec::new();

    for post in ordered {
        for address in matcher::extract(&post.text) {
            if seen.contains(&address) {
                continue;
            }
            let Some(created_at) = post.created_at else {
                continue;
            };
            seen.insert(address.clone());
            records.push(MentionRecord {
                address,
                earliest_at: created_at,
                source_text: post.text.clone(),
            });
        }
    }

    records
}

/// Missing timestamps are treated as maximally late.
fn sort_key(created_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    created_at.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ADDR_A: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    const ADDR_B: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn post(id: &str, text: &str, hour: Option<u32>) -> Post {
        Post {
            id: id.to_string(),
            author: "tester".to_string(),
            text: text.to_string(),
            created_at: hour.map(|h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()),
        }
    }

    #[test]
    fn keeps_minimum_timestamp_regardless_of_input_order() {
        let early = post("1", &format!("first call {ADDR_A}"), Some(3));
        let late = post("2", &format!("still going {ADDR_A}"), Some(9));

        for posts in [vec![late.clone(), early.clone()], vec![early, late]] {
            let records = build_mention_index(&posts);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].address, ADDR_A);
            assert_eq!(
                records[0].earliest_at,
                Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap()
            );
            assert!(records[0].source_text.contains("first call"));
        }
    }

    #[test]
    fn output_follows_first_seen_order_of_ascending_scan() {
        let posts = vec![
            post("1", &format!("late mention {ADDR_B}"), Some(8)),
            post("2", &format!("early mention {ADDR_A}"), Some(2)),
        ];
        let records = build_mention_index(&posts);
        let addresses: Vec<&str> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec![ADDR_A, ADDR_B]);
    }

    #[test]
    fn idempotent_over_the_same_post_set() {
        let posts = vec![
            post("1", &format!("{ADDR_A} and {ADDR_B}"), Some(5)),
            post("2", &format!("again {ADDR_A}"), Some(1)),
        ];
        let first = build_mention_index(&posts);
        let second = build_mention_index(&posts);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.address, b.address);
            assert_eq!(a.earliest_at, b.earliest_at);
            assert_eq!(a.source_text, b.source_text);
        }
    }

    #[test]
    fn timestampless_posts_sort_last_and_anchor_nothing() {
        let posts = vec![
            post("1", &format!("no clock {ADDR_A}"), None),
            post("2", &format!("clocked {ADDR_A}"), Some(7)),
        ];
        let records = build_mention_index(&posts);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].earliest_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap()
        );

        // Seen only without a timestamp: no record at all.
        let orphan = vec![post("3", &format!("ghost {ADDR_B}"), None)];
        assert!(build_mention_index(&orphan).is_empty());
    }

    #[test]
    fn duplicates_within_one_post_collapse() {
        let posts = vec![post("1", &format!("{ADDR_A} {ADDR_A} {ADDR_A}"), Some(4))];
        let records = build_mention_index(&posts);
        assert_eq!(records.len(), 1);
    }
}
