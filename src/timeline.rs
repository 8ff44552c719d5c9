use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::config::{Config, HTTP_TIMEOUT_SECS, TIMELINE_PAGE_SIZE};
use crate::error::{AppError, Result};
use crate::types::Post;

#[derive(Debug, Default)]
pub struct FetchStats {
    pub pages_fetched: usize,
    pub posts_seen: usize,
    pub posts_missing_timestamp: usize,
    /// True when a mid-pagination failure stopped the loop early and the
    /// returned posts are partial.
    pub stopped_on_error: bool,
}

pub fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

/// Resolve a username (no `@` prefix) to the stable user id the timeline
/// endpoint needs. A 401/403 means the bearer credential is bad; an empty
/// `data` object means the user does not exist.
pub async fn resolve_user(
    client: &reqwest::Client,
    cfg: &Config,
    username: &str,
) -> Result<String> {
    let url = format!("{}/2/users/by/username/{}", cfg.social_api_url, username);
    let resp = client
        .get(&url)
        .bearer_auth(&cfg.bearer_token)
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AppError::Auth(format!(
            "social API rejected the bearer token ({status})"
        )));
    }

    let body: serde_json::Value = resp.json().await?;
    body.get("data")
        .and_then(|d| d.get("id"))
        .and_then(|id| id.as_str())
        .map(|id| id.to_string())
        .ok_or_else(|| AppError::UserNotFound(username.to_string()))
}

/// Fetch the user's posts created at or after `start_time`, following
/// `meta.next_token` pagination one page at a time up to the configured cap,
/// with a flat sleep between pages.
///
/// A request or parse failure mid-pagination does not discard progress: the
/// loop stops and whatever was already accumulated is returned, with the
/// early stop recorded in the stats.
pub async fn fetch_recent_posts(
    client: &reqwest::Client,
    cfg: &Config,
    username: &str,
    user_id: &str,
    start_time: DateTime<Utc>,
) -> (Vec<Post>, FetchStats) {
    let start_time_iso = start_time.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut posts: Vec<Post> = Vec::new();
    let mut stats = FetchStats::default();
    let mut pagination_token: Option<String> = None;

    while stats.pages_fetched < cfg.max_timeline_pages {
        let mut url = format!(
            "{}/2/users/{}/tweets?max_results={}&start_time={}&tweet.fields=created_at,text",
            cfg.social_api_url, user_id, TIMELINE_PAGE_SIZE, start_time_iso
        );
        if let Some(token) = &pagination_token {
            url.push_str(&format!("&pagination_token={token}"));
        }

        let body: serde_json::Value = match request_page(client, cfg, &url).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Timeline fetch stopped early after {} pages: {e}", stats.pages_fetched);
                stats.stopped_on_error = true;
                break;
            }
        };
        stats.pages_fetched += 1;

        let items = match body.get("data").and_then(|d| d.as_array()) {
            Some(a) if !a.is_empty() => a.clone(),
            _ => break,
        };

        for item in &items {
            stats.posts_seen += 1;
            match parse_post(item, username) {
                Some(post) => {
                    if post.created_at.is_none() {
                        stats.posts_missing_timestamp += 1;
                    }
                    posts.push(post);
                }
                None => debug!("Skipping structurally unusable post object"),
            }
        }

        pagination_token = body
            .get("meta")
            .and_then(|m| m.get("next_token"))
            .and_then(|t| t.as_str())
            .map(|t| t.to_string());
        if pagination_token.is_none() {
            break;
        }

        // Flat courtesy delay between pages, per the social API rate limits.
        tokio::time::sleep(Duration::from_millis(cfg.page_delay_ms)).await;
    }

    info!(
        "Timeline fetch: {} posts over {} pages ({} missing timestamps{})",
        posts.len(),
        stats.pages_fetched,
        stats.posts_missing_timestamp,
        if stats.stopped_on_error { ", stopped on error" } else { "" },
    );

    (posts, stats)
}

async fn request_page(
    client: &reqwest::Client,
    cfg: &Config,
    url: &str,
) -> Result<serde_json::Value> {
    let resp = client
        .get(url)
        .bearer_auth(&cfg.bearer_token)
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json().await?)
}

/// Parse one post object. `id` and `text` are required; `created_at` is kept
/// optional with a sort-last policy downstream.
fn parse_post(v: &serde_json::Value, author: &str) -> Option<Post> {
    let id = v.get("id")?.as_str()?.to_string();
    let text = v.get("text")?.as_str()?.to_string();
    let created_at = v
        .get("created_at")
        .and_then(|c| c.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(Post {
        id,
        author: author.to_string(),
        text,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_post_reads_utc_timestamp() {
        let v = json!({
            "id": "1",
            "text": "hello",
            "created_at": "2024-01-01T12:30:00.000Z",
        });
        let post = parse_post(&v, "tester").unwrap();
        assert_eq!(post.id, "1");
        assert_eq!(post.author, "tester");
        let ts = post.created_at.unwrap();
        assert_eq!(ts.to_rfc3339_opts(SecondsFormat::Secs, true), "2024-01-01T12:30:00Z");
    }

    #[test]
    fn parse_post_tolerates_missing_timestamp() {
        let v = json!({ "id": "2", "text": "no clock here" });
        let post = parse_post(&v, "tester").unwrap();
        assert!(post.created_at.is_none());
    }

    #[test]
    fn parse_post_rejects_missing_text() {
        let v = json!({ "id": "3" });
        assert!(parse_post(&v, "tester").is_none());
    }

    #[test]
    fn malformed_timestamp_becomes_none() {
        let v = json!({ "id": "4", "text": "x", "created_at": "not-a-date" });
        let post = parse_post(&v, "tester").unwrap();
        assert!(post.created_at.is_none());
    }
}
