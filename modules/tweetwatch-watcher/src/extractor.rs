//! Browserless-backed extractor adapter.
//!
//! All rendering and DOM work happens inside the page script shipped to the
//! Browserless /function endpoint; this adapter only builds the target URL,
//! decodes the returned JSON, parses timestamps, and caps the result. A
//! malformed block drops that single record, never the extraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use browserless_client::{BrowserlessClient, BrowserlessError};
use tweetwatch_common::{ExtractError, Payload, Record, Target};

use crate::traits::RecordExtractor;

/// Page script for both target kinds: wait for post articles, scroll to
/// settle the timeline, map each article to a flat raw post.
const EXTRACT_POSTS_SCRIPT: &str = r#"
export default async function ({ page, context }) {
  await page.setUserAgent(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
  );
  await page.setViewport({ width: 1280, height: 800 });
  await page.goto(context.url, { waitUntil: "domcontentloaded", timeout: 30000 });
  await page.waitForSelector("article", { timeout: 20000 });

  await page.evaluate(() => {
    window.scrollBy(0, window.innerHeight * 2);
  });
  await new Promise((resolve) => setTimeout(resolve, 2000));

  return await page.evaluate(() => {
    const text = (el, selector, fallback) => {
      const found = el.querySelector(selector);
      return found ? found.innerText : fallback;
    };

    return [...document.querySelectorAll("article")].map((el) => {
      const time = el.querySelector("time");
      const link = time && time.parentElement
        ? time.parentElement.getAttribute("href")
        : null;
      const nameLines = text(el, 'div[data-testid="User-Name"]', "").split("\n");

      return {
        permalink: link ? `https://x.com${link}` : null,
        postedAt: time ? time.dateTime : null,
        author: nameLines[0] || "",
        handle: (nameLines[1] || "").replace("@", ""),
        text: text(el, "div[lang]", ""),
        replies: text(el, '[data-testid="reply"]', "0"),
        reposts: text(el, '[data-testid="retweet"]', "0"),
        likes: text(el, '[data-testid="like"]', "0"),
        imageUrl: el.querySelector('img[alt="Image"]')?.src || null,
      };
    });
  });
}
"#;

/// One post block as the page script returns it, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPost {
    pub permalink: Option<String>,
    pub posted_at: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub replies: String,
    #[serde(default)]
    pub reposts: String,
    #[serde(default)]
    pub likes: String,
    pub image_url: Option<String>,
}

pub struct BrowserlessExtractor {
    client: BrowserlessClient,
    max_records: usize,
}

impl BrowserlessExtractor {
    pub fn new(client: BrowserlessClient, max_records: usize) -> Self {
        Self {
            client,
            max_records,
        }
    }
}

#[async_trait]
impl RecordExtractor for BrowserlessExtractor {
    async fn extract(&self, target: &Target) -> Result<Vec<Record>, ExtractError> {
        let url = target.url();
        debug!(target = %target.id, url = %url, "Extracting");

        let context = serde_json::json!({ "url": url });
        let value = self
            .client
            .function(EXTRACT_POSTS_SCRIPT, &context)
            .await
            .map_err(map_browserless_error)?;

        let raw: Vec<RawPost> = serde_json::from_value(value)
            .map_err(|e| ExtractError::Parse(format!("unexpected script output: {e}")))?;

        Ok(parse_raw_posts(target, raw, self.max_records))
    }
}

fn map_browserless_error(err: BrowserlessError) -> ExtractError {
    match err {
        BrowserlessError::Timeout => ExtractError::Timeout,
        // The render service itself is unreachable or overloaded — nothing
        // target-specific, the whole group's session is gone.
        BrowserlessError::Network(msg) => ExtractError::SessionUnavailable(msg),
        BrowserlessError::Api { status, message } if status == 404 => {
            ExtractError::NotFound(message)
        }
        BrowserlessError::Api { status, message } if status >= 500 || status == 429 => {
            ExtractError::SessionUnavailable(format!("status {status}: {message}"))
        }
        BrowserlessError::Api { status, message } => {
            ExtractError::Parse(format!("status {status}: {message}"))
        }
    }
}

/// Validate raw posts into records: drop blocks without a permalink or with
/// an unparseable timestamp, sort newest-first, cap at `max_records`.
pub fn parse_raw_posts(target: &Target, raw: Vec<RawPost>, max_records: usize) -> Vec<Record> {
    let mut records: Vec<Record> = raw
        .into_iter()
        .filter_map(|post| {
            let Some(permalink) = post.permalink else {
                debug!(target = %target.id, "Skipping post block without permalink");
                return None;
            };
            let Some(posted_at) = post.posted_at else {
                debug!(target = %target.id, permalink = %permalink, "Skipping post without timestamp");
                return None;
            };
            let occurred_at = match DateTime::parse_from_rfc3339(&posted_at) {
                Ok(dt) => dt.with_timezone(&Utc),
                Err(e) => {
                    warn!(
                        target = %target.id,
                        permalink = %permalink,
                        timestamp = %posted_at,
                        error = %e,
                        "Skipping post with unparseable timestamp"
                    );
                    return None;
                }
            };

            Some(Record {
                target_id: target.id.clone(),
                external_id: permalink,
                occurred_at,
                payload: Payload {
                    author: post.author,
                    handle: post.handle,
                    text: post.text,
                    replies: post.replies,
                    reposts: post.reposts,
                    likes: post.likes,
                    media_url: post.image_url,
                },
            })
        })
        .collect();

    records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    records.truncate(max_records);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    use tweetwatch_common::TargetKind;

    fn raw(permalink: Option<&str>, posted_at: Option<&str>) -> RawPost {
        RawPost {
            permalink: permalink.map(String::from),
            posted_at: posted_at.map(String::from),
            author: "Elon Musk".into(),
            handle: "elonmusk".into(),
            text: "hello".into(),
            replies: "1".into(),
            reposts: "2".into(),
            likes: "3".into(),
            image_url: None,
        }
    }

    #[test]
    fn malformed_blocks_skipped_not_fatal() {
        let target = Target::new(TargetKind::Profile, "elonmusk");
        let posts = vec![
            raw(Some("https://x.com/e/status/1"), Some("2025-02-07T12:00:00.000Z")),
            raw(None, Some("2025-02-07T12:00:01.000Z")),
            raw(Some("https://x.com/e/status/2"), Some("not-a-timestamp")),
            raw(Some("https://x.com/e/status/3"), None),
        ];

        let records = parse_raw_posts(&target, posts, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_id, "https://x.com/e/status/1");
        assert_eq!(records[0].payload.likes, "3");
    }

    #[test]
    fn sorted_newest_first_and_capped() {
        let target = Target::new(TargetKind::Hashtag, "#crypto");
        let posts = vec![
            raw(Some("https://x.com/a/status/1"), Some("2025-02-07T12:00:00Z")),
            raw(Some("https://x.com/a/status/2"), Some("2025-02-07T12:00:05Z")),
            raw(Some("https://x.com/a/status/3"), Some("2025-02-07T12:00:03Z")),
        ];

        let records = parse_raw_posts(&target, posts, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].external_id, "https://x.com/a/status/2");
        assert_eq!(records[1].external_id, "https://x.com/a/status/3");
        assert_eq!(records[0].target_id, "hashtag_crypto");
    }
}
