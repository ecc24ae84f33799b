use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use tweetwatch_common::DispatchError;

use crate::backend::NotifyBackend;
use crate::format::FormattedMessage;

/// Discord blue, matching the embeds the bot has always sent.
const EMBED_COLOR: u32 = 3_447_003;

/// Discord incoming webhook notification backend.
pub struct DiscordWebhook {
    webhook_url: String,
    http: reqwest::Client,
}

impl DiscordWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            http: reqwest::Client::new(),
        }
    }

    /// Embed payload for a message. Kept separate from `send` so the wire
    /// shape is testable without a live webhook.
    pub fn payload(message: &FormattedMessage) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = message
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": true }))
            .collect();

        let mut embed = json!({
            "title": message.title,
            "description": message.body,
            "url": message.url,
            "color": EMBED_COLOR,
            "fields": fields,
            "timestamp": message.timestamp.to_rfc3339(),
        });

        if let Some(ref image_url) = message.image_url {
            embed["image"] = json!({ "url": image_url });
        }

        json!({ "embeds": [embed] })
    }
}

#[async_trait]
impl NotifyBackend for DiscordWebhook {
    async fn send(&self, message: &FormattedMessage) -> Result<(), DispatchError> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&Self::payload(message))
            .send()
            .await
            .map_err(|e| DispatchError::Transient {
                status: None,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Discord webhook returned non-success");

        // 429 is rate limiting, retryable like any server-side failure.
        if status.is_server_error() || status.as_u16() == 429 {
            Err(DispatchError::Transient {
                status: Some(status.as_u16()),
                message: body,
            })
        } else {
            Err(DispatchError::Permanent {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}
