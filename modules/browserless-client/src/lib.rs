pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

/// Default per-request timeout. Rendering a script-heavy page can take tens
/// of seconds; callers that need a tighter bound pass one to
/// [`BrowserlessClient::with_timeout`].
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Run a page-evaluation script via the Browserless /function endpoint.
    ///
    /// `code` is an ES module exporting a default async function that receives
    /// `{ page, context }` and returns a JSON-serializable value; `context` is
    /// passed through verbatim. The rendered page and all DOM work stay on the
    /// Browserless side — this client only ships the script and decodes the
    /// returned JSON.
    pub async fn function(
        &self,
        code: &str,
        context: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let mut endpoint = format!("{}/function", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "code": code,
            "context": context,
        });

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}
