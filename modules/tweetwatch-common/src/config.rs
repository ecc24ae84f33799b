use std::env;
use std::time::Duration;

use tracing::info;

use crate::types::{Target, TargetKind};

/// Application configuration loaded from environment variables. No
/// credential or webhook URL is ever compiled in.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres (marker store)
    pub database_url: String,

    // Browserless render service
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // Discord webhooks, one per worker group. None disables notifications
    // for that group.
    pub webhook_url_profiles: Option<String>,
    pub webhook_url_hashtags: Option<String>,

    // Targets
    pub profile_targets: Vec<Target>,
    pub hashtag_targets: Vec<Target>,

    // Polling
    pub poll_interval: Duration,
    pub target_timeout: Duration,
    pub max_dispatch_retries: u32,
    pub max_records_per_target: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let default_webhook = env::var("DISCORD_WEBHOOK_URL").ok();

        Self {
            database_url: required_env("DATABASE_URL"),
            browserless_url: required_env("BROWSERLESS_URL"),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            webhook_url_profiles: env::var("DISCORD_WEBHOOK_URL_PROFILES")
                .ok()
                .or_else(|| default_webhook.clone()),
            webhook_url_hashtags: env::var("DISCORD_WEBHOOK_URL_HASHTAGS")
                .ok()
                .or(default_webhook),
            profile_targets: parse_targets(
                TargetKind::Profile,
                &env::var("PROFILE_TARGETS").unwrap_or_default(),
            ),
            hashtag_targets: parse_targets(
                TargetKind::Hashtag,
                &env::var("HASHTAG_TARGETS").unwrap_or_default(),
            ),
            poll_interval: Duration::from_secs(env_u64("POLL_INTERVAL_SECS", 120)),
            target_timeout: Duration::from_secs(env_u64("TARGET_TIMEOUT_SECS", 40)),
            max_dispatch_retries: env_u64("MAX_DISPATCH_RETRIES", 3) as u32,
            max_records_per_target: env_u64("MAX_RECORDS_PER_TARGET", 10) as usize,
        }
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            browserless_url = %self.browserless_url,
            profiles = self.profile_targets.len(),
            hashtags = self.hashtag_targets.len(),
            poll_interval_secs = self.poll_interval.as_secs(),
            target_timeout_secs = self.target_timeout.as_secs(),
            max_dispatch_retries = self.max_dispatch_retries,
            max_records_per_target = self.max_records_per_target,
            profile_webhook = self.webhook_url_profiles.is_some(),
            hashtag_webhook = self.webhook_url_hashtags.is_some(),
            "Configuration loaded"
        );
    }
}

/// Parse a comma-separated target list ("elonmusk, @orangie" or
/// "#crypto,#dogecoin") into normalized targets. Empty entries are dropped.
pub fn parse_targets(kind: TargetKind, raw: &str) -> Vec<Target> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Target::new(kind, s))
        .collect()
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got '{v}'")),
        Err(_) => default,
    }
}
