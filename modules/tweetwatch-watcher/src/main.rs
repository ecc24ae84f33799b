use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use tweetwatch_common::{Config, Target};
use tweetwatch_notify::{DiscordWebhook, Dispatcher, NoopBackend, NotifyBackend};
use tweetwatch_watcher::{
    store::{migrate, PgMarkerStore},
    traits::MarkerStore,
    Orchestrator, Scheduler, WorkerGroup,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tweetwatch=info".parse()?))
        .init();

    info!("Tweetwatch starting...");

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    // Connect to Postgres
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // Run migrations (idempotent)
    migrate(&pool).await?;
    let store = Arc::new(PgMarkerStore::new(pool));

    // One worker group per target kind; each owns its render session scope
    // and its webhook. Groups with no targets are not started.
    let mut groups = Vec::new();
    for (name, targets, webhook_url) in [
        (
            "profiles",
            config.profile_targets.clone(),
            config.webhook_url_profiles.clone(),
        ),
        (
            "hashtags",
            config.hashtag_targets.clone(),
            config.webhook_url_hashtags.clone(),
        ),
    ] {
        if targets.is_empty() {
            info!(group = name, "No targets configured, group disabled");
            continue;
        }
        groups.push(Arc::new(build_group(
            name,
            targets,
            webhook_url,
            store.clone(),
            &config,
        )));
    }

    if groups.is_empty() {
        anyhow::bail!("No targets configured. Set PROFILE_TARGETS and/or HASHTAG_TARGETS.");
    }

    let handle = Scheduler::new(config.poll_interval).start(groups);
    info!(
        interval_secs = config.poll_interval.as_secs(),
        "Worker groups started"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining worker groups");
    handle.stop().await;

    info!("Tweetwatch stopped");
    Ok(())
}

fn build_group(
    name: &str,
    targets: Vec<Target>,
    webhook_url: Option<String>,
    store: Arc<dyn MarkerStore>,
    config: &Config,
) -> WorkerGroup {
    let backend: Arc<dyn NotifyBackend> = match webhook_url {
        Some(url) => Arc::new(DiscordWebhook::new(url)),
        None => {
            info!(group = name, "No webhook configured, notifications disabled");
            Arc::new(NoopBackend)
        }
    };

    let client = BrowserlessClient::with_timeout(
        &config.browserless_url,
        config.browserless_token.as_deref(),
        config.target_timeout,
    );
    let extractor = Arc::new(tweetwatch_watcher::extractor::BrowserlessExtractor::new(
        client,
        config.max_records_per_target,
    ));

    let orchestrator = Orchestrator::new(
        name,
        targets,
        extractor,
        store,
        Dispatcher::new(backend, config.max_dispatch_retries),
        config.target_timeout,
    );

    WorkerGroup::new(name, orchestrator)
}
