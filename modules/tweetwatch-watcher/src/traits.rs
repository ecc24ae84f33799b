// Trait abstractions for the orchestrator's two stateful dependencies.
//
// RecordExtractor — render a target's page and return parsed records.
// MarkerStore — durable per-target watermark with idempotent upsert.
//
// These enable deterministic testing with MockExtractor and MockMarkerStore:
// no browser, no database. `cargo test` in seconds.

use async_trait::async_trait;

use tweetwatch_common::{ExtractError, Marker, Record, StoreError, Target};

#[async_trait]
pub trait RecordExtractor: Send + Sync {
    /// Extract the most recent records for a target, newest first, already
    /// parsed and capped. Malformed blocks are skipped inside the adapter,
    /// never surfaced as errors.
    async fn extract(&self, target: &Target) -> Result<Vec<Record>, ExtractError>;
}

#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn get_marker(&self, target_id: &str) -> Result<Option<Marker>, StoreError>;

    /// Upsert, idempotent under retry. Implementations must never regress
    /// `last_seen_at` for a target even under concurrent writers.
    async fn set_marker(&self, marker: &Marker) -> Result<(), StoreError>;
}
