//! Postgres-backed marker store.
//!
//! One row per target. The upsert is conditional on the incoming timestamp
//! being at least the stored one, so a marker can never regress even if two
//! writers ever shared a target — the monotonic clamp holds at the store,
//! not just in the dedup engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use tweetwatch_common::{Marker, StoreError};

use crate::traits::MarkerStore;

/// Create the markers table. Idempotent, run on every boot.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS markers (
            target_id TEXT PRIMARY KEY,
            last_seen_at TIMESTAMPTZ NOT NULL,
            last_seen_external_id TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(())
}

pub struct PgMarkerStore {
    pool: PgPool,
}

impl PgMarkerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarkerStore for PgMarkerStore {
    async fn get_marker(&self, target_id: &str) -> Result<Option<Marker>, StoreError> {
        let row = sqlx::query(
            "SELECT target_id, last_seen_at, last_seen_external_id
             FROM markers WHERE target_id = $1",
        )
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(|row| {
            let last_seen_at: DateTime<Utc> = row
                .try_get("last_seen_at")
                .map_err(|e| StoreError::Database(e.to_string()))?;
            Ok(Marker {
                target_id: row
                    .try_get("target_id")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                last_seen_at,
                last_seen_external_id: row
                    .try_get("last_seen_external_id")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn set_marker(&self, marker: &Marker) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO markers (target_id, last_seen_at, last_seen_external_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (target_id) DO UPDATE
             SET last_seen_at = EXCLUDED.last_seen_at,
                 last_seen_external_id = EXCLUDED.last_seen_external_id
             WHERE EXCLUDED.last_seen_at >= markers.last_seen_at",
        )
        .bind(&marker.target_id)
        .bind(marker.last_seen_at)
        .bind(&marker.last_seen_external_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}
