// Test mocks for the polling pipeline.
//
// Three mocks matching the trait boundaries:
// - MockExtractor (RecordExtractor) — scripted per-target responses
// - BlockingExtractor (RecordExtractor) — parks until released, for
//   single-flight and cancellation tests
// - MockMarkerStore (MarkerStore) — in-memory markers with failure switches
// - CountingBackend (NotifyBackend) — records every outbound message
//
// Plus helpers for constructing targets and records. No browser, no
// database, no webhook.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use tweetwatch_common::{
    DispatchError, ExtractError, Marker, Payload, Record, StoreError, Target, TargetKind,
};
use tweetwatch_notify::{FormattedMessage, NotifyBackend};

use crate::traits::{MarkerStore, RecordExtractor};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn profile_target(handle: &str) -> Target {
    Target::new(TargetKind::Profile, handle)
}

pub fn hashtag_target(term: &str) -> Target {
    Target::new(TargetKind::Hashtag, term)
}

/// Timestamp helper: seconds offset into a fixed test minute.
pub fn ts(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 7, 12, 0, secs).unwrap()
}

pub fn record(target_id: &str, external_id: &str, occurred_at: DateTime<Utc>) -> Record {
    Record {
        target_id: target_id.to_string(),
        external_id: external_id.to_string(),
        occurred_at,
        payload: Payload {
            author: "Author".into(),
            handle: "author".into(),
            text: format!("post {external_id}"),
            replies: "0".into(),
            reposts: "0".into(),
            likes: "0".into(),
            media_url: None,
        },
    }
}

pub fn marker(target_id: &str, at: DateTime<Utc>, external_id: &str) -> Marker {
    Marker {
        target_id: target_id.to_string(),
        last_seen_at: at,
        last_seen_external_id: external_id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Scripted response for one target.
pub enum MockResponse {
    Records(Vec<Record>),
    Timeout,
    NotFound,
    SessionUnavailable,
}

/// Per-target scripted extractor. Unregistered targets return an empty set.
/// Builder pattern: `.on_target(id, response)`.
pub struct MockExtractor {
    responses: HashMap<String, MockResponse>,
    calls: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_target(mut self, target_id: &str, response: MockResponse) -> Self {
        self.responses.insert(target_id.to_string(), response);
        self
    }

    /// Target ids extracted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordExtractor for MockExtractor {
    async fn extract(&self, target: &Target) -> Result<Vec<Record>, ExtractError> {
        self.calls.lock().unwrap().push(target.id.clone());

        match self.responses.get(&target.id) {
            None => Ok(Vec::new()),
            Some(MockResponse::Records(records)) => Ok(records.clone()),
            Some(MockResponse::Timeout) => Err(ExtractError::Timeout),
            Some(MockResponse::NotFound) => Err(ExtractError::NotFound(target.id.clone())),
            Some(MockResponse::SessionUnavailable) => {
                Err(ExtractError::SessionUnavailable("session gone".into()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// BlockingExtractor
// ---------------------------------------------------------------------------

/// Parks inside `extract` until released. `started` fires when an extraction
/// begins, so tests can synchronize on a pass being mid-target.
pub struct BlockingExtractor {
    pub started: Notify,
    pub release: Notify,
    pub calls: AtomicU32,
}

impl BlockingExtractor {
    pub fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicU32::new(0),
        }
    }
}

impl Default for BlockingExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordExtractor for BlockingExtractor {
    async fn extract(&self, _target: &Target) -> Result<Vec<Record>, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// MockMarkerStore
// ---------------------------------------------------------------------------

/// Stateful in-memory marker store with read/write failure switches.
pub struct MockMarkerStore {
    markers: Mutex<HashMap<String, Marker>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockMarkerStore {
    pub fn new() -> Self {
        Self {
            markers: Mutex::new(HashMap::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn seeded(marker: Marker) -> Self {
        let store = Self::new();
        store
            .markers
            .lock()
            .unwrap()
            .insert(marker.target_id.clone(), marker);
        store
    }

    pub fn fail_reads(self) -> Self {
        self.fail_reads.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn marker_for(&self, target_id: &str) -> Option<Marker> {
        self.markers.lock().unwrap().get(target_id).cloned()
    }
}

impl Default for MockMarkerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarkerStore for MockMarkerStore {
    async fn get_marker(&self, target_id: &str) -> Result<Option<Marker>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("read refused".into()));
        }
        Ok(self.markers.lock().unwrap().get(target_id).cloned())
    }

    async fn set_marker(&self, marker: &Marker) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("write refused".into()));
        }
        // Same monotonic clamp the Postgres upsert applies.
        let mut markers = self.markers.lock().unwrap();
        match markers.get(&marker.target_id) {
            Some(existing) if existing.last_seen_at > marker.last_seen_at => {}
            _ => {
                markers.insert(marker.target_id.clone(), marker.clone());
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CountingBackend
// ---------------------------------------------------------------------------

/// Records every message it is asked to send. Always succeeds unless
/// switched to fail permanently.
pub struct CountingBackend {
    sent: Mutex<Vec<FormattedMessage>>,
    fail_permanently: AtomicBool,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_permanently: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let backend = Self::new();
        backend.fail_permanently.store(true, Ordering::SeqCst);
        backend
    }

    pub fn sent(&self) -> Vec<FormattedMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for CountingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifyBackend for CountingBackend {
    async fn send(&self, message: &FormattedMessage) -> Result<(), DispatchError> {
        if self.fail_permanently.load(Ordering::SeqCst) {
            return Err(DispatchError::Permanent {
                status: 400,
                message: "rejected".into(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
