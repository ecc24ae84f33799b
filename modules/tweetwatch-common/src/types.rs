use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Targets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Profile,
    Hashtag,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Profile => write!(f, "profile"),
            TargetKind::Hashtag => write!(f, "hashtag"),
        }
    }
}

/// A named source polled every cycle: a user profile or a hashtag live search.
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Stable unique id, used as the marker key. Derived from the locator:
    /// `elonmusk` for profiles, `hashtag_crypto` for hashtags.
    pub id: String,
    pub kind: TargetKind,
    /// Normalized handle, hashtag term, or a full profile URL.
    pub locator: String,
}

impl Target {
    /// Build a target from raw configured input, normalizing `@` / `#`
    /// prefixes. A full URL is kept verbatim as the locator (profiles only);
    /// its id falls back to the last path segment.
    pub fn new(kind: TargetKind, raw: &str) -> Self {
        let raw = raw.trim();
        match kind {
            TargetKind::Profile => {
                if raw.starts_with("http") {
                    let id = raw
                        .trim_end_matches('/')
                        .rsplit('/')
                        .next()
                        .unwrap_or(raw)
                        .to_string();
                    Self {
                        id,
                        kind,
                        locator: raw.to_string(),
                    }
                } else {
                    let handle = raw.trim_start_matches('@').to_string();
                    Self {
                        id: handle.clone(),
                        kind,
                        locator: handle,
                    }
                }
            }
            TargetKind::Hashtag => {
                let term = raw.trim_start_matches('#').to_string();
                Self {
                    id: format!("hashtag_{term}"),
                    kind,
                    locator: term,
                }
            }
        }
    }

    /// The page URL the extractor renders for this target.
    pub fn url(&self) -> String {
        match self.kind {
            TargetKind::Profile => {
                if self.locator.starts_with("http") {
                    self.locator.clone()
                } else {
                    format!("https://x.com/{}", self.locator)
                }
            }
            TargetKind::Hashtag => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("q", &format!("#{}", self.locator))
                    .append_pair("src", "typed_query")
                    .append_pair("f", "live")
                    .finish();
                format!("https://x.com/search?{query}")
            }
        }
    }
}

// --- Records ---

/// Opaque structured fields scraped from one post block. Counts are kept as
/// the display strings the page shows ("1.2K"), never parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub author: String,
    pub handle: String,
    pub text: String,
    pub replies: String,
    pub reposts: String,
    pub likes: String,
    pub media_url: Option<String>,
}

/// One extracted post. Identity is `(target_id, external_id)`; produced fresh
/// each extraction pass and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub target_id: String,
    /// Permalink of the post, used as the identity key.
    pub external_id: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: Payload,
}

// --- Markers ---

/// Durable watermark for a target: the most recent record already processed.
/// `last_seen_at` is monotonically non-decreasing for the life of the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub target_id: String,
    pub last_seen_at: DateTime<Utc>,
    pub last_seen_external_id: String,
}

// --- Cycle reporting ---

/// Outcome of one target within a cycle. An `error` means the target was not
/// processed this cycle and its marker is untouched.
#[derive(Debug, Clone, Default)]
pub struct TargetOutcome {
    pub target_id: String,
    /// External ids of records the dedup engine classified as new.
    pub new_ids: Vec<String>,
    pub delivered: usize,
    pub delivery_failures: usize,
    /// Set when the marker write failed after delivery (records stay
    /// reported as delivered; see the orchestrator trade-off).
    pub persist_error: Option<String>,
    pub error: Option<String>,
    /// True when the cycle was cut short (shutdown or group-fatal error)
    /// before this target was attempted.
    pub skipped: bool,
}

impl TargetOutcome {
    pub fn new(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
            ..Default::default()
        }
    }

    pub fn skipped(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
            skipped: true,
            ..Default::default()
        }
    }
}

/// Report for one orchestrator pass over a group's targets. Logged by the
/// scheduler and discarded, never persisted.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub group: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Group-fatal error that aborted the cycle, if any.
    pub fatal: Option<String>,
    pub targets: Vec<TargetOutcome>,
}

impl CycleReport {
    pub fn delivered(&self) -> usize {
        self.targets.iter().map(|t| t.delivered).sum()
    }

    pub fn delivery_failures(&self) -> usize {
        self.targets.iter().map(|t| t.delivery_failures).sum()
    }

    pub fn errored(&self) -> usize {
        self.targets.iter().filter(|t| t.error.is_some()).count()
    }

    pub fn skipped(&self) -> usize {
        self.targets.iter().filter(|t| t.skipped).count()
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "group={} targets={} delivered={} failures={} errors={} skipped={} took={}ms",
            self.group,
            self.targets.len(),
            self.delivered(),
            self.delivery_failures(),
            self.errored(),
            self.skipped(),
            (self.finished_at - self.started_at).num_milliseconds(),
        )
    }
}
