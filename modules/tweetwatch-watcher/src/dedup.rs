//! Deduplication engine: which extracted records are new relative to the
//! stored watermark, and what the watermark becomes.
//!
//! Pure and deterministic — no clock reads, no I/O. The caller supplies
//! already-parsed records; anything with an unparseable timestamp was
//! dropped by the extractor before reaching this point.

use tweetwatch_common::{Marker, Record};

/// Output of [`select_new`].
#[derive(Debug, Clone)]
pub struct Selection {
    /// Genuinely new records, ordered most-recent-first.
    pub new_records: Vec<Record>,
    /// Watermark to persist. `None` when the extracted set was empty —
    /// nothing to advance.
    pub next_marker: Option<Marker>,
}

/// Select the records that are new relative to `marker`.
///
/// With no prior marker (first-ever observation), every record is new: the
/// watermark gets seeded and the first contact notifies once, by policy.
/// With a marker, a record is new iff its timestamp is strictly later, or
/// equal with a different external id (same-second collisions).
///
/// The next marker is taken from the most recent record of the full
/// pre-filter set and clamped so `last_seen_at` never regresses, even when
/// the extractor returns older content than previously seen.
pub fn select_new(records: &[Record], marker: Option<&Marker>) -> Selection {
    let mut new_records: Vec<Record> = match marker {
        None => records.to_vec(),
        Some(m) => records
            .iter()
            .filter(|r| {
                r.occurred_at > m.last_seen_at
                    || (r.occurred_at == m.last_seen_at
                        && r.external_id != m.last_seen_external_id)
            })
            .cloned()
            .collect(),
    };

    // Most-recent-first; equal timestamps tie-break on external id so the
    // order is stable across calls.
    new_records.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| b.external_id.cmp(&a.external_id))
    });

    let newest = records.iter().max_by_key(|r| r.occurred_at);

    let next_marker = newest.map(|newest| match marker {
        Some(m) if m.last_seen_at >= newest.occurred_at => m.clone(),
        _ => Marker {
            target_id: newest.target_id.clone(),
            last_seen_at: newest.occurred_at,
            last_seen_external_id: newest.external_id.clone(),
        },
    });

    Selection {
        new_records,
        next_marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, TimeZone, Utc};
    use tweetwatch_common::Payload;

    fn ts(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 7, 12, 0, secs).unwrap()
    }

    fn record(id: &str, occurred_at: DateTime<Utc>) -> Record {
        Record {
            target_id: "elonmusk".into(),
            external_id: id.into(),
            occurred_at,
            payload: Payload::default(),
        }
    }

    fn marker(at: DateTime<Utc>, id: &str) -> Marker {
        Marker {
            target_id: "elonmusk".into(),
            last_seen_at: at,
            last_seen_external_id: id.into(),
        }
    }

    #[test]
    fn no_marker_treats_all_as_new() {
        let records = vec![record("p1", ts(1)), record("p2", ts(3)), record("p3", ts(2))];
        let selection = select_new(&records, None);

        assert_eq!(selection.new_records.len(), 3);
        let next = selection.next_marker.unwrap();
        assert_eq!(next.last_seen_at, ts(3));
        assert_eq!(next.last_seen_external_id, "p2");
    }

    #[test]
    fn strictly_newer_records_selected() {
        let m = marker(ts(5), "p1");
        let records = vec![record("p1", ts(5)), record("p2", ts(7))];
        let selection = select_new(&records, Some(&m));

        assert_eq!(selection.new_records.len(), 1);
        assert_eq!(selection.new_records[0].external_id, "p2");
        assert_eq!(selection.next_marker.unwrap().last_seen_at, ts(7));
    }

    #[test]
    fn equal_timestamp_different_id_is_new() {
        // marker {T, p1}, records [{p1,T}, {p2,T}, {p3,T+1}] →
        // [p3, p2] newest-first; p1 excluded.
        let m = marker(ts(5), "p1");
        let records = vec![record("p1", ts(5)), record("p2", ts(5)), record("p3", ts(6))];
        let selection = select_new(&records, Some(&m));

        let ids: Vec<&str> = selection
            .new_records
            .iter()
            .map(|r| r.external_id.as_str())
            .collect();
        assert_eq!(ids, vec!["p3", "p2"]);
    }

    #[test]
    fn marker_never_regresses() {
        // Extractor non-determinism: only older content returned.
        let m = marker(ts(10), "p9");
        let records = vec![record("p1", ts(2)), record("p2", ts(4))];
        let selection = select_new(&records, Some(&m));

        assert!(selection.new_records.is_empty());
        let next = selection.next_marker.unwrap();
        assert_eq!(next.last_seen_at, ts(10));
        assert_eq!(next.last_seen_external_id, "p9");
    }

    #[test]
    fn empty_set_yields_no_marker() {
        let m = marker(ts(10), "p9");
        let selection = select_new(&[], Some(&m));
        assert!(selection.new_records.is_empty());
        assert!(selection.next_marker.is_none());

        let seeded = select_new(&[], None);
        assert!(seeded.next_marker.is_none());
    }

    #[test]
    fn idempotent_for_same_input() {
        let m = marker(ts(5), "p1");
        let records = vec![record("p1", ts(5)), record("p2", ts(5)), record("p3", ts(6))];

        let a = select_new(&records, Some(&m));
        let b = select_new(&records, Some(&m));

        assert_eq!(a.new_records, b.new_records);
        assert_eq!(a.next_marker, b.next_marker);
    }
}
