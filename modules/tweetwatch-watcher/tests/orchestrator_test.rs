//! Orchestrator cycle behavior against mocked trait boundaries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use tweetwatch_common::Target;
use tweetwatch_notify::Dispatcher;
use tweetwatch_watcher::testing::{
    hashtag_target, marker, profile_target, record, ts, BlockingExtractor, CountingBackend,
    MockExtractor, MockMarkerStore, MockResponse,
};
use tweetwatch_watcher::traits::RecordExtractor;
use tweetwatch_watcher::Orchestrator;

fn orchestrator(
    targets: Vec<Target>,
    extractor: Arc<dyn RecordExtractor>,
    store: Arc<MockMarkerStore>,
    backend: Arc<CountingBackend>,
) -> Orchestrator {
    Orchestrator::new(
        "test",
        targets,
        extractor,
        store,
        Dispatcher::new(backend, 0),
        Duration::from_secs(5),
    )
}

fn no_shutdown() -> watch::Receiver<bool> {
    // Receiver keeps returning the last value after the sender drops.
    watch::channel(false).1
}

#[tokio::test]
async fn first_contact_notifies_and_seeds_marker() {
    let target = profile_target("elonmusk");
    let extractor = Arc::new(MockExtractor::new().on_target(
        "elonmusk",
        MockResponse::Records(vec![
            record("elonmusk", "p1", ts(1)),
            record("elonmusk", "p2", ts(3)),
        ]),
    ));
    let store = Arc::new(MockMarkerStore::new());
    let backend = Arc::new(CountingBackend::new());

    let orch = orchestrator(vec![target], extractor, store.clone(), backend.clone());
    let report = orch.run_cycle(&no_shutdown()).await;

    assert_eq!(report.delivered(), 2);
    assert_eq!(backend.sent_count(), 2);

    let seeded = store.marker_for("elonmusk").unwrap();
    assert_eq!(seeded.last_seen_at, ts(3));
    assert_eq!(seeded.last_seen_external_id, "p2");
}

#[tokio::test]
async fn only_new_records_dispatched_newest_first() {
    let target = profile_target("elonmusk");
    let extractor = Arc::new(MockExtractor::new().on_target(
        "elonmusk",
        MockResponse::Records(vec![
            record("elonmusk", "p1", ts(5)),
            record("elonmusk", "p2", ts(5)),
            record("elonmusk", "p3", ts(6)),
        ]),
    ));
    let store = Arc::new(MockMarkerStore::seeded(marker("elonmusk", ts(5), "p1")));
    let backend = Arc::new(CountingBackend::new());

    let orch = orchestrator(vec![target], extractor, store.clone(), backend.clone());
    let report = orch.run_cycle(&no_shutdown()).await;

    // p3 strictly newer, p2 equal-timestamp different id, p1 already seen.
    assert_eq!(report.targets[0].new_ids, vec!["p3", "p2"]);
    let sent = backend.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].url, "p3");
    assert_eq!(sent[1].url, "p2");

    assert_eq!(store.marker_for("elonmusk").unwrap().last_seen_at, ts(6));
}

#[tokio::test]
async fn failed_target_isolated_from_siblings() {
    let broken = profile_target("broken");
    let healthy = profile_target("healthy");
    let extractor = Arc::new(
        MockExtractor::new()
            .on_target("broken", MockResponse::Timeout)
            .on_target(
                "healthy",
                MockResponse::Records(vec![record("healthy", "h1", ts(1))]),
            ),
    );
    let store = Arc::new(MockMarkerStore::new());
    let backend = Arc::new(CountingBackend::new());

    let orch = orchestrator(
        vec![broken, healthy],
        extractor,
        store.clone(),
        backend.clone(),
    );
    let report = orch.run_cycle(&no_shutdown()).await;

    assert!(report.targets[0].error.is_some());
    assert!(report.targets[0].new_ids.is_empty());
    assert!(store.marker_for("broken").is_none());

    // The sibling still produced a full result.
    assert!(report.targets[1].error.is_none());
    assert_eq!(report.targets[1].delivered, 1);
    assert_eq!(backend.sent_count(), 1);
    assert!(backend.sent()[0].url.contains("h1"));
}

#[tokio::test(start_paused = true)]
async fn slow_extraction_bounded_by_timeout() {
    let target = profile_target("slow");
    let extractor = Arc::new(BlockingExtractor::new());
    let store = Arc::new(MockMarkerStore::new());
    let backend = Arc::new(CountingBackend::new());

    let orch = orchestrator(vec![target], extractor, store, backend.clone());
    let report = orch.run_cycle(&no_shutdown()).await;

    let err = report.targets[0].error.as_deref().unwrap();
    assert!(err.contains("timed out"), "got: {err}");
    assert_eq!(backend.sent_count(), 0);
}

#[tokio::test]
async fn marker_read_failure_skips_target() {
    let target = profile_target("elonmusk");
    let extractor = Arc::new(MockExtractor::new().on_target(
        "elonmusk",
        MockResponse::Records(vec![record("elonmusk", "p1", ts(1))]),
    ));
    let store = Arc::new(MockMarkerStore::new().fail_reads());
    let backend = Arc::new(CountingBackend::new());

    let orch = orchestrator(vec![target], extractor, store, backend.clone());
    let report = orch.run_cycle(&no_shutdown()).await;

    // Treating a failed read as "no marker" would flood; the target errors
    // instead and nothing is sent.
    assert!(report.targets[0].error.is_some());
    assert_eq!(backend.sent_count(), 0);
}

#[tokio::test]
async fn marker_write_failure_reports_delivered_but_unpersisted() {
    let target = profile_target("elonmusk");
    let extractor = Arc::new(MockExtractor::new().on_target(
        "elonmusk",
        MockResponse::Records(vec![record("elonmusk", "p1", ts(1))]),
    ));
    let store = Arc::new(MockMarkerStore::new().fail_writes());
    let backend = Arc::new(CountingBackend::new());

    let orch = orchestrator(vec![target], extractor, store.clone(), backend.clone());
    let report = orch.run_cycle(&no_shutdown()).await;

    let outcome = &report.targets[0];
    assert_eq!(outcome.delivered, 1);
    assert!(outcome.persist_error.is_some());
    assert!(outcome.error.is_none());
    assert_eq!(backend.sent_count(), 1);
    assert!(store.marker_for("elonmusk").is_none());
}

#[tokio::test]
async fn permanent_delivery_failure_counted_and_marker_advanced() {
    let target = profile_target("elonmusk");
    let extractor = Arc::new(MockExtractor::new().on_target(
        "elonmusk",
        MockResponse::Records(vec![record("elonmusk", "p1", ts(1))]),
    ));
    let store = Arc::new(MockMarkerStore::new());
    let backend = Arc::new(CountingBackend::failing());

    let orch = orchestrator(vec![target], extractor, store.clone(), backend.clone());
    let report = orch.run_cycle(&no_shutdown()).await;

    let outcome = &report.targets[0];
    assert_eq!(outcome.delivered, 0);
    assert_eq!(outcome.delivery_failures, 1);
    // Extraction succeeded, so the watermark still advances: re-notifying
    // already-attempted records next cycle is judged worse than dropping one.
    assert!(store.marker_for("elonmusk").is_some());
}

#[tokio::test]
async fn session_loss_aborts_remaining_targets() {
    let first = profile_target("first");
    let second = profile_target("second");
    let third = hashtag_target("#crypto");
    let extractor = Arc::new(
        MockExtractor::new().on_target("first", MockResponse::SessionUnavailable),
    );
    let store = Arc::new(MockMarkerStore::new());
    let backend = Arc::new(CountingBackend::new());

    let orch = orchestrator(
        vec![first, second, third],
        extractor.clone(),
        store,
        backend,
    );
    let report = orch.run_cycle(&no_shutdown()).await;

    assert!(report.fatal.is_some());
    assert_eq!(report.targets.len(), 3);
    assert!(report.targets[0].error.is_some());
    assert!(report.targets[1].skipped);
    assert!(report.targets[2].skipped);
    // The later targets were never extracted.
    assert_eq!(extractor.calls(), vec!["first"]);
}
