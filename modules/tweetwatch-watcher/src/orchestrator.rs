//! Target orchestrator: one pass over a group's targets.
//!
//! Targets are processed strictly sequentially — the render session backing
//! the extractor must never be driven by two logical passes at once. Errors
//! are target-scoped and land in the cycle report; only a lost render
//! session aborts the rest of the pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use tweetwatch_common::{CycleReport, ExtractError, Target, TargetOutcome};
use tweetwatch_notify::Dispatcher;

use crate::dedup::select_new;
use crate::traits::{MarkerStore, RecordExtractor};

pub struct Orchestrator {
    group: String,
    targets: Vec<Target>,
    extractor: Arc<dyn RecordExtractor>,
    store: Arc<dyn MarkerStore>,
    dispatcher: Dispatcher,
    target_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        group: &str,
        targets: Vec<Target>,
        extractor: Arc<dyn RecordExtractor>,
        store: Arc<dyn MarkerStore>,
        dispatcher: Dispatcher,
        target_timeout: Duration,
    ) -> Self {
        Self {
            group: group.to_string(),
            targets,
            extractor,
            store,
            dispatcher,
            target_timeout,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Run one cycle over the configured targets, in configured order.
    /// Cancellation is cooperative and only takes effect between targets —
    /// in-flight target work completes or fails naturally.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let started_at = Utc::now();
        let mut outcomes: Vec<TargetOutcome> = Vec::with_capacity(self.targets.len());
        let mut fatal: Option<String> = None;

        info!(group = %self.group, targets = self.targets.len(), "Cycle starting");

        for (idx, target) in self.targets.iter().enumerate() {
            if *shutdown.borrow() {
                info!(group = %self.group, "Shutdown requested, stopping cycle at target boundary");
                outcomes.extend(self.targets[idx..].iter().map(|t| TargetOutcome::skipped(&t.id)));
                break;
            }

            let (outcome, group_fatal) = self.process_target(target).await;
            outcomes.push(outcome);

            if let Some(reason) = group_fatal {
                warn!(group = %self.group, error = %reason, "Render session lost, aborting cycle");
                outcomes.extend(
                    self.targets[idx + 1..]
                        .iter()
                        .map(|t| TargetOutcome::skipped(&t.id)),
                );
                fatal = Some(reason);
                break;
            }
        }

        let report = CycleReport {
            group: self.group.clone(),
            started_at,
            finished_at: Utc::now(),
            fatal,
            targets: outcomes,
        };

        info!(group = %self.group, "Cycle finished: {report}");
        report
    }

    /// Process a single target. Returns its outcome plus a group-fatal
    /// reason when the render session itself is gone.
    async fn process_target(&self, target: &Target) -> (TargetOutcome, Option<String>) {
        let mut outcome = TargetOutcome::new(&target.id);

        let extracted =
            match tokio::time::timeout(self.target_timeout, self.extractor.extract(target)).await {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    warn!(group = %self.group, target = %target.id, error = %e, "Extraction failed");
                    let group_fatal = matches!(e, ExtractError::SessionUnavailable(_))
                        .then(|| e.to_string());
                    outcome.error = Some(e.to_string());
                    return (outcome, group_fatal);
                }
                Err(_) => {
                    let e = ExtractError::Timeout;
                    warn!(group = %self.group, target = %target.id, timeout_secs = self.target_timeout.as_secs(), "Extraction timed out");
                    outcome.error = Some(e.to_string());
                    return (outcome, None);
                }
            };

        // A read failure skips the target: acting on "no marker" here would
        // re-notify the entire extracted set.
        let marker = match self.store.get_marker(&target.id).await {
            Ok(marker) => marker,
            Err(e) => {
                warn!(group = %self.group, target = %target.id, error = %e, "Marker read failed");
                outcome.error = Some(e.to_string());
                return (outcome, None);
            }
        };

        let selection = select_new(&extracted, marker.as_ref());
        outcome.new_ids = selection
            .new_records
            .iter()
            .map(|r| r.external_id.clone())
            .collect();

        for record in &selection.new_records {
            match self.dispatcher.deliver(record, target).await {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    warn!(
                        group = %self.group,
                        target = %target.id,
                        record = %record.external_id,
                        error = %e,
                        "Delivery failed"
                    );
                    outcome.delivery_failures += 1;
                }
            }
        }

        // Persist the advanced watermark. If this write fails the records
        // stay reported as delivered and the marker stays stale: a one-cycle
        // duplicate risk is accepted over re-notifying on retry.
        if let Some(next) = selection.next_marker {
            if let Err(e) = self.store.set_marker(&next).await {
                warn!(group = %self.group, target = %target.id, error = %e, "Marker write failed, records already delivered");
                outcome.persist_error = Some(e.to_string());
            }
        }

        (outcome, None)
    }
}
