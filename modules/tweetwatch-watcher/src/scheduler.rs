//! Scheduler/worker coordination.
//!
//! Each worker group owns one orchestrator (and with it one render session
//! scope) and runs on a fixed interval in its own task. Groups are
//! independent failure domains; a tick that fires while the previous pass is
//! still running is skipped, never queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use tweetwatch_common::CycleReport;

use crate::orchestrator::Orchestrator;

/// How long `stop` waits for in-flight cycles to reach a target boundary.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

pub struct WorkerGroup {
    name: String,
    orchestrator: Orchestrator,
    /// Single-flight guard: held for the duration of a pass.
    in_flight: Mutex<()>,
}

impl WorkerGroup {
    pub fn new(name: &str, orchestrator: Orchestrator) -> Self {
        Self {
            name: name.to_string(),
            orchestrator,
            in_flight: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one pass unless one is already in flight, in which case the
    /// trigger is dropped and `None` returned.
    pub async fn tick(&self, shutdown: &watch::Receiver<bool>) -> Option<CycleReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            info!(group = %self.name, "Previous pass still running, skipping tick");
            return None;
        };

        Some(self.orchestrator.run_cycle(shutdown).await)
    }
}

pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Spawn one polling task per group. The first pass runs immediately;
    /// subsequent ones on the interval.
    pub fn start(&self, groups: Vec<Arc<WorkerGroup>>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = groups
            .into_iter()
            .map(|group| {
                let mut shutdown = shutdown_rx.clone();
                let cancel = shutdown_rx.clone();
                let interval = self.interval;

                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {
                                group.tick(&cancel).await;
                            }
                            _ = shutdown.changed() => {
                                if *shutdown.borrow() {
                                    info!(group = %group.name(), "Worker group stopping");
                                    break;
                                }
                            }
                        }
                    }
                })
            })
            .collect();

        SchedulerHandle {
            shutdown: shutdown_tx,
            handles,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    drain_timeout: Duration,
}

impl SchedulerHandle {
    /// Signal shutdown and wait (bounded) for each group to drain. In-flight
    /// cycles stop at the next target boundary; nothing is torn mid-target.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);

        for handle in self.handles {
            match tokio::time::timeout(self.drain_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Worker group task panicked during drain"),
                Err(_) => warn!(
                    drain_timeout_secs = self.drain_timeout.as_secs(),
                    "Worker group did not drain in time, abandoning"
                ),
            }
        }
    }
}
