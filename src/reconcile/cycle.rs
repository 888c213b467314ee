use crate::api::gateway::TorrentGateway;
use crate::core::error::GatewayError;
use crate::metrics::collector::Metrics;
use crate::reconcile::matcher::TrackerMatcher;
use crate::reconcile::plan::plan_torrent;
use crate::stores::policy_store::PolicyStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Torrents were fetched and every needed mutation was attempted
    #[default]
    Completed,
    /// Policy disabled or no prefixes configured; no RPC issued
    Idle,
    /// Policy file unreadable; cycle aborted without mutations
    PolicyUnavailable,
    /// Listing torrents failed; cycle aborted without mutations
    ClientUnreachable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub torrents_seen: usize,
    pub torrents_mutated: usize,
    pub mutation_failures: usize,
    pub trackers_disabled: usize,
    pub trackers_enabled: usize,
    pub trackers_skipped: usize,
}

impl CycleReport {
    pub fn skipped(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            ..Self::default()
        }
    }
}

/// The recurring reconciliation task.
///
/// Each cycle reads the policy fresh from the store, takes a torrent snapshot
/// and pushes at most one tracker-list replacement per torrent. Nothing is
/// remembered between cycles.
///
/// `cycle_guard` is held for a whole cycle; other tracker-list writers take
/// it too.
pub struct Reconciler {
    store: Arc<PolicyStore>,
    gateway: Arc<dyn TorrentGateway>,
    matcher: TrackerMatcher,
    metrics: Arc<Metrics>,
    cycle_guard: Arc<Mutex<()>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<PolicyStore>,
        gateway: Arc<dyn TorrentGateway>,
        matcher: TrackerMatcher,
        metrics: Arc<Metrics>,
        cycle_guard: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            gateway,
            matcher,
            metrics,
            cycle_guard,
        }
    }

    /// Run cycles every `interval` until `shutdown` flips to true.
    ///
    /// A cycle always runs to completion; the next one is scheduled a full
    /// interval after it finishes, so cycles never overlap.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(interval_seconds = interval.as_secs(), "Reconciliation loop started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                    ticker.reset();
                    debug!(next_check_seconds = interval.as_secs(), "Waiting for next cycle");
                }
            }
        }

        info!("Reconciliation loop stopped");
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle_guard.lock().await;
        let report = self.reconcile().await;
        self.metrics.record_cycle(&report);
        report
    }

    async fn reconcile(&self) -> CycleReport {
        let policy = match self.store.load() {
            Ok(policy) => policy,
            Err(e) => {
                error!(error = %e, "Cannot read policy, skipping cycle");
                return CycleReport::skipped(CycleOutcome::PolicyUnavailable);
            }
        };

        if !policy.enabled {
            info!("Service disabled by policy, paused");
            return CycleReport::skipped(CycleOutcome::Idle);
        }
        if !policy.is_active() {
            info!("No managed trackers configured, paused");
            return CycleReport::skipped(CycleOutcome::Idle);
        }

        let torrents = match self.gateway.list_torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!(error = %e, "Torrent client unreachable, retrying next interval");
                return CycleReport::skipped(CycleOutcome::ClientUnreachable);
            }
        };

        info!(torrents = torrents.len(), "Checking torrents");

        let mut report = CycleReport {
            torrents_seen: torrents.len(),
            ..CycleReport::default()
        };

        for torrent in &torrents {
            let plan = plan_torrent(&self.matcher, &policy, torrent);
            report.trackers_skipped += plan.skipped;

            debug!(
                torrent_id = %torrent.id,
                name = %torrent.name,
                percent_done = torrent.percent_done,
                disable = plan.disabled,
                enable = plan.enabled,
                "Torrent evaluated"
            );

            if !plan.has_changes() {
                continue;
            }

            match self.gateway.set_trackers(torrent.id, &plan.trackers).await {
                Ok(()) => {
                    report.torrents_mutated += 1;
                    report.trackers_disabled += plan.disabled;
                    report.trackers_enabled += plan.enabled;
                    info!(
                        torrent_id = %torrent.id,
                        name = %torrent.name,
                        disabled = plan.disabled,
                        enabled = plan.enabled,
                        "Trackers updated"
                    );
                }
                Err(GatewayError::TorrentNotFound(id)) => {
                    report.mutation_failures += 1;
                    warn!(torrent_id = %id, "Torrent removed mid-cycle, skipping");
                }
                Err(e) => {
                    report.mutation_failures += 1;
                    error!(torrent_id = %torrent.id, error = %e, "Failed to update trackers");
                }
            }
        }

        info!(
            torrents = report.torrents_seen,
            mutated = report.torrents_mutated,
            failures = report.mutation_failures,
            disabled = report.trackers_disabled,
            enabled = report.trackers_enabled,
            "Reconciliation cycle complete"
        );

        report
    }
}
