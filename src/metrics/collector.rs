use crate::reconcile::cycle::{CycleOutcome, CycleReport};
use crate::utils::time::{current_timestamp, elapsed_seconds};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Counters describing what the reconciliation loop has done since start.
pub struct Metrics {
    pub cycles_completed: AtomicU64,
    pub cycles_idle: AtomicU64,
    pub cycles_skipped: AtomicU64,
    pub trackers_disabled: AtomicU64,
    pub trackers_enabled: AtomicU64,
    pub mutation_failures: AtomicU64,
    /// Unix seconds of the last finished cycle, 0 before the first one
    pub last_cycle_at: AtomicI64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub cycles_idle: u64,
    pub cycles_skipped: u64,
    pub trackers_disabled: u64,
    pub trackers_enabled: u64,
    pub mutation_failures: u64,
    pub last_cycle_at: Option<i64>,
    pub uptime_seconds: i64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            cycles_idle: AtomicU64::new(0),
            cycles_skipped: AtomicU64::new(0),
            trackers_disabled: AtomicU64::new(0),
            trackers_enabled: AtomicU64::new(0),
            mutation_failures: AtomicU64::new(0),
            last_cycle_at: AtomicI64::new(0),
            start_time: current_timestamp(),
        }
    }

    pub fn record_cycle(&self, report: &CycleReport) {
        let counter = match report.outcome {
            CycleOutcome::Completed => &self.cycles_completed,
            CycleOutcome::Idle => &self.cycles_idle,
            CycleOutcome::PolicyUnavailable | CycleOutcome::ClientUnreachable => {
                &self.cycles_skipped
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.trackers_disabled
            .fetch_add(report.trackers_disabled as u64, Ordering::Relaxed);
        self.trackers_enabled
            .fetch_add(report.trackers_enabled as u64, Ordering::Relaxed);
        self.mutation_failures
            .fetch_add(report.mutation_failures as u64, Ordering::Relaxed);
        self.last_cycle_at
            .store(current_timestamp(), Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let last_cycle_at = self.last_cycle_at.load(Ordering::Relaxed);

        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_idle: self.cycles_idle.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            trackers_disabled: self.trackers_disabled.load(Ordering::Relaxed),
            trackers_enabled: self.trackers_enabled.load(Ordering::Relaxed),
            mutation_failures: self.mutation_failures.load(Ordering::Relaxed),
            last_cycle_at: (last_cycle_at > 0).then_some(last_cycle_at),
            uptime_seconds: elapsed_seconds(self.start_time, current_timestamp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let snapshot = Metrics::new().get_snapshot();
        assert_eq!(snapshot.cycles_completed, 0);
        assert_eq!(snapshot.cycles_skipped, 0);
        assert!(snapshot.last_cycle_at.is_none());
        assert!(snapshot.uptime_seconds >= 0);
    }

    #[test]
    fn test_record_cycle_accumulates() {
        let metrics = Metrics::new();
        let report = CycleReport {
            outcome: CycleOutcome::Completed,
            torrents_seen: 3,
            torrents_mutated: 2,
            mutation_failures: 1,
            trackers_disabled: 2,
            trackers_enabled: 1,
            trackers_skipped: 0,
        };

        metrics.record_cycle(&report);
        metrics.record_cycle(&report);
        metrics.record_cycle(&CycleReport::skipped(CycleOutcome::ClientUnreachable));

        let snapshot = metrics.get_snapshot();
        assert_eq!(snapshot.cycles_completed, 2);
        assert_eq!(snapshot.cycles_skipped, 1);
        assert_eq!(snapshot.trackers_disabled, 4);
        assert_eq!(snapshot.trackers_enabled, 2);
        assert_eq!(snapshot.mutation_failures, 2);
        assert!(snapshot.last_cycle_at.is_some());
    }
}
