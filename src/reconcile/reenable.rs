use crate::api::gateway::TorrentGateway;
use crate::core::error::GatewayError;
use crate::reconcile::matcher::TrackerMatcher;
use crate::reconcile::plan::plan_reenable;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReenableReport {
    pub torrents_scanned: usize,
    /// Torrents whose tracker list was restored
    pub succeeded: usize,
    pub failed: usize,
    pub trackers_enabled: usize,
}

impl ReenableReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Strip the disabled marker from every tracker of every torrent.
///
/// Ignores the policy, the managed prefixes and completion state. Meant for
/// decommissioning: run it once and every tracker this service ever touched
/// is live again.
pub async fn reenable_all(
    gateway: &dyn TorrentGateway,
    matcher: &TrackerMatcher,
) -> Result<ReenableReport, GatewayError> {
    info!("Re-enabling all disabled trackers");

    let torrents = gateway.list_torrents().await?;
    let mut report = ReenableReport {
        torrents_scanned: torrents.len(),
        ..ReenableReport::default()
    };

    for torrent in &torrents {
        let plan = plan_reenable(matcher, torrent);
        if !plan.has_changes() {
            continue;
        }

        match gateway.set_trackers(torrent.id, &plan.trackers).await {
            Ok(()) => {
                report.succeeded += 1;
                report.trackers_enabled += plan.enabled;
                info!(
                    torrent_id = %torrent.id,
                    name = %torrent.name,
                    trackers = plan.enabled,
                    "Trackers re-enabled"
                );
            }
            Err(e) => {
                report.failed += 1;
                error!(torrent_id = %torrent.id, error = %e, "Failed to re-enable trackers");
            }
        }
    }

    info!(
        scanned = report.torrents_scanned,
        succeeded = report.succeeded,
        failed = report.failed,
        "Global re-enabling complete"
    );

    Ok(report)
}
