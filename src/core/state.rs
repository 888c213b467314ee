// Application state (AppState)

use crate::api::gateway::TorrentGateway;
use crate::core::config::Config;
use crate::metrics::collector::Metrics;
use crate::reconcile::cycle::Reconciler;
use crate::reconcile::matcher::TrackerMatcher;
use crate::stores::policy_store::PolicyStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
///
/// Handed to the control surface handlers and used to build the
/// reconciliation loop, so both contexts go through the same policy store.
#[derive(Clone)]
pub struct AppState {
    /// Persisted policy, the only state shared with the loop
    pub store: Arc<PolicyStore>,

    /// Torrent client access
    pub gateway: Arc<dyn TorrentGateway>,

    /// Disabled-marker encoding
    pub matcher: TrackerMatcher,

    /// Cycle counters
    pub metrics: Arc<Metrics>,

    /// Configuration
    pub config: Arc<Config>,

    /// Held by a running cycle; the re-enable job waits on it
    pub cycle_guard: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<dyn TorrentGateway>) -> Self {
        let store = Arc::new(PolicyStore::new(config.storage.policy_path.clone()));
        let matcher = TrackerMatcher::new(config.reconcile.disabled_marker.clone());

        Self {
            store,
            gateway,
            matcher,
            metrics: Arc::new(Metrics::new()),
            config: Arc::new(config),
            cycle_guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.gateway),
            self.matcher.clone(),
            Arc::clone(&self.metrics),
            Arc::clone(&self.cycle_guard),
        )
    }
}
