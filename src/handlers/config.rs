use crate::core::error::ControlError;
use crate::core::state::AppState;
use crate::models::control::{
    DisableAndReenableResponse, EnabledUpdate, PolicyPatch, TrackersUpdate,
};
use crate::models::policy::Policy;
use crate::reconcile::reenable::reenable_all;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::{info, warn};

/// Current policy
///
/// GET /api/config
pub async fn get_config_handler(State(state): State<Arc<AppState>>) -> Json<Policy> {
    Json(state.store.load_or_last_known())
}

/// Replace any of `enabled` / `trackers`
///
/// POST /api/config
pub async fn update_config_handler(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<PolicyPatch>,
) -> Result<Json<Policy>, ControlError> {
    let trackers = patch.trackers.map(|t| t.into_prefixes());

    let policy = state.store.update(|policy| {
        if let Some(enabled) = patch.enabled {
            policy.enabled = enabled;
        }
        if let Some(trackers) = trackers {
            policy.trackers = trackers;
        }
    })?;

    info!(
        enabled = policy.enabled,
        trackers = policy.trackers.len(),
        "Policy updated"
    );

    Ok(Json(policy))
}

/// POST /api/config/enabled
pub async fn set_enabled_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<EnabledUpdate>,
) -> Result<Json<Policy>, ControlError> {
    let policy = state.store.update(|policy| policy.enabled = update.enabled)?;
    info!(enabled = policy.enabled, "Service toggled");
    Ok(Json(policy))
}

/// Full replacement of the managed prefixes; accepts an array or newline-separated text
///
/// POST /api/config/trackers
pub async fn set_trackers_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<TrackersUpdate>,
) -> Result<Json<Policy>, ControlError> {
    let trackers = update.trackers.into_prefixes();
    let policy = state.store.update(|policy| policy.trackers = trackers)?;
    info!(trackers = policy.trackers.len(), "Managed trackers replaced");
    Ok(Json(policy))
}

/// Turn the service off, then restore every disabled tracker.
///
/// POST /api/disable_and_reenable
pub async fn disable_and_reenable_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DisableAndReenableResponse>, ControlError> {
    info!("Disabling service and re-enabling all trackers");

    // Persist first so later cycles stay idle, then wait out a running one
    let policy = state.store.update(|policy| policy.enabled = false)?;
    let _cycle = state.cycle_guard.lock().await;

    let report = reenable_all(state.gateway.as_ref(), &state.matcher).await?;
    if !report.is_success() {
        warn!(failed = report.failed, "Some torrents could not be re-enabled");
    }

    Ok(Json(DisableAndReenableResponse {
        policy,
        reenable: report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{snapshot, FakeGateway};
    use crate::core::config::Config;
    use crate::models::control::TrackerInput;
    use crate::models::torrent::TorrentId;
    use axum::response::IntoResponse;
    use axum::http::StatusCode;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn create_test_state(dir: &TempDir, gateway: Arc<FakeGateway>) -> Arc<AppState> {
        let mut config = Config::default();
        config.storage.policy_path = dir.path().join("config.json");
        Arc::new(AppState::new(config, gateway))
    }

    #[tokio::test]
    async fn test_get_returns_defaults_when_no_file() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir, Arc::new(FakeGateway::default()));

        let Json(policy) = get_config_handler(State(state)).await;

        assert_eq!(policy, Policy::default());
    }

    #[tokio::test]
    async fn test_patch_updates_only_given_fields() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir, Arc::new(FakeGateway::default()));
        state
            .store
            .save(&Policy::new(false, vec!["https://a/".to_string()]))
            .unwrap();

        let patch = PolicyPatch {
            enabled: Some(true),
            trackers: None,
        };
        let Json(policy) = update_config_handler(State(state.clone()), Json(patch))
            .await
            .unwrap();

        assert!(policy.enabled);
        assert_eq!(policy.trackers, vec!["https://a/".to_string()]);
        assert_eq!(state.store.load().unwrap(), policy);
    }

    #[tokio::test]
    async fn test_set_trackers_from_text() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir, Arc::new(FakeGateway::default()));

        let update = TrackersUpdate {
            trackers: TrackerInput::Text(" https://a/ \n\nhttps://b/\n".to_string()),
        };
        let Json(policy) = set_trackers_handler(State(state.clone()), Json(update))
            .await
            .unwrap();

        assert_eq!(
            policy.trackers,
            vec!["https://a/".to_string(), "https://b/".to_string()]
        );
        assert_eq!(
            get_config_handler(State(state)).await.0.trackers,
            policy.trackers
        );
    }

    #[tokio::test]
    async fn test_set_enabled() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir, Arc::new(FakeGateway::default()));

        let Json(policy) =
            set_enabled_handler(State(state.clone()), Json(EnabledUpdate { enabled: true }))
                .await
                .unwrap();

        assert!(policy.enabled);
        assert!(state.store.load().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_failed_save_is_rejected_and_not_reflected() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.policy_path = dir.path().join("missing").join("config.json");
        let state = Arc::new(AppState::new(config, Arc::new(FakeGateway::default())));

        let result =
            set_enabled_handler(State(state.clone()), Json(EnabledUpdate { enabled: true })).await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!get_config_handler(State(state)).await.0.enabled);
    }

    #[tokio::test]
    async fn test_disable_and_reenable() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(FakeGateway::with_torrents(vec![snapshot(
            1,
            0.5,
            &["https://disabled-priv.example/ann", "https://open/ann"],
        )]));
        let state = create_test_state(&dir, gateway.clone());
        state
            .store
            .save(&Policy::new(true, vec!["https://priv.example/".to_string()]))
            .unwrap();

        let Json(response) = disable_and_reenable_handler(State(state.clone()))
            .await
            .unwrap();

        assert!(!response.policy.enabled);
        assert_eq!(response.reenable.succeeded, 1);
        assert!(!state.store.load().unwrap().enabled);
        assert_eq!(
            gateway.trackers_of(TorrentId(1))[0].announce,
            "https://priv.example/ann"
        );
    }

    #[tokio::test]
    async fn test_disable_and_reenable_waits_for_running_cycle() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(FakeGateway::with_torrents(vec![snapshot(
            1,
            0.5,
            &["https://priv.example/ann"],
        )]));
        let state = create_test_state(&dir, gateway.clone());
        state
            .store
            .save(&Policy::new(true, vec!["https://priv.example/".to_string()]))
            .unwrap();

        // park a cycle inside its disabling set_trackers call
        let release = Arc::new(Notify::new());
        gateway.hold_next_set(Arc::clone(&release));
        let reconciler = state.reconciler();
        let cycle = tokio::spawn(async move { reconciler.run_cycle().await });
        gateway.set_entered.notified().await;

        let job = tokio::spawn(disable_and_reenable_handler(State(state.clone())));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!job.is_finished());

        release.notify_one();
        assert_eq!(cycle.await.unwrap().trackers_disabled, 1);
        let Json(response) = job.await.unwrap().unwrap();

        assert!(!response.policy.enabled);
        assert_eq!(response.reenable.succeeded, 1);
        assert_eq!(
            gateway.trackers_of(TorrentId(1))[0].announce,
            "https://priv.example/ann"
        );
    }

    #[tokio::test]
    async fn test_disable_and_reenable_reports_unreachable_client() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.set_unreachable(true);
        let state = create_test_state(&dir, gateway);
        state.store.save(&Policy::new(true, vec![])).unwrap();

        let response = disable_and_reenable_handler(State(state.clone()))
            .await
            .unwrap_err()
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        // the service stays off even though the job could not run
        assert!(!state.store.load().unwrap().enabled);
    }
}
