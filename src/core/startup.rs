use anyhow::{Context, Result};
use tracing::{error, info};

use crate::core::state::AppState;
use crate::models::policy::Policy;

/// Make sure a policy file exists and report what the loop will start with.
///
/// On first run the file is created disabled, seeded with the configured
/// initial trackers. A corrupt file is left alone for a human to fix; the
/// loop skips cycles until it parses again.
pub fn prepare_policy(state: &AppState) -> Result<()> {
    let seed = Policy::new(false, state.config.storage.initial_trackers.clone());

    let created = state
        .store
        .ensure_exists(&seed)
        .context("Failed to create the policy file")?;

    if created {
        info!(
            path = %state.store.path().display(),
            trackers = seed.trackers.len(),
            "Policy file initialised, service starts disabled"
        );
    }

    let policy = match state.store.load() {
        Ok(policy) => policy,
        Err(e) => {
            error!(error = %e, "Policy file unreadable at startup, starting from defaults");
            state.store.last_known_good()
        }
    };

    info!(
        enabled = policy.enabled,
        trackers = policy.trackers.len(),
        "Policy loaded"
    );

    Ok(())
}
