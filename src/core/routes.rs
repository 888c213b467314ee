// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::handlers::index::index_handler))
        .route("/health", get(crate::handlers::health::health_handler))
        .route("/metrics", get(crate::handlers::metrics::metrics_handler))

        // Policy endpoints
        .route(
            "/api/config",
            get(crate::handlers::config::get_config_handler)
                .post(crate::handlers::config::update_config_handler),
        )
        .route("/api/config/enabled", post(crate::handlers::config::set_enabled_handler))
        .route("/api/config/trackers", post(crate::handlers::config::set_trackers_handler))
        .route(
            "/api/disable_and_reenable",
            post(crate::handlers::config::disable_and_reenable_handler),
        )

        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
