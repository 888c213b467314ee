// Metrics endpoint

use crate::core::state::AppState;
use crate::metrics::collector::MetricsSnapshot;
use axum::{extract::State, response::Json};
use std::sync::Arc;

/// Reconciliation counters since process start
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.get_snapshot())
}
