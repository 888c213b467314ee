use crate::models::control::ErrorResponse;
use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};

pub async fn fallback_handler(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            error: format!(
                "No route for {}. Valid endpoints: /, /api/config, /health, /metrics",
                uri.path()
            ),
        }),
    )
        .into_response()
}
