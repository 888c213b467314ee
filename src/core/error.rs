// Centralized error handling for the switcher

use crate::models::torrent::TorrentId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the persisted policy store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Policy file {path} is corrupt: {reason}")]
    CorruptConfig { path: PathBuf, reason: String },

    #[error("Policy file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the torrent client gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Torrent client unreachable: {0}")]
    Connection(String),

    #[error("Torrent {0} not found")]
    TorrentNotFound(TorrentId),

    #[error("RPC call failed: {0}")]
    Rpc(String),
}

/// A tracker URL broke the marker encoding laws
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Disabled-marker encoding is not reversible for '{url}'")]
pub struct EncodingInvariantViolation {
    pub url: String,
}

/// Errors returned by the HTTP control surface
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to persist policy: {0}")]
    Store(#[from] StoreError),

    #[error("Torrent client error: {0}")]
    Gateway(#[from] GatewayError),
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        use crate::models::control::ErrorResponse;

        let status = match &self {
            ControlError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ControlError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ControlError::Gateway(_) => StatusCode::BAD_GATEWAY,
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
