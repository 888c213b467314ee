use crate::api::gateway::TorrentGateway;
use crate::core::config::TransmissionConfig;
use crate::core::error::GatewayError;
use crate::models::torrent::{TorrentId, TorrentSnapshot, TrackerRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Header Transmission uses for its CSRF session token
pub const SESSION_HEADER: &str = "X-Transmission-Session-Id";

const TORRENT_FIELDS: [&str; 4] = ["id", "name", "percentDone", "trackers"];

/// Transmission RPC client.
///
/// A `409 Conflict` means the session token expired; the fresh token from the
/// response header is stored and the call is retried once. A timed out request
/// gets its own single retry. Anything after that surfaces as an error.
pub struct TransmissionClient {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<Credentials>,
    session_id: RwLock<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, A> {
    method: &'a str,
    arguments: A,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: String,
    arguments: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TorrentList {
    #[serde(default)]
    torrents: Vec<RpcTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTorrent {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    percent_done: f64,
    #[serde(default)]
    trackers: Vec<RpcTracker>,
}

#[derive(Debug, Deserialize)]
struct RpcTracker {
    announce: String,
    #[serde(default)]
    tier: u32,
}

impl From<RpcTorrent> for TorrentSnapshot {
    fn from(t: RpcTorrent) -> Self {
        Self {
            id: TorrentId(t.id),
            name: t.name,
            percent_done: t.percent_done,
            trackers: t
                .trackers
                .into_iter()
                .map(|tr| TrackerRecord::new(tr.announce, tr.tier))
                .collect(),
        }
    }
}

impl TransmissionClient {
    pub fn new(
        endpoint: String,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            credentials,
            session_id: RwLock::new(None),
        })
    }

    pub fn from_config(config: &TransmissionConfig) -> Result<Self> {
        let credentials = config.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: config.password.clone(),
        });

        Self::new(
            config.endpoint(),
            credentials,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<A, T>(&self, method: &str, arguments: A) -> Result<Option<T>, GatewayError>
    where
        A: Serialize + Send + Sync,
        T: DeserializeOwned,
    {
        let body = RpcRequest { method, arguments };
        let mut session_refreshed = false;
        let mut timeout_retried = false;

        let response = loop {
            match self.send(&body).await {
                Ok(response) if response.status() == StatusCode::CONFLICT && !session_refreshed => {
                    self.refresh_session(&response)?;
                    debug!(method, "Transmission session rotated, retrying");
                    session_refreshed = true;
                }
                Ok(response) => break response,
                Err(e) if e.is_timeout() && !timeout_retried => {
                    warn!(method, error = %e, "Transmission request timed out, retrying");
                    timeout_retried = true;
                }
                Err(e) => return Err(classify(e)),
            }
        };

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(GatewayError::Rpc(
                "session id rejected after refresh".to_string(),
            ));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Rpc("authentication rejected".to_string()));
        }
        if !status.is_success() {
            return Err(GatewayError::Rpc(format!(
                "Transmission returned error status: {}",
                status
            )));
        }

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Rpc(format!("Failed to parse RPC response: {}", e)))?;

        if parsed.result != "success" {
            return Err(GatewayError::Rpc(parsed.result));
        }

        Ok(parsed.arguments)
    }

    async fn send<A>(&self, body: &RpcRequest<'_, A>) -> reqwest::Result<Response>
    where
        A: Serialize,
    {
        let mut request = self.client.post(&self.endpoint).json(body);

        if let Some(session_id) = self.session_id() {
            request = request.header(SESSION_HEADER, session_id);
        }
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, creds.password.as_ref());
        }

        request.send().await
    }

    fn session_id(&self) -> Option<String> {
        self.session_id
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn refresh_session(&self, response: &Response) -> Result<(), GatewayError> {
        let fresh = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                GatewayError::Rpc("409 response without a session id header".to_string())
            })?;

        *self
            .session_id
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(fresh.to_string());
        Ok(())
    }

    async fn get_torrents(
        &self,
        ids: Option<&[TorrentId]>,
        fields: &[&str],
    ) -> Result<Vec<RpcTorrent>, GatewayError> {
        let arguments = match ids {
            Some(ids) => json!({
                "ids": ids.iter().map(|id| id.0).collect::<Vec<_>>(),
                "fields": fields,
            }),
            None => json!({ "fields": fields }),
        };

        let list: Option<TorrentList> = self.call("torrent-get", arguments).await?;
        Ok(list.map(|l| l.torrents).unwrap_or_default())
    }
}

#[async_trait]
impl TorrentGateway for TransmissionClient {
    async fn list_torrents(&self) -> Result<Vec<TorrentSnapshot>, GatewayError> {
        let torrents = self.get_torrents(None, &TORRENT_FIELDS).await.map_err(|e| match e {
            GatewayError::Connection(msg) => GatewayError::Connection(msg),
            other => GatewayError::Connection(other.to_string()),
        })?;

        Ok(torrents.into_iter().map(TorrentSnapshot::from).collect())
    }

    async fn set_trackers(
        &self,
        id: TorrentId,
        trackers: &[TrackerRecord],
    ) -> Result<(), GatewayError> {
        // torrent-set silently ignores unknown ids
        let existing = self
            .get_torrents(Some(std::slice::from_ref(&id)), &["id"])
            .await?;
        if !existing.iter().any(|t| t.id == id.0) {
            return Err(GatewayError::TorrentNotFound(id));
        }

        let arguments = json!({
            "ids": [id.0],
            "trackerList": tracker_list(trackers),
        });
        let _: Option<IgnoredAny> = self.call("torrent-set", arguments).await?;

        Ok(())
    }
}

/// Render trackers in Transmission's `trackerList` form: one URL per line,
/// tiers in ascending order separated by a blank line.
pub fn tracker_list(trackers: &[TrackerRecord]) -> String {
    let mut tiers: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for tracker in trackers {
        tiers
            .entry(tracker.tier)
            .or_default()
            .push(tracker.announce.as_str());
    }

    tiers
        .values()
        .map(|urls| urls.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn classify(e: reqwest::Error) -> GatewayError {
    if e.is_connect() {
        GatewayError::Connection(e.to_string())
    } else if e.is_timeout() {
        GatewayError::Rpc(format!("request timed out: {}", e))
    } else {
        GatewayError::Rpc(e.to_string())
    }
}
