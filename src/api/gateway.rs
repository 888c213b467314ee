use crate::core::error::GatewayError;
use crate::models::torrent::{TorrentId, TorrentSnapshot, TrackerRecord};
use async_trait::async_trait;

/// What the reconciliation loop needs from a torrent client.
///
/// Implementations own transport, authentication and retries; callers only
/// see snapshots and whole-list tracker replacement.
#[async_trait]
pub trait TorrentGateway: Send + Sync {
    /// Fails with [`GatewayError::Connection`] when the client cannot be reached.
    async fn list_torrents(&self) -> Result<Vec<TorrentSnapshot>, GatewayError>;

    /// Replace the full tracker list of a torrent.
    async fn set_trackers(
        &self,
        id: TorrentId,
        trackers: &[TrackerRecord],
    ) -> Result<(), GatewayError>;
}
