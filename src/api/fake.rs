// In-memory gateway used by the loop, job and handler tests

use crate::api::gateway::TorrentGateway;
use crate::core::error::GatewayError;
use crate::models::torrent::{TorrentId, TorrentSnapshot, TrackerRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
pub struct FakeGateway {
    pub torrents: Mutex<Vec<TorrentSnapshot>>,
    pub set_calls: Mutex<Vec<(TorrentId, Vec<TrackerRecord>)>>,
    pub failing: Mutex<HashSet<TorrentId>>,
    /// Listed, but gone by the time a mutation arrives
    pub vanished: Mutex<HashSet<TorrentId>>,
    pub unreachable: Mutex<bool>,
    /// Next `set_trackers` parks until this is notified
    pub hold_next_set: Mutex<Option<Arc<Notify>>>,
    pub set_entered: Notify,
}

impl FakeGateway {
    pub fn with_torrents(torrents: Vec<TorrentSnapshot>) -> Self {
        Self {
            torrents: Mutex::new(torrents),
            ..Self::default()
        }
    }

    pub fn fail_on(&self, id: TorrentId) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn vanish_before_mutation(&self, id: TorrentId) {
        self.vanished.lock().unwrap().insert(id);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    pub fn hold_next_set(&self, release: Arc<Notify>) {
        *self.hold_next_set.lock().unwrap() = Some(release);
    }

    pub fn set_percent_done(&self, id: TorrentId, percent_done: f64) {
        for t in self.torrents.lock().unwrap().iter_mut() {
            if t.id == id {
                t.percent_done = percent_done;
            }
        }
    }

    pub fn trackers_of(&self, id: TorrentId) -> Vec<TrackerRecord> {
        self.torrents
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.trackers.clone())
            .unwrap_or_default()
    }

    pub fn set_call_count(&self) -> usize {
        self.set_calls.lock().unwrap().len()
    }
}

pub fn snapshot(id: i64, percent_done: f64, urls: &[&str]) -> TorrentSnapshot {
    TorrentSnapshot {
        id: TorrentId(id),
        name: format!("torrent-{}", id),
        percent_done,
        trackers: urls
            .iter()
            .enumerate()
            .map(|(tier, url)| TrackerRecord::new(*url, tier as u32))
            .collect(),
    }
}

#[async_trait]
impl TorrentGateway for FakeGateway {
    async fn list_torrents(&self) -> Result<Vec<TorrentSnapshot>, GatewayError> {
        if *self.unreachable.lock().unwrap() {
            return Err(GatewayError::Connection("connection refused".to_string()));
        }
        Ok(self.torrents.lock().unwrap().clone())
    }

    async fn set_trackers(
        &self,
        id: TorrentId,
        trackers: &[TrackerRecord],
    ) -> Result<(), GatewayError> {
        let hold = self.hold_next_set.lock().unwrap().take();
        if let Some(release) = hold {
            self.set_entered.notify_one();
            release.notified().await;
        }

        if self.failing.lock().unwrap().contains(&id) {
            return Err(GatewayError::Rpc("simulated failure".to_string()));
        }
        if self.vanished.lock().unwrap().contains(&id) {
            return Err(GatewayError::TorrentNotFound(id));
        }

        let mut torrents = self.torrents.lock().unwrap();
        let torrent = torrents
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(GatewayError::TorrentNotFound(id))?;
        torrent.trackers = trackers.to_vec();
        drop(torrents);

        self.set_calls
            .lock()
            .unwrap()
            .push((id, trackers.to_vec()));
        Ok(())
    }
}
