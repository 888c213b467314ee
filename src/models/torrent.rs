use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle the torrent client uses to address a torrent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorrentId(pub i64);

impl fmt::Display for TorrentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerRecord {
    /// Announce URL, possibly carrying the disabled marker
    pub announce: String,
    pub tier: u32,
}

impl TrackerRecord {
    pub fn new(announce: impl Into<String>, tier: u32) -> Self {
        Self {
            announce: announce.into(),
            tier,
        }
    }
}

/// Torrent state as observed during a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentSnapshot {
    pub id: TorrentId,
    pub name: String,
    /// Completion fraction in `[0, 1]`
    pub percent_done: f64,
    pub trackers: Vec<TrackerRecord>,
}

impl TorrentSnapshot {
    /// Seeding may begin only once the payload is fully present.
    pub fn is_complete(&self) -> bool {
        self.percent_done >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(percent_done: f64) -> TorrentSnapshot {
        TorrentSnapshot {
            id: TorrentId(1),
            name: "t".to_string(),
            percent_done,
            trackers: vec![],
        }
    }

    #[test]
    fn test_completion_boundary() {
        assert!(!snapshot(0.0).is_complete());
        assert!(!snapshot(0.999_999_9).is_complete());
        assert!(snapshot(1.0).is_complete());
    }

    #[test]
    fn test_torrent_id_display() {
        assert_eq!(TorrentId(42).to_string(), "42");
    }
}
