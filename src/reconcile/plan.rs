use crate::models::policy::Policy;
use crate::models::torrent::{TorrentSnapshot, TrackerRecord};
use crate::reconcile::matcher::TrackerMatcher;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationDecision {
    NoChange,
    /// Carries the marked URL to write
    Disable(String),
    /// Carries the restored URL to write
    Enable(String),
}

/// Desired state of one tracker entry, from observed state only.
///
/// No history is consulted, so running the same decision twice is a no-op the
/// second time and a missed cycle heals on the next one. Unmanaged trackers
/// are never touched.
pub fn decide(
    matcher: &TrackerMatcher,
    policy: &Policy,
    torrent: &TorrentSnapshot,
    tracker: &TrackerRecord,
) -> MutationDecision {
    if !policy.enabled || !matcher.is_managed(&tracker.announce, &policy.trackers) {
        return MutationDecision::NoChange;
    }

    let disabled = matcher.is_disabled(&tracker.announce);
    match (torrent.is_complete(), disabled) {
        (true, true) => MutationDecision::Enable(matcher.decode_disabled(&tracker.announce)),
        (false, false) => MutationDecision::Disable(matcher.encode_disabled(&tracker.announce)),
        _ => MutationDecision::NoChange,
    }
}

/// New tracker list for one torrent plus what changed in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TorrentPlan {
    pub trackers: Vec<TrackerRecord>,
    pub disabled: usize,
    pub enabled: usize,
    /// Entries left alone because their URL broke the encoding laws
    pub skipped: usize,
}

impl TorrentPlan {
    pub fn has_changes(&self) -> bool {
        self.disabled + self.enabled > 0
    }

    fn apply(&mut self, matcher: &TrackerMatcher, tracker: &TrackerRecord, decision: MutationDecision) {
        let (url, counter) = match decision {
            MutationDecision::NoChange => {
                self.trackers.push(tracker.clone());
                return;
            }
            MutationDecision::Disable(url) => (url, &mut self.disabled),
            MutationDecision::Enable(url) => (url, &mut self.enabled),
        };

        if let Err(violation) = matcher.check_laws(&tracker.announce) {
            error!(
                tracker = %tracker.announce,
                error = %violation,
                "Skipping tracker whose URL cannot be toggled safely"
            );
            self.skipped += 1;
            self.trackers.push(tracker.clone());
            return;
        }

        *counter += 1;
        self.trackers.push(TrackerRecord {
            announce: url,
            tier: tracker.tier,
        });
    }
}

/// Apply [`decide`] to every tracker of a torrent, keeping order and tiers.
pub fn plan_torrent(
    matcher: &TrackerMatcher,
    policy: &Policy,
    torrent: &TorrentSnapshot,
) -> TorrentPlan {
    let mut plan = TorrentPlan::default();
    for tracker in &torrent.trackers {
        let decision = decide(matcher, policy, torrent, tracker);
        plan.apply(matcher, tracker, decision);
    }
    plan
}

/// Restore every marked tracker regardless of policy or completion.
pub fn plan_reenable(matcher: &TrackerMatcher, torrent: &TorrentSnapshot) -> TorrentPlan {
    let mut plan = TorrentPlan::default();
    for tracker in &torrent.trackers {
        let decision = if matcher.is_disabled(&tracker.announce) {
            MutationDecision::Enable(matcher.decode_disabled(&tracker.announce))
        } else {
            MutationDecision::NoChange
        };
        plan.apply(matcher, tracker, decision);
    }
    plan
}
