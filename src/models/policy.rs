use serde::{Deserialize, Serialize};

/// Persisted tracker policy.
///
/// `trackers` holds URL prefixes; a torrent's announce URL is managed when it
/// starts with any of them. Duplicates are harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "target_trackers")]
    pub trackers: Vec<String>,
}

impl Policy {
    pub fn new(enabled: bool, trackers: Vec<String>) -> Self {
        Self { enabled, trackers }
    }

    /// Whether the loop has anything to do under this policy
    pub fn is_active(&self) -> bool {
        self.enabled && self.trackers.iter().any(|t| !t.is_empty())
    }
}

/// Normalize a list of prefixes as entered by a user: trim and drop empties.
pub fn normalize_prefixes<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split newline-delimited text into prefixes.
pub fn prefixes_from_text(text: &str) -> Vec<String> {
    normalize_prefixes(text.lines())
}
