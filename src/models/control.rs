use crate::models::policy::{normalize_prefixes, prefixes_from_text, Policy};
use crate::reconcile::reenable::ReenableReport;
use serde::{Deserialize, Serialize};

/// Partial policy update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct PolicyPatch {
    pub enabled: Option<bool>,
    #[serde(default, alias = "target_trackers")]
    pub trackers: Option<TrackerInput>,
}

#[derive(Debug, Deserialize)]
pub struct EnabledUpdate {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct TrackersUpdate {
    #[serde(alias = "target_trackers")]
    pub trackers: TrackerInput,
}

/// Tracker prefixes as submitted: either a JSON array or newline-delimited text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TrackerInput {
    List(Vec<String>),
    Text(String),
}

impl TrackerInput {
    pub fn into_prefixes(self) -> Vec<String> {
        match self {
            TrackerInput::List(list) => normalize_prefixes(list),
            TrackerInput::Text(text) => prefixes_from_text(&text),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DisableAndReenableResponse {
    #[serde(flatten)]
    pub policy: Policy,
    pub reenable: ReenableReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_input_accepts_array() {
        let update: TrackersUpdate =
            serde_json::from_str(r#"{"trackers": [" https://a/ ", "", "https://b/"]}"#).unwrap();
        assert_eq!(
            update.trackers.into_prefixes(),
            vec!["https://a/".to_string(), "https://b/".to_string()]
        );
    }

    #[test]
    fn test_tracker_input_accepts_text() {
        let update: TrackersUpdate =
            serde_json::from_str(r#"{"trackers": "https://a/\n\n  https://b/  \n"}"#).unwrap();
        assert_eq!(
            update.trackers.into_prefixes(),
            vec!["https://a/".to_string(), "https://b/".to_string()]
        );
    }

    #[test]
    fn test_patch_fields_are_optional() {
        let patch: PolicyPatch = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        assert_eq!(patch.enabled, Some(true));
        assert!(patch.trackers.is_none());
    }
}
