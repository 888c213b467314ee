use crate::core::error::EncodingInvariantViolation;

pub const DEFAULT_MARKER: &str = "disabled-";

const SCHEME_SEPARATOR: &str = "://";

/// Decides which announce URLs are managed and encodes the disabled state
/// into the URL itself.
///
/// The marker is placed directly in front of the host (`https://disabled-host/...`)
/// so the client fails to resolve the tracker while the rest of the URL,
/// passkey included, survives untouched. URLs without a scheme get the marker
/// at the very start.
#[derive(Debug, Clone)]
pub struct TrackerMatcher {
    marker: String,
}

impl Default for TrackerMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl TrackerMatcher {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// True iff the decoded URL starts with any non-empty prefix. Case sensitive.
    pub fn is_managed(&self, url: &str, prefixes: &[String]) -> bool {
        let clean = self.decode_disabled(url);
        prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| clean.starts_with(p.as_str()))
    }

    pub fn is_disabled(&self, url: &str) -> bool {
        let (_, rest) = split_scheme(url);
        !self.marker.is_empty() && rest.starts_with(self.marker.as_str())
    }

    pub fn encode_disabled(&self, url: &str) -> String {
        if self.is_disabled(url) {
            return url.to_string();
        }
        let (head, rest) = split_scheme(url);
        format!("{}{}{}", head, self.marker, rest)
    }

    pub fn decode_disabled(&self, url: &str) -> String {
        if !self.is_disabled(url) {
            return url.to_string();
        }
        let (head, rest) = split_scheme(url);
        let stripped = rest.get(self.marker.len()..).unwrap_or_default();
        format!("{}{}", head, stripped)
    }

    /// Check that toggling `url` in either direction is reversible and stable.
    ///
    /// Fails for hosts that themselves begin with the marker, e.g.
    /// `https://disabled-disabled-host/` decodes to a URL that still looks disabled.
    pub fn check_laws(&self, url: &str) -> Result<(), EncodingInvariantViolation> {
        let clean = self.decode_disabled(url);
        let encoded = self.encode_disabled(&clean);

        let holds = self.decode_disabled(&clean) == clean
            && self.encode_disabled(&encoded) == encoded
            && self.decode_disabled(&encoded) == clean
            && !self.is_disabled(&clean)
            && self.is_disabled(&encoded);

        if holds {
            Ok(())
        } else {
            Err(EncodingInvariantViolation {
                url: url.to_string(),
            })
        }
    }
}

/// Split after the scheme separator. A `://` appearing after the first `/`
/// or `?` belongs to the path or query, not the scheme.
fn split_scheme(url: &str) -> (&str, &str) {
    match url.find(SCHEME_SEPARATOR) {
        Some(idx) if !url[..idx].contains(['/', '?']) => {
            url.split_at(idx + SCHEME_SEPARATOR.len())
        }
        _ => ("", url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_inserts_marker_before_host() {
        let m = TrackerMatcher::default();
        assert_eq!(
            m.encode_disabled("https://priv.example/announce?passkey=x"),
            "https://disabled-priv.example/announce?passkey=x"
        );
    }

    #[test]
    fn test_decode_strips_marker() {
        let m = TrackerMatcher::default();
        assert_eq!(
            m.decode_disabled("https://disabled-priv.example/announce?passkey=x"),
            "https://priv.example/announce?passkey=x"
        );
    }

    #[test]
    fn test_encoding_laws_hold() {
        let m = TrackerMatcher::default();
        let urls = [
            "https://priv.example/announce?passkey=x",
            "udp://tracker.example:1337/announce",
            "http://disabled-a/ann",
            "tracker.example/announce",
            "",
        ];

        for url in urls {
            let enc = m.encode_disabled(url);
            let dec = m.decode_disabled(url);
            assert_eq!(m.encode_disabled(&enc), enc, "encode not idempotent for {url}");
            assert_eq!(m.decode_disabled(&dec), dec, "decode not idempotent for {url}");
            assert_eq!(m.decode_disabled(&m.encode_disabled(&dec)), dec);
            if !m.is_disabled(url) {
                assert_eq!(m.decode_disabled(&enc), url);
            }
        }
    }

    #[test]
    fn test_is_disabled() {
        let m = TrackerMatcher::default();
        assert!(m.is_disabled("https://disabled-a/ann"));
        assert!(!m.is_disabled("https://a/ann"));
        assert!(!m.is_disabled("https://a/disabled-ann"));
    }

    #[test]
    fn test_url_without_scheme_gets_leading_marker() {
        let m = TrackerMatcher::default();
        assert_eq!(m.encode_disabled("tracker/ann"), "disabled-tracker/ann");
        assert_eq!(m.decode_disabled("disabled-tracker/ann"), "tracker/ann");
    }

    #[test]
    fn test_separator_inside_query_is_not_a_scheme() {
        let m = TrackerMatcher::default();
        assert_eq!(
            m.encode_disabled("tracker/ann?next=http://x"),
            "disabled-tracker/ann?next=http://x"
        );
    }

    #[test]
    fn test_managed_matches_decoded_form() {
        let m = TrackerMatcher::default();
        let p = prefixes(&["https://priv.example/announce"]);
        assert!(m.is_managed("https://priv.example/announce?passkey=x", &p));
        assert!(m.is_managed("https://disabled-priv.example/announce?passkey=x", &p));
        assert!(!m.is_managed("https://public.example/announce", &p));
    }

    #[test]
    fn test_managed_is_case_sensitive_and_ignores_empty_prefixes() {
        let m = TrackerMatcher::default();
        assert!(!m.is_managed("https://PRIV.example/a", &prefixes(&["https://priv.example"])));
        assert!(!m.is_managed("https://priv.example/a", &prefixes(&[""])));
    }

    #[test]
    fn test_custom_marker() {
        let m = TrackerMatcher::new("off.");
        assert_eq!(m.encode_disabled("http://a/ann"), "http://off.a/ann");
        assert!(m.is_disabled("http://off.a/ann"));
        assert!(!m.is_disabled("http://disabled-a/ann"));
    }

    #[test]
    fn test_check_laws_rejects_double_marked_host() {
        let m = TrackerMatcher::default();
        assert!(m.check_laws("https://priv.example/ann").is_ok());
        assert!(m.check_laws("https://disabled-priv.example/ann").is_ok());
        assert_eq!(
            m.check_laws("https://disabled-disabled-priv.example/ann"),
            Err(EncodingInvariantViolation {
                url: "https://disabled-disabled-priv.example/ann".to_string()
            })
        );
    }
}
