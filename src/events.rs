//! Event tag classification.
//
// Guests are invited to a subset of the celebrations. The spreadsheet stores
// that as free text ("Haldi + Sangeet", "Wedding only", ...), so we map it to
// the fixed set of tags the site knows how to render.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sub-event a guest can be invited to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTag {
    Haldi,
    Sangeeth,
    Ceremony,
}

impl EventTag {
    /// All tags, in the order they are checked and reported
    pub const ALL: [EventTag; 3] = [EventTag::Haldi, EventTag::Sangeeth, EventTag::Ceremony];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::Haldi => "haldi",
            EventTag::Sangeeth => "sangeeth",
            EventTag::Ceremony => "ceremony",
        }
    }

    /// Lowercase substrings that mark an invitation to this event.
    /// "sangeet" also covers "sangeeth".
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            EventTag::Haldi => &["haldi"],
            EventTag::Sangeeth => &["sangeet", "sangeeth"],
            EventTag::Ceremony => &["wedding", "ceremony"],
        }
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the free-text "events invited" cell into canonical tags.
///
/// Matching is case-insensitive and independent per tag, so a single cell may
/// yield several tags. Blank or missing text yields an empty list.
pub fn parse_events(raw: Option<&str>) -> Vec<EventTag> {
    let text = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_lowercase(),
        _ => return Vec::new(),
    };

    EventTag::ALL
        .into_iter()
        .filter(|tag| tag.keywords().iter().any(|kw| text.contains(kw)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("Haldi", &[EventTag::Haldi] ; "haldi only")]
    #[test_case("Sangeet", &[EventTag::Sangeeth] ; "short sangeet spelling")]
    #[test_case("SANGEETH night", &[EventTag::Sangeeth] ; "long spelling upper case")]
    #[test_case("Wedding", &[EventTag::Ceremony] ; "wedding maps to ceremony")]
    #[test_case("ceremony", &[EventTag::Ceremony] ; "ceremony")]
    #[test_case("Haldi + Sangeet + Wedding", &EventTag::ALL ; "all three")]
    #[test_case("Reception", &[] ; "unknown event")]
    fn test_parse_events(raw: &str, expected: &[EventTag]) {
        assert_eq!(parse_events(Some(raw)), expected.to_vec());
    }

    #[test]
    fn test_blank_and_missing_text() {
        assert!(parse_events(None).is_empty());
        assert!(parse_events(Some("")).is_empty());
        assert!(parse_events(Some("   ")).is_empty());
    }

    #[test]
    fn test_order_independent() {
        assert_eq!(
            parse_events(Some("Wedding + Haldi")),
            parse_events(Some("Haldi + Wedding"))
        );
        assert_eq!(
            parse_events(Some("Wedding + Haldi")),
            vec![EventTag::Haldi, EventTag::Ceremony]
        );
    }

    #[test]
    fn test_wedding_ceremony_counts_once() {
        assert_eq!(
            parse_events(Some("Wedding Ceremony")),
            vec![EventTag::Ceremony]
        );
    }

    #[test]
    fn test_tag_serialization() {
        let json = serde_json::to_string(&EventTag::ALL).unwrap();
        assert_eq!(json, r#"["haldi","sangeeth","ceremony"]"#);

        let parsed: Vec<EventTag> = serde_json::from_str(r#"["ceremony","haldi"]"#).unwrap();
        assert_eq!(parsed, vec![EventTag::Ceremony, EventTag::Haldi]);
        assert_eq!(EventTag::Sangeeth.to_string(), "sangeeth");
    }
}
