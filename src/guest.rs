use crate::events::EventTag;
use serde::{Deserialize, Serialize};

/// A successful guest lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestMatch {
    pub events: Vec<EventTag>,
    /// Only sources that carry personal details (the live sheet) fill this in
    pub details: Option<GuestDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub rsvp_status: Option<String>,
}

impl GuestMatch {
    pub fn events_only(events: Vec<EventTag>) -> Self {
        Self {
            events,
            details: None,
        }
    }
}

/// Normalize an email address into the lookup key: trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// First whitespace-delimited token of a full name, empty if there is none
pub fn first_name(full_name: Option<&str>) -> String {
    full_name
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or_default()
        .to_string()
}

/// Trimmed, lowercased RSVP text, or `None` when the cell is blank
pub fn normalize_rsvp(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("Foo@Bar.com "), "foo@bar.com");
        assert_eq!(normalize_email("  foo@bar.com"), normalize_email("FOO@BAR.COM"));
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn test_first_name() {
        assert_eq!(first_name(Some("Bob Lee")), "Bob");
        assert_eq!(first_name(Some("  Priya   Ramesh Kumar ")), "Priya");
        assert_eq!(first_name(Some("Cher")), "Cher");
        assert_eq!(first_name(Some("   ")), "");
        assert_eq!(first_name(None), "");
    }

    #[test]
    fn test_normalize_rsvp() {
        assert_eq!(normalize_rsvp(Some(" Yes ")), Some("yes".to_string()));
        assert_eq!(normalize_rsvp(Some("Not Going")), Some("not going".to_string()));
        assert_eq!(normalize_rsvp(Some("")), None);
        assert_eq!(normalize_rsvp(None), None);
    }
}
