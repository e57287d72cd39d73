//! Static guest manifest loaded once at startup.

use super::{GuestSource, GuestSourceError};
use crate::config::SourceKind;
use crate::events::EventTag;
use crate::guest::{normalize_email, GuestMatch};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One manifest entry, e.g. `{"events": ["haldi", "ceremony"]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub events: Vec<EventTag>,
}

pub struct ManifestSource {
    guests: HashMap<String, ManifestEntry>,
}

impl ManifestSource {
    /// Read and parse a manifest document from disk
    pub fn load(path: &Path) -> Result<Self, GuestSourceError> {
        let content = fs::read_to_string(path).map_err(|source| GuestSourceError::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_json(&content)?;
        info!("Loaded {} guests from manifest {:?}", source.len(), path);
        Ok(source)
    }

    pub fn from_json(content: &str) -> Result<Self, GuestSourceError> {
        let raw: HashMap<String, ManifestEntry> = serde_json::from_str(content)?;
        Ok(Self::from_entries(raw))
    }

    /// Build a manifest from in-memory entries. Keys are normalized here so
    /// hand-edited manifests with mixed-case emails still match.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, ManifestEntry)>,
    {
        let mut guests = HashMap::new();
        for (email, entry) in entries {
            let key = normalize_email(&email);
            if guests.insert(key, entry).is_some() {
                warn!("Duplicate manifest entry for {}, keeping the last one", email);
            }
        }
        Self { guests }
    }

    fn len(&self) -> usize {
        self.guests.len()
    }
}

#[async_trait]
impl GuestSource for ManifestSource {
    async fn lookup(&self, email: &str) -> Result<Option<GuestMatch>, GuestSourceError> {
        let found = self
            .guests
            .get(email)
            .map(|entry| GuestMatch::events_only(entry.events.clone()));
        debug!("Manifest lookup for '{}': found={}", email, found.is_some());
        Ok(found)
    }

    async fn refresh(&self) -> Result<(), GuestSourceError> {
        Ok(())
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST: &str = r#"{
        "a@x.com": {"events": ["haldi", "ceremony"]},
        "Mixed@Case.com": {"events": ["sangeeth"]},
        "nobody@x.com": {"events": []}
    }"#;

    #[tokio::test]
    async fn test_lookup_hit_and_miss() {
        let source = ManifestSource::from_json(MANIFEST).unwrap();
        assert_eq!(source.len(), 3);

        let hit = source.lookup("a@x.com").await.unwrap();
        assert_eq!(
            hit,
            Some(GuestMatch::events_only(vec![EventTag::Haldi, EventTag::Ceremony]))
        );

        assert_eq!(source.lookup("b@x.com").await.unwrap(), None);
        assert_eq!(source.lookup("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_normalized() {
        let source = ManifestSource::from_json(MANIFEST).unwrap();
        let hit = source.lookup("mixed@case.com").await.unwrap().unwrap();
        assert_eq!(hit.events, vec![EventTag::Sangeeth]);
        assert!(hit.details.is_none());
    }

    #[tokio::test]
    async fn test_guest_with_no_events_is_still_found() {
        let source = ManifestSource::from_json(MANIFEST).unwrap();
        let hit = source.lookup("nobody@x.com").await.unwrap().unwrap();
        assert!(hit.events.is_empty());
    }

    #[test]
    fn test_unknown_event_tag_is_rejected() {
        let result = ManifestSource::from_json(r#"{"a@x.com": {"events": ["brunch"]}}"#);
        assert!(matches!(result, Err(GuestSourceError::ManifestParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();

        let source = ManifestSource::load(file.path()).unwrap();
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ManifestSource::load(Path::new("/definitely/not/here/MANIFEST.json"));
        assert!(matches!(result, Err(GuestSourceError::ManifestIo { .. })));
    }
}
