//! Live guest list backed by a spreadsheet CSV export.
//
// Every refresh downloads the whole export and builds a new table. Readers
// hold an `Arc` to whichever table was current when they started, so a
// refresh never exposes a half-built table.

use super::{GuestSource, GuestSourceError};
use crate::config::{SheetConfig, SourceKind};
use crate::events::parse_events;
use crate::guest::{first_name, normalize_email, normalize_rsvp, GuestDetails, GuestMatch};
use async_trait::async_trait;
use log::{debug, error, info};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use url::Url;

pub const EMAIL_COLUMN: &str = "Email";
pub const NAME_COLUMN: &str = "Name";
pub const EVENTS_COLUMN: &str = "Event(s) invited";
pub const RSVP_COLUMN: &str = "RSVP";

/// One spreadsheet row, with blank cells stored as `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestRow {
    /// Normalized email
    pub email: String,
    pub name: Option<String>,
    pub events_invited: Option<String>,
    pub rsvp: Option<String>,
}

impl GuestRow {
    pub fn to_match(&self) -> GuestMatch {
        GuestMatch {
            events: parse_events(self.events_invited.as_deref()),
            details: Some(GuestDetails {
                first_name: first_name(self.name.as_deref()),
                rsvp_status: normalize_rsvp(self.rsvp.as_deref()),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GuestTable {
    rows: Vec<GuestRow>,
}

impl GuestTable {
    /// Parse a CSV export. The header row must name every expected column;
    /// rows with a blank email are skipped.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, GuestSourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| GuestSourceError::MissingColumn(name.to_string()))
        };
        let email_idx = column(EMAIL_COLUMN)?;
        let name_idx = column(NAME_COLUMN)?;
        let events_idx = column(EVENTS_COLUMN)?;
        let rsvp_idx = column(RSVP_COLUMN)?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let email = match cell(&record, email_idx) {
                Some(email) => normalize_email(&email),
                None => continue,
            };
            rows.push(GuestRow {
                email,
                name: cell(&record, name_idx),
                events_invited: cell(&record, events_idx),
                rsvp: cell(&record, rsvp_idx),
            });
        }

        Ok(Self { rows })
    }

    /// First row whose email matches. Later duplicates are ignored.
    pub fn find(&self, email: &str) -> Option<&GuestRow> {
        let mut matches = self.rows.iter().filter(|row| row.email == email);
        let first = matches.next();
        if first.is_some() && matches.next().is_some() {
            debug!("Guest sheet has several rows for '{}', using the first", email);
        }
        first
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

fn cell(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build the CSV export URL for a spreadsheet
pub fn export_url(config: &SheetConfig) -> Result<Url, GuestSourceError> {
    let sheet_id = config.sheet_id.as_deref().map(str::trim).unwrap_or_default();
    if sheet_id.is_empty() {
        return Err(GuestSourceError::Unavailable(
            "no spreadsheet id configured".to_string(),
        ));
    }

    let mut url = Url::parse(&format!(
        "{}/{}/export",
        config.export_base_url.trim_end_matches('/'),
        sheet_id
    ))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("format", "csv");
        if let Some(gid) = config.gid.as_deref() {
            query.append_pair("gid", gid);
        }
    }
    Ok(url)
}

#[derive(Debug, Clone)]
enum Snapshot {
    /// Nothing fetched yet
    Pending,
    Ready(Arc<GuestTable>),
    /// Last refresh failed; holds the reason
    Failed(String),
}

/// Current snapshot plus the generation of the refresh that produced it
#[derive(Debug)]
struct SheetState {
    generation: u64,
    snapshot: Snapshot,
}

pub struct SheetSource {
    client: reqwest::Client,
    export_url: Url,
    state: RwLock<SheetState>,
    /// Handed to each refresh when it starts; only a newer refresh may
    /// replace a snapshot
    next_generation: AtomicU64,
    /// Held by lookups that found no table while they fetch one
    load_lock: Mutex<()>,
}

impl SheetSource {
    pub fn new(config: &SheetConfig) -> Result<Self, GuestSourceError> {
        let export_url = export_url(config)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        debug!("Guest sheet export URL: {}", export_url);

        Ok(Self {
            client,
            export_url,
            state: RwLock::new(SheetState {
                generation: 0,
                snapshot: Snapshot::Pending,
            }),
            next_generation: AtomicU64::new(1),
            load_lock: Mutex::new(()),
        })
    }

    /// Number of rows in the current table, if one is loaded
    pub async fn guest_count(&self) -> Option<usize> {
        match &self.state.read().await.snapshot {
            Snapshot::Ready(table) => Some(table.len()),
            _ => None,
        }
    }

    async fn read_state(&self) -> (u64, Snapshot) {
        let state = self.state.read().await;
        (state.generation, state.snapshot.clone())
    }

    async fn fetch_table(&self) -> Result<GuestTable, GuestSourceError> {
        let response = self.client.get(self.export_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GuestSourceError::Status(status));
        }
        let body = response.bytes().await?;
        GuestTable::from_csv(&body[..])
    }

    /// Fetch a fresh table and swap it in. A failure replaces the current
    /// table too, so lookups report the outage instead of serving stale rows.
    /// Results from a refresh that started before the installed snapshot's
    /// refresh are dropped.
    async fn reload(&self) -> Result<Arc<GuestTable>, GuestSourceError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let result = self.fetch_table().await;

        let mut state = self.state.write().await;
        let is_newest = generation > state.generation;
        match result {
            Ok(table) => {
                let table = Arc::new(table);
                if is_newest {
                    info!("Loaded {} guests from sheet", table.len());
                    state.generation = generation;
                    state.snapshot = Snapshot::Ready(Arc::clone(&table));
                } else {
                    debug!(
                        "Discarding guest sheet refresh {} superseded by {}",
                        generation, state.generation
                    );
                }
                Ok(table)
            }
            Err(e) => {
                error!("Failed to refresh guest sheet: {}", e);
                if is_newest {
                    state.generation = generation;
                    state.snapshot = Snapshot::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// The loaded table, fetching it first when there is none. Concurrent
    /// callers share a single fetch.
    async fn current_table(&self) -> Result<Arc<GuestTable>, GuestSourceError> {
        let (seen_generation, snapshot) = self.read_state().await;
        if let Snapshot::Ready(table) = snapshot {
            return Ok(table);
        }

        let _loading = self.load_lock.lock().await;
        let (generation, snapshot) = self.read_state().await;
        match snapshot {
            Snapshot::Ready(table) => Ok(table),
            // Another caller fetched and failed while we waited
            Snapshot::Failed(reason) if generation != seen_generation => {
                Err(GuestSourceError::Unavailable(reason))
            }
            Snapshot::Pending => {
                debug!("Guest sheet not loaded yet, fetching before lookup");
                self.reload().await
            }
            Snapshot::Failed(reason) => {
                debug!("Last guest sheet refresh failed ({}), fetching again", reason);
                self.reload().await
            }
        }
    }
}

#[async_trait]
impl GuestSource for SheetSource {
    async fn lookup(&self, email: &str) -> Result<Option<GuestMatch>, GuestSourceError> {
        let table = self.current_table().await?;
        let found = table.find(email).map(GuestRow::to_match);
        debug!("Sheet lookup for '{}': found={}", email, found.is_some());
        Ok(found)
    }

    async fn refresh(&self) -> Result<(), GuestSourceError> {
        self.reload().await.map(|_| ())
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTag;
    use pretty_assertions::assert_eq;

    const CSV: &str = "\
Timestamp,Email,Name,Event(s) invited,RSVP
1,b@x.com,Bob Lee,Sangeet,Yes
2, Carol@X.com ,Carol,Haldi + Sangeet + Wedding,
3,,No Email,Wedding,Yes
4,b@x.com,Bobby Two,Haldi,No
";

    fn sheet_config(sheet_id: Option<&str>, gid: Option<&str>) -> SheetConfig {
        SheetConfig {
            sheet_id: sheet_id.map(str::to_string),
            gid: gid.map(str::to_string),
            ..SheetConfig::default()
        }
    }

    #[test]
    fn test_parse_table() {
        let table = GuestTable::from_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);

        let bob = table.find("b@x.com").unwrap();
        assert_eq!(bob.name.as_deref(), Some("Bob Lee"));
        assert_eq!(
            bob.to_match(),
            GuestMatch {
                events: vec![EventTag::Sangeeth],
                details: Some(GuestDetails {
                    first_name: "Bob".to_string(),
                    rsvp_status: Some("yes".to_string()),
                }),
            }
        );
    }

    #[test]
    fn test_email_cells_are_normalized() {
        let table = GuestTable::from_csv(CSV.as_bytes()).unwrap();
        let carol = table.find("carol@x.com").unwrap().to_match();
        assert_eq!(carol.events, EventTag::ALL.to_vec());
        assert_eq!(carol.details.unwrap().rsvp_status, None);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let table = GuestTable::from_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.find("b@x.com").unwrap().name.as_deref(), Some("Bob Lee"));
    }

    #[test]
    fn test_missing_column() {
        let csv = "Email,Name,RSVP\na@x.com,Al,Yes\n";
        let result = GuestTable::from_csv(csv.as_bytes());
        assert!(matches!(
            result,
            Err(GuestSourceError::MissingColumn(col)) if col == EVENTS_COLUMN
        ));
    }

    #[test]
    fn test_padded_headers_and_short_rows() {
        let csv = " Email , Name ,Event(s) invited, RSVP \na@x.com\n";
        let table = GuestTable::from_csv(csv.as_bytes()).unwrap();
        let row = table.find("a@x.com").unwrap();
        assert_eq!(row.name, None);

        let found = row.to_match();
        assert!(found.events.is_empty());
        assert_eq!(
            found.details,
            Some(GuestDetails {
                first_name: String::new(),
                rsvp_status: None,
            })
        );
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut bytes = b"Email,Name,Event(s) invited,RSVP\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b',', b'x', b'\n']);
        let result = GuestTable::from_csv(&bytes[..]);
        assert!(matches!(result, Err(GuestSourceError::Csv(_))));
    }

    #[test]
    fn test_export_url() {
        let url = export_url(&sheet_config(Some("abc123"), None)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv"
        );

        let url = export_url(&sheet_config(Some("abc123"), Some("42"))).unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid=42"
        );
    }

    #[test]
    fn test_export_url_requires_sheet_id() {
        assert!(export_url(&sheet_config(None, None)).is_err());
        assert!(export_url(&sheet_config(Some("  "), None)).is_err());
    }
}
