//! Guest sources
//!
//! A guest source answers "is this email on the guest list, and for what".
//! Two implementations exist: a static JSON manifest loaded at startup and a
//! live spreadsheet export that is refetched on demand.

use crate::config::{Config, SourceKind};
use crate::guest::GuestMatch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

mod manifest;
mod sheet;

pub use manifest::*;
pub use sheet::*;

/// Errors raised while reading guest data
#[derive(Debug, thiserror::Error)]
pub enum GuestSourceError {
    #[error("Failed to fetch guest sheet: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Guest sheet export returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("Malformed guest sheet: {0}")]
    Csv(#[from] csv::Error),
    #[error("Guest sheet is missing the '{0}' column")]
    MissingColumn(String),
    #[error("Invalid guest sheet URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Guest list is unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read manifest {path:?}: {source}")]
    ManifestIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),
}

#[async_trait]
pub trait GuestSource: Send + Sync {
    /// Look up a guest by an already-normalized email.
    ///
    /// `Ok(None)` means the email is not on the list; `Err` means the list
    /// itself could not be read.
    async fn lookup(&self, email: &str) -> Result<Option<GuestMatch>, GuestSourceError>;

    /// Reload guest data from its origin. Static sources do nothing.
    async fn refresh(&self) -> Result<(), GuestSourceError>;

    fn kind(&self) -> SourceKind;
}

/// Build the guest source selected by the configuration
pub fn create_source(config: &Config) -> Result<Arc<dyn GuestSource>> {
    match config.source.kind {
        SourceKind::Manifest => {
            let source = ManifestSource::load(&config.source.manifest_path)
                .context("Failed to load guest manifest")?;
            Ok(Arc::new(source))
        }
        SourceKind::Sheet => {
            let source =
                SheetSource::new(&config.sheet).context("Failed to set up guest sheet source")?;
            Ok(Arc::new(source))
        }
    }
}
