pub mod api_server;
pub mod config;
pub mod env_manager;
pub mod events;
pub mod guest;
pub mod source;

use anyhow::Result;
use log::*;

/// Build the configured guest source and serve HTTP until shutdown
pub async fn run(config: Config) -> Result<()> {
    info!("Starting guest list server with the {} source", config.source.kind);
    let source = source::create_source(&config)?;
    api_server::start_api_server(config, source).await
}

// Re-export commonly used types
pub use config::{Config, SourceKind};
pub use events::{parse_events, EventTag};
pub use guest::GuestMatch;
pub use source::{GuestSource, GuestSourceError, ManifestSource, SheetSource};
