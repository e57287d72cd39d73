use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::env_manager::get_env_var;

pub const CONFIG_FILE_NAME: &str = "guestlist.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sheet: SheetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Refetch the guest sheet whenever the home page is viewed
    pub refresh_on_index: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            static_dir: PathBuf::from("static"),
            refresh_on_index: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Manifest,
    Sheet,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Manifest => f.write_str("manifest"),
            SourceKind::Sheet => f.write_str("sheet"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "manifest" => Ok(SourceKind::Manifest),
            "sheet" => Ok(SourceKind::Sheet),
            other => bail!("Unknown guest source '{}', expected 'manifest' or 'sheet'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub manifest_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Manifest,
            manifest_path: PathBuf::from("MANIFEST.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub sheet_id: Option<String>,
    /// Tab within the spreadsheet; the first tab when unset
    pub gid: Option<String>,
    pub export_base_url: String,
    pub timeout_secs: u64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            gid: None,
            export_base_url: "https://docs.google.com/spreadsheets/d".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match find_config_path() {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = toml::from_str(&content).context("Failed to parse config file")?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(kind) = env_override("GUESTLIST_SOURCE") {
            self.source.kind = kind.parse()?;
        }
        if let Some(path) = env_override("GUESTLIST_MANIFEST") {
            self.source.manifest_path = PathBuf::from(path);
        }
        if let Some(sheet_id) = env_override("GUEST_SHEET_ID") {
            self.sheet.sheet_id = Some(sheet_id);
        }
        if let Some(gid) = env_override("GUEST_SHEET_GID") {
            self.sheet.gid = Some(gid);
        }
        if let Some(host) = env_override("GUESTLIST_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_override("GUESTLIST_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid GUESTLIST_PORT '{}'", port))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.kind == SourceKind::Sheet
            && self.sheet.sheet_id.as_deref().map_or(true, |id| id.trim().is_empty())
        {
            bail!("The sheet guest source needs a spreadsheet id (set GUEST_SHEET_ID)");
        }
        if self.sheet.timeout_secs == 0 {
            bail!("sheet.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_override(name: &str) -> Option<String> {
    let value = get_env_var(name);
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `GUESTLIST_CONFIG`, then `./guestlist.toml`, then the platform config dir
fn find_config_path() -> Option<PathBuf> {
    if let Some(path) = env_override("GUESTLIST_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    ProjectDirs::from("com", "guestlist", "guestlist")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}
