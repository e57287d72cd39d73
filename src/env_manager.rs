use std::env;
use std::path::PathBuf;

// Environment variables that override config file values
pub const OVERRIDE_ENV_VARS: &[&str] = &[
    "GUESTLIST_CONFIG",
    "GUESTLIST_SOURCE",
    "GUESTLIST_MANIFEST",
    "GUEST_SHEET_ID",
    "GUEST_SHEET_GID",
    "GUESTLIST_HOST",
    "GUESTLIST_PORT",
];

/// Load variables from a `.env` file in the working directory or a parent.
/// Variables already set in the process environment win.
pub fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Value of an environment variable, or an empty string when unset
pub fn get_env_var(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

/// Names of the override variables that are currently set. Values are not
/// returned since the sheet id is effectively a read credential.
pub fn active_overrides() -> Vec<&'static str> {
    OVERRIDE_ENV_VARS
        .iter()
        .copied()
        .filter(|var| !get_env_var(var).trim().is_empty())
        .collect()
}
