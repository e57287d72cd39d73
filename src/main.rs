use anyhow::Result;
use env_logger::Env;
use log::{error, info};

use guestlist::config::Config;
use guestlist::env_manager;

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before the logger reads RUST_LOG
    let env_file = env_manager::load_env_file();

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    if let Some(path) = env_file {
        info!("Loaded environment from {:?}", path);
    }
    let overrides = env_manager::active_overrides();
    if !overrides.is_empty() {
        info!("Environment overrides: {}", overrides.join(", "));
    }

    let config = Config::load().map_err(|e| {
        error!("Invalid configuration: {:#}", e);
        e
    })?;

    guestlist::run(config).await
}
