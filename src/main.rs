// src/main.rs

//! Process entry point: loads configuration, installs logging, and runs
//! the core's background services to completion or cancellation.

use anyhow::Result;
use std::env;
use syftbox_core::config::Config;
use syftbox_core::server;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("syftbox-core version {VERSION}");
        return Ok(());
    }

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("config.toml");

    let config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e}");
            std::process::exit(1);
        }
    };

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();

    if let Err(e) = server::run(config).await {
        error!("syftbox-core runtime error: {}", e);
        return Err(e);
    }

    Ok(())
}
