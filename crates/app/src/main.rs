//! CivicDesk - console chat desk
//!
//! Drives the citizen/admin chat flow and its scripted bot from stdin.
//! Pass a config file path as the first argument to override the
//! platform default.

use std::path::PathBuf;
use std::sync::Arc;

use civicdesk_core::{Config, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod desk;
mod state;
mod sweeper;

use desk::{Command, Desk};

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(&PathBuf::from(path)),
        None => Config::load_default(),
    }
}

fn main() {
    let config = load_config();

    // Initialize logging; RUST_LOG wins over the configured filter
    let fallback = config
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting CivicDesk");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        tracing::error!("CivicDesk stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let app_state = Arc::new(state::AppState::new(&config)?);
    let sweeper = sweeper::spawn_cache_sweeper(
        Arc::clone(&app_state.rule_cache),
        config.bot.cache_sweep_interval(),
    );

    let mut desk = Desk::new(app_state);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", serde_json::json!({ "ok": true, "usage": desk::USAGE }));

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{}", serde_json::json!({ "ok": false, "error": usage }));
                continue;
            }
        };

        let quit = command == Command::Quit;
        println!("{}", desk.execute(command));
        if quit {
            break;
        }
    }

    sweeper.abort();
    tracing::info!("CivicDesk shut down");
    Ok(())
}
