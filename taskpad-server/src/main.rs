//! `Taskpad` API server — in-memory remote task collection.
//!
//! Serves the create/update/delete dialect the `Taskpad` client speaks,
//! for development and integration testing.
//!
//! ```bash
//! # Run on default address 0.0.0.0:9400
//! cargo run --bin taskpad-server
//!
//! # Run on custom address
//! cargo run --bin taskpad-server -- --bind 127.0.0.1:8080
//!
//! # Or via environment variable
//! TASKPAD_SERVER_ADDR=127.0.0.1:8080 cargo run --bin taskpad-server
//! ```

use std::sync::Arc;

use clap::Parser;

use taskpad_server::api;
use taskpad_server::config::{ServerCliArgs, ServerConfig};
use taskpad_server::store::TaskTable;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskpad api server");

    let state = Arc::new(TaskTable::new());
    match api::start_server(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "task api server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "task api server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start task api server");
            std::process::exit(1);
        }
    }
}
