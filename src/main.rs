use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use view_history::{
    config::{Config, LogFormat},
    history::Capacity,
    server::{AppState, HistoryServer},
    storage::SqliteSnapshotStore,
};

/// Back-navigation history server for nested application flows.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Event name that triggers back navigation
    #[arg(long)]
    back_event: Option<String>,

    /// Maximum history entries (non-numeric or <= 0 disables history)
    #[arg(long)]
    max_size: Option<String>,

    /// Snapshot database path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Do not start capturing until `history/start` is received
    #[arg(long)]
    no_autostart: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration, then apply command line overrides
    let mut config = Config::from_env();
    if let Some(back_event) = cli.back_event {
        config.history.back_event = back_event;
    }
    if let Some(max_size) = cli.max_size.as_deref() {
        config.history.max_size = Capacity::from_setting(Some(max_size));
    }
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    if cli.no_autostart {
        config.autostart = false;
    }

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "View history server starting..."
    );

    // Initialize snapshot storage
    let store = match SqliteSnapshotStore::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Snapshot database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize snapshot database");
            return Err(e.into());
        }
    };

    // Create application state
    let (state, navigations) = AppState::new(config, Arc::new(store));

    // Start server
    let mut server = HistoryServer::new(Arc::new(state), navigations);

    info!("Server ready, waiting for events on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
