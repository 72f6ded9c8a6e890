//! txn-query: transaction lookups over MySQL or MongoDB
//!
//! This is the main entry point for the application.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use txn_query::{
    backends::BackendLoader,
    config::{self, Settings, CONFIG_ENV},
    web::{create_router, AppState},
};

/// Command line options
#[derive(Debug, Parser)]
#[command(name = "txn-query", version, about = "Transaction query service over MySQL or MongoDB")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings come first so `debug` can pick the log level
    let source = config::locate(cli.config.as_deref());
    let settings = config::load(source.as_deref())?;
    init_logging(&settings);

    info!("Starting txn-query v{}", txn_query::VERSION);
    match &source {
        Some(path) => info!("Loaded settings from: {}", path.display()),
        None => info!("No settings file found, using defaults"),
    }

    // Reject a bad backend type before anything listens
    let kind = match settings.validate() {
        Ok(kind) => kind,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    info!("Configured backend: {} ({})", kind, kind.engine());

    if cli.check {
        info!("Configuration OK");
        return Ok(());
    }

    // Build the one backend used for the whole process
    let backend = BackendLoader::load(&settings).await?;

    // Create application state
    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);
    let state = AppState::new(settings, backend);
    info!("Application state initialized");

    // Create router
    let app = create_router(state);

    info!("Starting server on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// RUST_LOG wins; otherwise `debug` in settings selects the level
fn init_logging(settings: &Settings) {
    let default_level = if settings.general.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
