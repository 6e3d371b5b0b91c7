//! Yield Engine - lending yield aggregation and rebalance recommendations

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use yield_engine::adapters::cli;
use yield_engine::config::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (YIELD_SNAPSHOT_PATH and RUST_LOG live here)
    dotenvy::dotenv().ok();

    let app = cli::init();
    let config = load_config(&app.config)
        .with_context(|| format!("Failed to load configuration from {}", app.config.display()))?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    cli::execute(app, config).await
}

/// Flags win over RUST_LOG, RUST_LOG wins over the config file
fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
