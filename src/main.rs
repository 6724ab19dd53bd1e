use anyhow::Result;
use clap::Parser;
use restic_exporter::{
    collector::Collector, config::Settings, restic::ResticClient, server::start_server,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Restic Exporter - Prometheus metrics exporter for restic repositories
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration; missing repository or password aborts here
    let settings = Settings::load(args.config.as_deref())?;

    // Initialize logging
    init_logging(&settings.exporter.log_level)?;

    info!("Starting Restic Exporter");
    info!("Repository: {}", settings.restic.repository);
    info!("Listen address: {}", settings.exporter.listen_address);
    info!(
        "Refresh interval: {}s",
        settings.exporter.refresh_interval_seconds
    );

    // Create restic client and collector
    let client = ResticClient::new(settings.restic.clone());
    let collector = Arc::new(Collector::new(client)?);

    // Background refresh task; the first cycle runs immediately, so the
    // endpoint serves the empty initial state only until it completes
    let interval = Duration::from_secs(settings.exporter.refresh_interval_seconds);
    tokio::spawn(Arc::clone(&collector).run(interval));

    // Start HTTP server
    info!("Starting HTTP server...");
    if let Err(e) = start_server(&settings.exporter.listen_address, collector).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Initialize structured logging with tracing.
fn init_logging(log_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
