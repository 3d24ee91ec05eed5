use std::sync::Arc;

use spyglass_db::Database;
use spyglass_pinger::client::PingClient;
use spyglass_pinger::config::Config;
use spyglass_pinger::sweep::{SweepOptions, run_sweep};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting Spyglass sweep...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: db_path={}, batch_size={}, ping_timeout={}s, verbose={}",
        config.database_path,
        config.batch_size,
        config.ping_timeout.as_secs(),
        config.verbose
    );

    let db = Database::open(&config.database_path).await?;
    let client = Arc::new(PingClient::new(config.ping_timeout));
    let options = SweepOptions {
        batch_size: config.batch_size,
        verbose: config.verbose,
    };

    // Batches already committed stay committed on interrupt; only the
    // in-flight batch is lost.
    tokio::select! {
        result = run_sweep(&db, client, &options) => {
            let summary = result?;
            tracing::info!(
                "Ok! {} records across {} batches",
                summary.records(),
                summary.batches.len()
            );
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted; completed batches are already committed");
        }
    }

    Ok(())
}
