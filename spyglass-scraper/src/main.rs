use spyglass_db::Database;
use spyglass_scraper::config::Config;
use spyglass_scraper::source::{MINECRAFT_SERVERS_ORG, scrape_source};

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
    tracing::info!("Starting Spyglass scraper...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: db_path={}, verbose={}",
        config.database_path,
        config.verbose
    );

    let db = Database::open(&config.database_path).await?;

    // Committed pages survive an interrupt; the page in flight does not
    tokio::select! {
        result = scrape_source(&db, &MINECRAFT_SERVERS_ORG, config.verbose) => {
            let total = result?;
            tracing::info!("Ok! {total} servers upserted");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted; completed pages are already committed");
        }
    }

    Ok(())
}
