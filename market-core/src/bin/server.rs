//! Market store server binary

use market_core::{CatalogStore, Config, LedgerStore, Storage, TransactionLog};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting NEXUS market server");

    // Load configuration
    let config = Config::from_env()?;

    // Open stores over shared storage
    let storage = Arc::new(Storage::open(&config)?);
    let _ledger = LedgerStore::new(storage.clone());
    let _catalog = CatalogStore::new(storage.clone());
    let _log = TransactionLog::new(storage.clone());

    let stats = storage.get_stats()?;
    tracing::info!(
        accounts = stats.total_accounts,
        items = stats.total_items,
        records = stats.total_records,
        "Stores opened"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down market server");
    Ok(())
}
