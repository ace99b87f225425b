//! Entry point for the enrichment indexer.

use dotenv::dotenv;
use tracing::{error, info};

use enrich_indexer::{Dependencies, IndexingError};

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Enrichment indexer failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), IndexingError> {
    info!("Starting enrichment indexer");

    let mut deps = Dependencies::new().await?;
    deps.orchestrator.run().await?;

    info!("Enrichment indexer stopped");
    Ok(())
}
