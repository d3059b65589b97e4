// Trigger entry point: invoked on a schedule or manually with a run-type
// discriminator ("crawl" or "stale-check"). Prints the run summary as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use crawler_core::{
    Config, Crawler, PostgresRepository, RunResults, SourceRegistry, StaleChecker,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crawler_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mode = std::env::args()
        .nth(1)
        .context("Usage: crawler <crawl|stale-check>")?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(sources = config.sources.len(), "Configuration loaded");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let client = crawler_core::sources::http_client(config.source_timeout)?;
    let registry = Arc::new(SourceRegistry::from_specs(&config.sources, client));
    let repo = Arc::new(PostgresRepository::new(pool));

    let summary = match mode.as_str() {
        "crawl" => {
            let crawler = Crawler::new(Arc::clone(&repo), Arc::clone(&registry), &config);
            let results = crawler.run(config.max_pages).await?;
            serde_json::to_value(&results)?
        }
        "stale-check" => {
            let checker = StaleChecker::new(Arc::clone(&repo), Arc::clone(&registry), &config);
            let results = checker.run().await?;
            serde_json::to_value(RunResults::from(results))?
        }
        other => anyhow::bail!("Unknown run type: {other} (expected crawl or stale-check)"),
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
