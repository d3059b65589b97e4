use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::sources::SourceSpec;

/// Pipeline configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Registered listing sources, as JSON in `CRAWL_SOURCES`.
    pub sources: Vec<SourceSpec>,
    /// Latency bound for a single source fetch. Kept well under the run
    /// deadline so one slow source cannot consume the whole budget.
    pub source_timeout: Duration,
    /// Wall-clock budget for a whole invocation; the external trigger
    /// environment enforces a harder cap above this.
    pub run_deadline: Duration,
    /// Size of the source fetch worker pool.
    pub concurrency: usize,
    /// Consecutive failed stale checks before a record is retired.
    pub stale_check_threshold: i32,
    /// Optional per-source cap on fetched listings.
    pub max_pages: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let sources_json = env::var("CRAWL_SOURCES").unwrap_or_else(|_| "[]".to_string());
        let sources: Vec<SourceSpec> =
            serde_json::from_str(&sources_json).context("CRAWL_SOURCES must be a JSON array")?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            sources,
            source_timeout: Duration::from_secs(
                parse_var("CRAWL_SOURCE_TIMEOUT_SECS", 30)?,
            ),
            run_deadline: Duration::from_secs(parse_var("CRAWL_RUN_DEADLINE_SECS", 240)?),
            concurrency: parse_var("CRAWL_CONCURRENCY", 4)?,
            stale_check_threshold: parse_var("STALE_CHECK_THRESHOLD", 3)?,
            max_pages: match env::var("CRAWL_MAX_PAGES") {
                Ok(v) => Some(v.parse().context("CRAWL_MAX_PAGES must be a number")?),
                Err(_) => None,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}
