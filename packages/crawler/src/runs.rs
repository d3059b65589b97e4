//! Run reporting: one immutable `CrawlRun` document per pipeline invocation.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::storage::ListingRepository;
use crate::types::{CrawlRun, RunResults};

/// Persists run summaries and serves the admin history view.
pub struct RunReporter<R> {
    repo: Arc<R>,
}

impl<R: ListingRepository> RunReporter<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Close out an invocation: stamp timings, persist, return the document.
    pub async fn record(&self, started_at: DateTime<Utc>, results: RunResults) -> Result<CrawlRun> {
        let run = CrawlRun::new(started_at, Utc::now(), results);
        self.repo
            .insert_crawl_run(&run)
            .await
            .context("Failed to persist crawl run")?;
        tracing::info!(
            run_id = %run.id.0,
            run_type = run.results.kind(),
            duration_ms = run.duration_ms,
            "Recorded crawl run"
        );
        Ok(run)
    }

    /// Recent runs, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<CrawlRun>> {
        self.repo.list_recent_runs(limit).await
    }
}
