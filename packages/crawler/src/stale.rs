//! Stale checker: re-verify auto-crawled live listings at their source and
//! retire the ones that keep failing.
//!
//! Per record this is a two-state machine embedded in the status enum:
//! `live --(threshold consecutive failures)--> taken_down`, irreversible
//! here. Any successful check resets the counter, so transient source
//! outages never retire a listing that later recovers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::Instant;

use crate::config::Config;
use crate::runs::RunReporter;
use crate::sources::SourceRegistry;
use crate::storage::ListingRepository;
use crate::types::{JobRecord, StaleCheckResults, StaleOutcome};

/// Smallest budget worth starting another probe with. Once the remaining
/// run deadline drops below this, the remaining candidates are left for the
/// next invocation and the partial counts are persisted.
const MIN_PROBE_BUDGET: Duration = Duration::from_secs(2);

pub struct StaleChecker<R> {
    repo: Arc<R>,
    registry: Arc<SourceRegistry>,
    reporter: RunReporter<R>,
    threshold: i32,
    probe_timeout: Duration,
    run_deadline: Duration,
}

impl<R: ListingRepository + 'static> StaleChecker<R> {
    pub fn new(repo: Arc<R>, registry: Arc<SourceRegistry>, config: &Config) -> Self {
        Self {
            reporter: RunReporter::new(Arc::clone(&repo)),
            repo,
            registry,
            threshold: config.stale_check_threshold,
            probe_timeout: config.source_timeout,
            run_deadline: config.run_deadline,
        }
    }

    /// Run one stale check over every auto-crawled, still-live record.
    ///
    /// Stops probing once the run deadline is nearly exhausted; the partial
    /// counts are still persisted as a truthful summary.
    pub async fn run(&self) -> Result<StaleCheckResults> {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.run_deadline;
        let candidates = self.repo.list_stale_candidates().await?;
        tracing::info!(candidates = candidates.len(), "Starting stale check");

        let mut results = StaleCheckResults::default();
        for (idx, record) in candidates.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < MIN_PROBE_BUDGET {
                tracing::warn!(
                    checked = idx,
                    unchecked = candidates.len() - idx,
                    "Stopping stale check, run deadline nearly exhausted"
                );
                break;
            }

            results.total_checked += 1;

            if self.probe_record(record).await {
                self.repo.record_check_success(record.id, Utc::now()).await?;
                results.still_live += 1;
                continue;
            }

            results.failed_checks += 1;
            match self.repo.record_check_failure(record.id, self.threshold).await? {
                StaleOutcome::TakenDown => {
                    results.marked_taken_down += 1;
                    tracing::info!(
                        job_id = %record.id.0,
                        source = ?record.source_key,
                        "Listing retired after repeated failed checks"
                    );
                }
                StaleOutcome::StillLive { fail_count } => {
                    tracing::debug!(
                        job_id = %record.id.0,
                        fail_count,
                        threshold = self.threshold,
                        "Stale check failed, below threshold"
                    );
                }
            }
        }

        self.reporter.record(started_at, results.into()).await?;
        Ok(results)
    }

    /// Lightweight existence probe via the record's adapter. Any way of not
    /// confirming the listing counts as a failed check.
    async fn probe_record(&self, record: &JobRecord) -> bool {
        let Some(source_key) = record.source_key.as_deref() else {
            tracing::warn!(job_id = %record.id.0, "Auto-crawled record without source key");
            return false;
        };
        let Some(source_url) = record.source_url.as_deref() else {
            tracing::warn!(job_id = %record.id.0, "Auto-crawled record without source URL");
            return false;
        };
        let Some(adapter) = self.registry.get(source_key) else {
            tracing::warn!(job_id = %record.id.0, source = %source_key, "No adapter registered for source");
            return false;
        };

        match tokio::time::timeout(self.probe_timeout, adapter.probe(source_url)).await {
            Ok(Ok(live)) => live,
            Ok(Err(err)) => {
                tracing::debug!(job_id = %record.id.0, error = %err, "Stale probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(job_id = %record.id.0, "Stale probe timed out");
                false
            }
        }
    }
}
