//! Crawl orchestrator: fetch every registered source, fingerprint and upsert
//! candidates, isolate per-source failures, persist one run summary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::Config;
use crate::fingerprint::ContentHash;
use crate::runs::RunReporter;
use crate::sources::{SourceAdapter, SourceRegistry};
use crate::storage::ListingRepository;
use crate::types::{InsertOutcome, NewJobRecord, RunResults, SourceResult};

/// Smallest budget worth starting a fetch+parse cycle with. Once the
/// remaining run deadline drops below this, pending sources are skipped and
/// the run closes with a truthful partial summary.
const MIN_SOURCE_BUDGET: Duration = Duration::from_secs(5);

/// Per-source outcome: the counters plus an optional recovered error string.
type SourceOutcome = (SourceResult, Option<String>);

pub struct Crawler<R> {
    repo: Arc<R>,
    registry: Arc<SourceRegistry>,
    reporter: RunReporter<R>,
    source_timeout: Duration,
    run_deadline: Duration,
    concurrency: usize,
}

impl<R: ListingRepository + 'static> Crawler<R> {
    pub fn new(repo: Arc<R>, registry: Arc<SourceRegistry>, config: &Config) -> Self {
        Self {
            reporter: RunReporter::new(Arc::clone(&repo)),
            repo,
            registry,
            source_timeout: config.source_timeout,
            run_deadline: config.run_deadline,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Run one crawl over all registered sources.
    ///
    /// Per-source fetch/parse failures are recovered and reported inside the
    /// summary; only repository failures abort the invocation.
    pub async fn run(&self, max_pages: Option<usize>) -> Result<Vec<SourceResult>> {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.run_deadline;
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        tracing::info!(
            sources = self.registry.len(),
            concurrency = self.concurrency,
            max_pages = ?max_pages,
            "Starting crawl"
        );

        let mut tasks: JoinSet<(usize, Result<SourceOutcome>)> = JoinSet::new();
        for (idx, adapter) in self.registry.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let repo = Arc::clone(&self.repo);
            let semaphore = Arc::clone(&semaphore);
            let source_timeout = self.source_timeout;

            tasks.spawn(async move {
                let outcome = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .context("crawl worker pool closed")?;

                    // A slot may open up only after slow sources ate the
                    // budget; better to skip than to start a doomed fetch.
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining < MIN_SOURCE_BUDGET {
                        let key = adapter.key();
                        tracing::warn!(source = %key, "Skipping source, run deadline nearly exhausted");
                        return Ok((
                            SourceResult::empty(key),
                            Some(format!("{key}: skipped, run deadline exhausted")),
                        ));
                    }

                    crawl_source(adapter, repo, source_timeout, max_pages).await
                }
                .await;
                (idx, outcome)
            });
        }

        let mut indexed: Vec<Option<SourceOutcome>> = vec![None; self.registry.len()];
        let mut fatal: Option<anyhow::Error> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(outcome))) => indexed[idx] = Some(outcome),
                Ok((_, Err(e))) => fatal = Some(e),
                Err(join_err) => fatal = Some(anyhow::Error::new(join_err)),
            }
        }

        let mut results = Vec::with_capacity(self.registry.len());
        let mut errors = Vec::new();
        for (idx, adapter) in self.registry.iter().enumerate() {
            match indexed[idx].take() {
                Some((result, error)) => {
                    results.push(result);
                    errors.extend(error);
                }
                // Task aborted by a fatal error before producing a result.
                None => results.push(SourceResult::empty(adapter.key())),
            }
        }

        let summary = RunResults::from_source_results(&results, errors);
        match fatal {
            None => {
                self.reporter.record(started_at, summary).await?;
                Ok(results)
            }
            Some(e) => {
                // Best-effort partial audit record; the invocation still
                // reports failure to the caller.
                if let Err(persist_err) = self.reporter.record(started_at, summary).await {
                    tracing::warn!(error = %persist_err, "Could not persist partial crawl run");
                }
                Err(e.context("Crawl aborted by repository failure"))
            }
        }
    }
}

/// Crawl one source: fetch, fingerprint, upsert. Fetch and parse errors are
/// recovered here and returned as the error string for the run summary;
/// repository errors propagate and are fatal.
async fn crawl_source<R: ListingRepository>(
    adapter: Arc<dyn SourceAdapter>,
    repo: Arc<R>,
    timeout: Duration,
    max_pages: Option<usize>,
) -> Result<SourceOutcome> {
    let key = adapter.key().to_string();
    let mut result = SourceResult::empty(&key);

    let candidates = match tokio::time::timeout(timeout, adapter.fetch_listings(max_pages)).await {
        Ok(Ok(candidates)) => candidates,
        Ok(Err(err)) => {
            tracing::warn!(source = %key, error = %err, "Source failed, continuing with remaining sources");
            return Ok((result, Some(format!("{key}: {err}"))));
        }
        Err(_) => {
            tracing::warn!(source = %key, timeout_secs = timeout.as_secs(), "Source fetch timed out");
            return Ok((
                result,
                Some(format!("{key}: fetch timed out after {}s", timeout.as_secs())),
            ));
        }
    };

    result.jobs_found = candidates.len() as u64;

    for candidate in candidates {
        let hash = ContentHash::of_listing(
            &candidate.position,
            &candidate.school_name,
            &candidate.application_url,
        );

        match repo.find_by_fingerprint(&hash).await? {
            Some(existing) => {
                // Same listing re-crawled; refresh volatile fields only.
                repo.refresh_listing(existing.id, &candidate).await?;
                result.jobs_skipped += 1;
                tracing::debug!(
                    source = %key,
                    job_id = %existing.id.0,
                    content_hash = %hash,
                    "Listing unchanged since last crawl"
                );
            }
            None => {
                let record = NewJobRecord::auto_crawled(candidate, hash.clone(), &key);
                match repo.insert_if_absent(record).await? {
                    InsertOutcome::Inserted(id) => {
                        result.jobs_new += 1;
                        tracing::info!(
                            source = %key,
                            job_id = %id.0,
                            content_hash = %hash,
                            "Ingested new listing"
                        );
                    }
                    // A concurrent run inserted the same listing first.
                    InsertOutcome::Duplicate(_) => result.jobs_skipped += 1,
                }
            }
        }
    }

    tracing::info!(
        source = %key,
        jobs_found = result.jobs_found,
        jobs_new = result.jobs_new,
        jobs_skipped = result.jobs_skipped,
        "Source crawl completed"
    );
    Ok((result, None))
}
