//! Persistence boundary for job records and crawl-run audit documents.

pub mod postgres;

pub use postgres::PostgresRepository;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::fingerprint::ContentHash;
use crate::types::{
    CandidateListing, CrawlRun, InsertOutcome, JobId, JobRecord, NewJobRecord, StaleOutcome,
};

/// Typed persistence operations for the pipeline.
///
/// The orchestrator and stale checker are the only writers of the staleness
/// columns (`stale_check_fail_count`, `last_checked_at`, `crawled_at`) and of
/// auto-crawled status transitions; every update here is narrow enough that
/// admin edits to business fields are never clobbered.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Look up a record by its content fingerprint.
    async fn find_by_fingerprint(&self, hash: &ContentHash) -> Result<Option<JobRecord>>;

    /// Insert a crawled record unless one with the same fingerprint exists.
    ///
    /// Must be atomic under concurrent identical inserts: exactly one caller
    /// observes `Inserted`, the rest observe `Duplicate`.
    async fn insert_if_absent(&self, record: NewJobRecord) -> Result<InsertOutcome>;

    /// Refresh volatile non-identity fields of an existing record from a
    /// fresh crawl of the same listing. Never touches status, provenance, or
    /// staleness columns.
    async fn refresh_listing(&self, id: JobId, candidate: &CandidateListing) -> Result<()>;

    /// All auto-crawled records still live: the stale checker's candidate
    /// set. Records already taken down never reappear here.
    async fn list_stale_candidates(&self) -> Result<Vec<JobRecord>>;

    /// Record a successful stale check: touch `last_checked_at`, reset the
    /// failure counter.
    async fn record_check_success(&self, id: JobId, checked_at: DateTime<Utc>) -> Result<()>;

    /// Record a failed stale check: increment the failure counter and, when
    /// the incremented count reaches `threshold`, retire the record. Only
    /// applies while the record is still live — a status set externally in
    /// the meantime is kept untouched — and `TakenDown` is reported only by
    /// the write that performed the transition, so overlapping runs cannot
    /// double-apply or double-count.
    async fn record_check_failure(&self, id: JobId, threshold: i32) -> Result<StaleOutcome>;

    /// Persist one immutable crawl-run audit document.
    async fn insert_crawl_run(&self, run: &CrawlRun) -> Result<()>;

    /// Recent runs, newest first, for the admin history view.
    async fn list_recent_runs(&self, limit: i64) -> Result<Vec<CrawlRun>>;
}
