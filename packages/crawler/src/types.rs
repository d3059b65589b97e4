use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::ContentHash;

/// Unique identifier for a job record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Poster identity used for records the crawler creates itself.
/// System-initiated writes use the all-zeros user id.
pub const SYSTEM_POSTER: Uuid = Uuid::nil();

/// Lifecycle status of a job listing.
///
/// Crawled jobs are created directly as `Live`; `Pending` and `Approved` are
/// only reached by manually posted jobs going through review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Approved,
    Live,
    CorrectionNeeded,
    TakenDown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Approved => "approved",
            JobStatus::Live => "live",
            JobStatus::CorrectionNeeded => "correction_needed",
            JobStatus::TakenDown => "taken_down",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "approved" => Ok(JobStatus::Approved),
            "live" => Ok(JobStatus::Live),
            "correction_needed" => Ok(JobStatus::CorrectionNeeded),
            "taken_down" => Ok(JobStatus::TakenDown),
            other => anyhow::bail!("unknown job status: {other}"),
        }
    }
}

/// A normalized candidate listing produced by a source adapter.
///
/// Adapters only normalize; they never write to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateListing {
    pub position: String,
    pub school_name: String,
    pub application_url: String,
    pub source_url: String,
    pub location: Option<String>,
    pub category: Option<String>,
    pub contract_type: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
}

/// A persisted job listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub position: String,
    pub school_name: String,
    pub application_url: String,
    pub location: Option<String>,
    pub category: Option<String>,
    pub contract_type: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    /// Derived identity hash. None for manually posted jobs; globally unique
    /// when present (partial unique index).
    pub content_hash: Option<ContentHash>,
    pub is_auto_crawled: bool,
    pub source_key: Option<String>,
    pub source_url: Option<String>,
    pub posted_by: Uuid,
    pub crawled_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub stale_check_fail_count: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a crawled listing.
#[derive(Debug, Clone)]
pub struct NewJobRecord {
    pub candidate: CandidateListing,
    pub content_hash: ContentHash,
    pub source_key: String,
    pub crawled_at: DateTime<Utc>,
}

impl NewJobRecord {
    /// Build the insert payload for an auto-crawled listing. The crawler acts
    /// as its own approver: records go straight to `Live` under the system
    /// poster identity.
    pub fn auto_crawled(
        candidate: CandidateListing,
        content_hash: ContentHash,
        source_key: &str,
    ) -> Self {
        Self {
            candidate,
            content_hash,
            source_key: source_key.to_string(),
            crawled_at: Utc::now(),
        }
    }

    /// Materialize the full record this payload describes, under a given id.
    pub fn into_record(self, id: JobId) -> JobRecord {
        JobRecord {
            id,
            status: JobStatus::Live,
            position: self.candidate.position,
            school_name: self.candidate.school_name,
            application_url: self.candidate.application_url,
            location: self.candidate.location,
            category: self.candidate.category,
            contract_type: self.candidate.contract_type,
            salary: self.candidate.salary,
            description: self.candidate.description,
            content_hash: Some(self.content_hash),
            is_auto_crawled: true,
            source_key: Some(self.source_key),
            source_url: Some(self.candidate.source_url),
            posted_by: SYSTEM_POSTER,
            crawled_at: Some(self.crawled_at),
            last_checked_at: None,
            stale_check_fail_count: 0,
            published_at: Some(self.crawled_at),
            created_at: self.crawled_at,
        }
    }
}

/// Outcome of a fingerprint-guarded insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(JobId),
    /// A record with the same fingerprint already exists (including the case
    /// where a concurrent insert won the race). Not an error.
    Duplicate(JobId),
}

/// Outcome of recording a failed stale check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleOutcome {
    StillLive { fail_count: i32 },
    TakenDown,
}

/// Per-source breakdown of one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResult {
    pub source: String,
    pub jobs_found: u64,
    pub jobs_new: u64,
    pub jobs_skipped: u64,
}

impl SourceResult {
    pub fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            jobs_found: 0,
            jobs_new: 0,
            jobs_skipped: 0,
        }
    }
}

/// Aggregate counts of one stale-check run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleCheckResults {
    pub total_checked: u64,
    pub still_live: u64,
    pub marked_taken_down: u64,
    pub failed_checks: u64,
}

/// Type-specific payload of a crawl run. Closed set: one variant per run
/// type, serialized with a `type` tag for the admin history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunResults {
    #[serde(rename = "crawl")]
    #[serde(rename_all = "camelCase")]
    Crawl {
        jobs_found: u64,
        jobs_new: u64,
        jobs_skipped: u64,
        crawl_errors: Vec<String>,
        source_results: Vec<SourceResult>,
    },
    #[serde(rename = "stale-check")]
    #[serde(rename_all = "camelCase")]
    StaleCheck {
        total_checked: u64,
        still_live: u64,
        marked_taken_down: u64,
        failed_checks: u64,
    },
}

impl RunResults {
    /// Discriminator persisted alongside the payload.
    pub fn kind(&self) -> &'static str {
        match self {
            RunResults::Crawl { .. } => "crawl",
            RunResults::StaleCheck { .. } => "stale-check",
        }
    }

    pub fn from_source_results(results: &[SourceResult], errors: Vec<String>) -> Self {
        RunResults::Crawl {
            jobs_found: results.iter().map(|r| r.jobs_found).sum(),
            jobs_new: results.iter().map(|r| r.jobs_new).sum(),
            jobs_skipped: results.iter().map(|r| r.jobs_skipped).sum(),
            crawl_errors: errors,
            source_results: results.to_vec(),
        }
    }
}

impl From<StaleCheckResults> for RunResults {
    fn from(r: StaleCheckResults) -> Self {
        RunResults::StaleCheck {
            total_checked: r.total_checked,
            still_live: r.still_live,
            marked_taken_down: r.marked_taken_down,
            failed_checks: r.failed_checks,
        }
    }
}

/// An immutable audit record of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRun {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub results: RunResults,
}

impl CrawlRun {
    pub fn new(started_at: DateTime<Utc>, completed_at: DateTime<Utc>, results: RunResults) -> Self {
        Self {
            id: RunId::new(),
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds(),
            results,
        }
    }
}
