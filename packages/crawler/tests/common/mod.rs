//! Shared test fixtures: an in-memory repository and scripted source
//! adapters.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crawler_core::{
    CandidateListing, Config, ContentHash, CrawlRun, InsertOutcome, JobId, JobRecord, JobStatus,
    ListingRepository, NewJobRecord, SourceAdapter, SourceError, StaleOutcome,
};

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        sources: vec![],
        source_timeout: Duration::from_secs(5),
        run_deadline: Duration::from_secs(60),
        concurrency: 2,
        stale_check_threshold: 3,
        max_pages: None,
    }
}

pub fn candidate(position: &str, school: &str, url: &str) -> CandidateListing {
    CandidateListing {
        position: position.to_string(),
        school_name: school.to_string(),
        application_url: url.to_string(),
        source_url: url.to_string(),
        location: None,
        category: None,
        contract_type: None,
        salary: None,
        description: None,
    }
}

/// Seed a live auto-crawled record the way the orchestrator would create it.
pub fn crawled_record(position: &str, school: &str, url: &str, source_key: &str) -> JobRecord {
    let hash = ContentHash::of_listing(position, school, url);
    NewJobRecord::auto_crawled(candidate(position, school, url), hash, source_key)
        .into_record(JobId::new())
}

#[derive(Default)]
pub struct MemoryRepository {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    runs: Mutex<Vec<CrawlRun>>,
    /// When set, job-record writes fail as if the database were down.
    /// Crawl-run writes stay up so best-effort partial reporting is visible.
    pub fail_job_writes: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: JobRecord) -> JobId {
        let id = record.id;
        self.jobs.lock().unwrap().insert(id, record);
        id
    }

    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn runs(&self) -> Vec<CrawlRun> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingRepository for MemoryRepository {
    async fn find_by_fingerprint(&self, hash: &ContentHash) -> Result<Option<JobRecord>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .find(|r| r.content_hash.as_ref() == Some(hash))
            .cloned())
    }

    async fn insert_if_absent(&self, record: NewJobRecord) -> Result<InsertOutcome> {
        if self.fail_job_writes.load(Ordering::SeqCst) {
            anyhow::bail!("repository unavailable");
        }
        // One lock held for lookup and insert: atomic like the partial
        // unique index.
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(existing) = jobs
            .values()
            .find(|r| r.content_hash.as_ref() == Some(&record.content_hash))
        {
            return Ok(InsertOutcome::Duplicate(existing.id));
        }
        let id = JobId::new();
        jobs.insert(id, record.into_record(id));
        Ok(InsertOutcome::Inserted(id))
    }

    async fn refresh_listing(&self, id: JobId, candidate: &CandidateListing) -> Result<()> {
        if let Some(record) = self.jobs.lock().unwrap().get_mut(&id) {
            record.location = candidate.location.clone();
            record.category = candidate.category.clone();
            record.contract_type = candidate.contract_type.clone();
            record.salary = candidate.salary.clone();
            record.description = candidate.description.clone();
        }
        Ok(())
    }

    async fn list_stale_candidates(&self) -> Result<Vec<JobRecord>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_auto_crawled && r.status == JobStatus::Live)
            .cloned()
            .collect())
    }

    async fn record_check_success(&self, id: JobId, checked_at: DateTime<Utc>) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no such record"))?;
        record.last_checked_at = Some(checked_at);
        record.stale_check_fail_count = 0;
        Ok(())
    }

    async fn record_check_failure(&self, id: JobId, threshold: i32) -> Result<StaleOutcome> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no such record"))?;
        // Mirrors the Postgres statement: the write only applies to records
        // still live.
        if record.status != JobStatus::Live {
            return Ok(StaleOutcome::StillLive {
                fail_count: record.stale_check_fail_count,
            });
        }
        record.stale_check_fail_count += 1;
        if record.stale_check_fail_count >= threshold {
            record.status = JobStatus::TakenDown;
            return Ok(StaleOutcome::TakenDown);
        }
        Ok(StaleOutcome::StillLive {
            fail_count: record.stale_check_fail_count,
        })
    }

    async fn insert_crawl_run(&self, run: &CrawlRun) -> Result<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn list_recent_runs(&self, limit: i64) -> Result<Vec<CrawlRun>> {
        let mut runs = self.runs.lock().unwrap().clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit as usize);
        Ok(runs)
    }
}

/// Adapter returning a fixed set of listings. Probes succeed for any URL
/// that still appears among the listings.
pub struct StaticSource {
    key: String,
    listings: Vec<CandidateListing>,
}

impl StaticSource {
    pub fn new(key: &str, listings: Vec<CandidateListing>) -> Self {
        Self {
            key: key.to_string(),
            listings,
        }
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch_listings(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateListing>, SourceError> {
        let mut listings = self.listings.clone();
        if let Some(limit) = limit {
            listings.truncate(limit);
        }
        Ok(listings)
    }

    async fn probe(&self, source_url: &str) -> Result<bool, SourceError> {
        Ok(self.listings.iter().any(|l| l.source_url == source_url))
    }
}

/// Adapter whose source is unreachable.
pub struct FailingSource {
    key: String,
}

impl FailingSource {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for FailingSource {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch_listings(
        &self,
        _limit: Option<usize>,
    ) -> Result<Vec<CandidateListing>, SourceError> {
        Err(SourceError::fetch("https://down.example.org", "connection refused"))
    }

    async fn probe(&self, source_url: &str) -> Result<bool, SourceError> {
        Err(SourceError::fetch(source_url, "connection refused"))
    }
}
