use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::ListingRepository;
use crate::fingerprint::ContentHash;
use crate::types::{
    CandidateListing, CrawlRun, InsertOutcome, JobId, JobRecord, JobStatus, NewJobRecord, RunId,
    StaleOutcome,
};

pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_job_record(row: &PgRow) -> Result<JobRecord> {
    Ok(JobRecord {
        id: JobId(row.get("id")),
        status: JobStatus::parse(row.get("status"))?,
        position: row.get("position"),
        school_name: row.get("school_name"),
        application_url: row.get("application_url"),
        location: row.get("location"),
        category: row.get("category"),
        contract_type: row.get("contract_type"),
        salary: row.get("salary"),
        description: row.get("description"),
        content_hash: row
            .get::<Option<String>, _>("content_hash")
            .map(ContentHash),
        is_auto_crawled: row.get("is_auto_crawled"),
        source_key: row.get("source_key"),
        source_url: row.get("source_url"),
        posted_by: row.get("posted_by"),
        crawled_at: row.get("crawled_at"),
        last_checked_at: row.get("last_checked_at"),
        stale_check_fail_count: row.get("stale_check_fail_count"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
    })
}

const JOB_COLUMNS: &str = "id, status, position, school_name, application_url, location, \
     category, contract_type, salary, description, content_hash, is_auto_crawled, source_key, \
     source_url, posted_by, crawled_at, last_checked_at, stale_check_fail_count, published_at, \
     created_at";

#[async_trait]
impl ListingRepository for PostgresRepository {
    async fn find_by_fingerprint(&self, hash: &ContentHash) -> Result<Option<JobRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job_records WHERE content_hash = $1"
        ))
        .bind(hash.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find job record by fingerprint")?;

        row.as_ref().map(map_job_record).transpose()
    }

    async fn insert_if_absent(&self, record: NewJobRecord) -> Result<InsertOutcome> {
        let hash = record.content_hash.clone();
        let job = record.into_record(JobId::new());

        // The partial unique index on content_hash makes this race-safe:
        // a concurrent identical insert leaves exactly one row, and the
        // loser sees no RETURNING row.
        let row = sqlx::query(
            r#"
            INSERT INTO job_records (
                id, status, position, school_name, application_url, location,
                category, contract_type, salary, description, content_hash,
                is_auto_crawled, source_key, source_url, posted_by, crawled_at,
                last_checked_at, stale_check_fail_count, published_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (content_hash) WHERE content_hash IS NOT NULL DO NOTHING
            RETURNING id
            "#,
        )
        .bind(job.id.0)
        .bind(job.status.as_str())
        .bind(&job.position)
        .bind(&job.school_name)
        .bind(&job.application_url)
        .bind(&job.location)
        .bind(&job.category)
        .bind(&job.contract_type)
        .bind(&job.salary)
        .bind(&job.description)
        .bind(job.content_hash.as_ref().map(|h| h.as_str().to_string()))
        .bind(job.is_auto_crawled)
        .bind(&job.source_key)
        .bind(&job.source_url)
        .bind(job.posted_by)
        .bind(job.crawled_at)
        .bind(job.last_checked_at)
        .bind(job.stale_check_fail_count)
        .bind(job.published_at)
        .bind(job.created_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to insert job record")?;

        if let Some(row) = row {
            return Ok(InsertOutcome::Inserted(JobId(row.get("id"))));
        }

        let existing = self
            .find_by_fingerprint(&hash)
            .await?
            .context("Fingerprint conflict but no existing record found")?;
        Ok(InsertOutcome::Duplicate(existing.id))
    }

    async fn refresh_listing(&self, id: JobId, candidate: &CandidateListing) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_records
            SET location = $2, category = $3, contract_type = $4, salary = $5, description = $6
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(&candidate.location)
        .bind(&candidate.category)
        .bind(&candidate.contract_type)
        .bind(&candidate.salary)
        .bind(&candidate.description)
        .execute(&self.pool)
        .await
        .context("Failed to refresh job record")?;
        Ok(())
    }

    async fn list_stale_candidates(&self) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job_records \
             WHERE is_auto_crawled = TRUE AND status = 'live' \
             ORDER BY last_checked_at ASC NULLS FIRST"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list stale-check candidates")?;

        rows.iter().map(map_job_record).collect()
    }

    async fn record_check_success(&self, id: JobId, checked_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_records
            SET last_checked_at = $2, stale_check_fail_count = 0
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(checked_at)
        .execute(&self.pool)
        .await
        .context("Failed to record stale-check success")?;
        Ok(())
    }

    async fn record_check_failure(&self, id: JobId, threshold: i32) -> Result<StaleOutcome> {
        // Increment and threshold transition in one statement, restricted to
        // records that are still live. A status an admin set between listing
        // and this write (or an earlier retirement by an overlapping run)
        // makes the WHERE miss: nothing is clobbered and TakenDown is only
        // reported by the write that actually did the retiring.
        let row = sqlx::query(
            r#"
            UPDATE job_records
            SET stale_check_fail_count = stale_check_fail_count + 1,
                status = CASE
                    WHEN stale_check_fail_count + 1 >= $2 THEN 'taken_down'
                    ELSE status
                END
            WHERE id = $1 AND status = 'live'
            RETURNING stale_check_fail_count, status
            "#,
        )
        .bind(id.0)
        .bind(threshold)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to record stale-check failure")?;

        if let Some(row) = row {
            let status: String = row.get("status");
            if status == "taken_down" {
                return Ok(StaleOutcome::TakenDown);
            }
            return Ok(StaleOutcome::StillLive {
                fail_count: row.get("stale_check_fail_count"),
            });
        }

        // Record left the live state since it was listed; left untouched.
        let fail_count = sqlx::query(
            "SELECT stale_check_fail_count FROM job_records WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read stale-check fail count")?
        .map(|r| r.get("stale_check_fail_count"))
        .unwrap_or(0);
        Ok(StaleOutcome::StillLive { fail_count })
    }

    async fn insert_crawl_run(&self, run: &CrawlRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crawl_runs (id, run_type, started_at, completed_at, duration_ms, results)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.id.0)
        .bind(run.results.kind())
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(run.duration_ms)
        .bind(serde_json::to_value(&run.results)?)
        .execute(&self.pool)
        .await
        .context("Failed to insert crawl run")?;
        Ok(())
    }

    async fn list_recent_runs(&self, limit: i64) -> Result<Vec<CrawlRun>> {
        let rows = sqlx::query(
            r#"
            SELECT id, started_at, completed_at, duration_ms, results
            FROM crawl_runs
            ORDER BY started_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list crawl runs")?;

        rows.into_iter()
            .map(|r| {
                Ok(CrawlRun {
                    id: RunId(r.get("id")),
                    started_at: r.get("started_at"),
                    completed_at: r.get("completed_at"),
                    duration_ms: r.get("duration_ms"),
                    results: serde_json::from_value(r.get("results"))
                        .context("Malformed crawl run results payload")?,
                })
            })
            .collect()
    }
}
