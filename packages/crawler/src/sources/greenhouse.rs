//! Greenhouse job board adapter.
//!
//! Greenhouse exposes a public JSON API per board:
//! `https://boards-api.greenhouse.io/v1/boards/{board}/jobs`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{gone_status, SourceAdapter};
use crate::error::SourceError;
use crate::types::CandidateListing;

const BASE_URL: &str = "https://boards-api.greenhouse.io/v1/boards";

pub struct GreenhouseAdapter {
    client: reqwest::Client,
    board: String,
    school: String,
    key: String,
}

impl GreenhouseAdapter {
    pub fn new(client: reqwest::Client, board: &str, school: &str) -> Self {
        Self {
            client,
            board: board.to_string(),
            school: school.to_string(),
            key: format!("greenhouse:{board}"),
        }
    }

    fn jobs_url(&self) -> String {
        format!("{BASE_URL}/{}/jobs?content=true", self.board)
    }

    async fn fetch_body(&self, url: &str) -> Result<String, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::fetch(url, format!("HTTP {status}")));
        }
        resp.text()
            .await
            .map_err(|e| SourceError::from_reqwest(url, e))
    }
}

#[async_trait]
impl SourceAdapter for GreenhouseAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch_listings(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateListing>, SourceError> {
        let url = self.jobs_url();
        let body = self.fetch_body(&url).await?;
        let mut listings = parse_jobs(&self.key, &self.school, &body)?;
        if let Some(limit) = limit {
            listings.truncate(limit);
        }
        tracing::debug!(source = %self.key, count = listings.len(), "Fetched Greenhouse listings");
        Ok(listings)
    }

    async fn probe(&self, source_url: &str) -> Result<bool, SourceError> {
        // The board list is cheap without content; the listing is live iff
        // its URL still appears there.
        let url = format!("{BASE_URL}/{}/jobs", self.board);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(&url, e))?;

        let status = resp.status();
        if gone_status(status) {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(SourceError::fetch(&url, format!("HTTP {status}")));
        }

        let body: BoardResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::parse(&self.key, e.to_string()))?;
        Ok(body.jobs.iter().any(|j| j.absolute_url == source_url))
    }
}

#[derive(Debug, Deserialize)]
struct BoardResponse {
    jobs: Vec<BoardJob>,
}

#[derive(Debug, Deserialize)]
struct BoardJob {
    title: String,
    absolute_url: String,
    location: Option<JobLocation>,
    #[serde(default)]
    departments: Vec<Department>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobLocation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Department {
    name: String,
}

fn parse_jobs(key: &str, school: &str, body: &str) -> Result<Vec<CandidateListing>, SourceError> {
    let parsed: BoardResponse =
        serde_json::from_str(body).map_err(|e| SourceError::parse(key, e.to_string()))?;

    Ok(parsed
        .jobs
        .into_iter()
        .map(|job| CandidateListing {
            position: job.title,
            school_name: school.to_string(),
            source_url: job.absolute_url.clone(),
            application_url: job.absolute_url,
            location: job.location.map(|l| l.name),
            category: job.departments.into_iter().next().map(|d| d.name),
            contract_type: None,
            salary: None,
            description: job.content,
        })
        .collect())
}
