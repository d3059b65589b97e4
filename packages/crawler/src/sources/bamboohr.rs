//! BambooHR careers adapter.
//!
//! BambooHR career sites expose their openings at
//! `https://{subdomain}.bamboohr.com/careers/list`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{gone_status, SourceAdapter};
use crate::error::SourceError;
use crate::types::CandidateListing;

pub struct BambooHrAdapter {
    client: reqwest::Client,
    subdomain: String,
    school: String,
    key: String,
}

impl BambooHrAdapter {
    pub fn new(client: reqwest::Client, subdomain: &str, school: &str) -> Self {
        Self {
            client,
            subdomain: subdomain.to_string(),
            school: school.to_string(),
            key: format!("bamboohr:{subdomain}"),
        }
    }

    fn list_url(&self) -> String {
        format!("https://{}.bamboohr.com/careers/list", self.subdomain)
    }

    fn career_url(&self, opening_id: &str) -> String {
        format!("https://{}.bamboohr.com/careers/{opening_id}", self.subdomain)
    }
}

#[async_trait]
impl SourceAdapter for BambooHrAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch_listings(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateListing>, SourceError> {
        let url = self.list_url();
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::fetch(&url, format!("HTTP {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(&url, e))?;
        let mut listings = parse_openings(&self.key, &self.school, &self.subdomain, &body)?;
        if let Some(limit) = limit {
            listings.truncate(limit);
        }
        tracing::debug!(source = %self.key, count = listings.len(), "Fetched BambooHR openings");
        Ok(listings)
    }

    async fn probe(&self, source_url: &str) -> Result<bool, SourceError> {
        // Each opening has its own page; a direct status check is cheaper
        // than re-fetching the whole list.
        let resp = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(source_url, e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(true);
        }
        if gone_status(status) {
            return Ok(false);
        }
        Err(SourceError::fetch(source_url, format!("HTTP {status}")))
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    result: Vec<Opening>,
}

#[derive(Debug, Deserialize)]
struct Opening {
    id: String,
    #[serde(rename = "jobOpeningName")]
    job_opening_name: String,
    #[serde(rename = "departmentLabel")]
    department_label: Option<String>,
    #[serde(rename = "employmentStatusLabel")]
    employment_status_label: Option<String>,
    location: Option<OpeningLocation>,
}

#[derive(Debug, Deserialize)]
struct OpeningLocation {
    city: Option<String>,
    state: Option<String>,
}

impl OpeningLocation {
    fn display(&self) -> Option<String> {
        match (&self.city, &self.state) {
            (Some(city), Some(state)) => Some(format!("{city}, {state}")),
            (Some(city), None) => Some(city.clone()),
            (None, Some(state)) => Some(state.clone()),
            (None, None) => None,
        }
    }
}

fn parse_openings(
    key: &str,
    school: &str,
    subdomain: &str,
    body: &str,
) -> Result<Vec<CandidateListing>, SourceError> {
    let parsed: ListResponse =
        serde_json::from_str(body).map_err(|e| SourceError::parse(key, e.to_string()))?;

    Ok(parsed
        .result
        .into_iter()
        .map(|opening| {
            let url = format!("https://{subdomain}.bamboohr.com/careers/{}", opening.id);
            CandidateListing {
                position: opening.job_opening_name,
                school_name: school.to_string(),
                application_url: url.clone(),
                source_url: url,
                location: opening.location.and_then(|l| l.display()),
                category: opening.department_label,
                contract_type: opening.employment_status_label,
                salary: None,
                description: None,
            }
        })
        .collect())
}
