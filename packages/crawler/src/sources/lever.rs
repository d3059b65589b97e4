//! Lever postings adapter.
//!
//! Lever publishes postings as a JSON array at
//! `https://api.lever.co/v0/postings/{site}?mode=json`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{gone_status, SourceAdapter};
use crate::error::SourceError;
use crate::types::CandidateListing;

const BASE_URL: &str = "https://api.lever.co/v0/postings";

pub struct LeverAdapter {
    client: reqwest::Client,
    site: String,
    school: String,
    key: String,
}

impl LeverAdapter {
    pub fn new(client: reqwest::Client, site: &str, school: &str) -> Self {
        Self {
            client,
            site: site.to_string(),
            school: school.to_string(),
            key: format!("lever:{site}"),
        }
    }

    fn postings_url(&self) -> String {
        format!("{BASE_URL}/{}?mode=json", self.site)
    }

    async fn fetch_postings(&self) -> Result<Vec<Posting>, SourceError> {
        let url = self.postings_url();
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
        serde_json::from_str(&body).map_err(|e| SourceError::parse(&self.key, e.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for LeverAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch_listings(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateListing>, SourceError> {
        let postings = self.fetch_postings().await?;
        let mut listings: Vec<CandidateListing> = postings
            .into_iter()
            .map(|p| p.into_candidate(&self.school))
            .collect();
        if let Some(limit) = limit {
            listings.truncate(limit);
        }
        tracing::debug!(source = %self.key, count = listings.len(), "Fetched Lever postings");
        Ok(listings)
    }

    async fn probe(&self, source_url: &str) -> Result<bool, SourceError> {
        let url = self.postings_url();
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

        let postings: Vec<Posting> = resp
            .json()
            .await
            .map_err(|e| SourceError::parse(&self.key, e.to_string()))?;
        Ok(postings.iter().any(|p| p.hosted_url == source_url))
    }
}

#[derive(Debug, Deserialize)]
struct Posting {
    text: String,
    #[serde(rename = "hostedUrl")]
    hosted_url: String,
    #[serde(rename = "applyUrl")]
    apply_url: Option<String>,
    #[serde(default)]
    categories: Categories,
    #[serde(rename = "descriptionPlain")]
    description_plain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Categories {
    location: Option<String>,
    team: Option<String>,
    commitment: Option<String>,
}

impl Posting {
    fn into_candidate(self, school: &str) -> CandidateListing {
        CandidateListing {
            position: self.text,
            school_name: school.to_string(),
            application_url: self.apply_url.unwrap_or_else(|| self.hosted_url.clone()),
            source_url: self.hosted_url,
            location: self.categories.location,
            category: self.categories.team,
            contract_type: self.categories.commitment,
            salary: None,
            description: self.description_plain,
        }
    }
}
