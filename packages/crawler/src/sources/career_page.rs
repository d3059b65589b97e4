//! Generic career-page adapter for schools without an ATS.
//!
//! Fetches a static HTML page and extracts job-ish links with CSS selectors.
//! No JavaScript rendering; pages that require it need a dedicated adapter.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::{gone_status, SourceAdapter};
use crate::error::SourceError;
use crate::types::CandidateListing;

/// Anchor text keywords that mark a link as a probable job listing.
const JOB_KEYWORDS: &[&str] = &[
    "teacher",
    "teaching",
    "principal",
    "head of",
    "coordinator",
    "counselor",
    "counsellor",
    "librarian",
    "nurse",
    "assistant",
    "instructor",
    "tutor",
    "vacancy",
    "position",
];

pub struct CareerPageAdapter {
    client: reqwest::Client,
    url: String,
    school: String,
    key: String,
}

impl CareerPageAdapter {
    pub fn new(client: reqwest::Client, url: &str, school: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
            school: school.to_string(),
            key: format!("career_page:{url}"),
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String, SourceError> {
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
impl SourceAdapter for CareerPageAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch_listings(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateListing>, SourceError> {
        let html = self.fetch_html(&self.url).await?;
        let mut listings = parse_career_page(&self.key, &self.school, &self.url, &html)?;
        if let Some(limit) = limit {
            listings.truncate(limit);
        }
        tracing::debug!(source = %self.key, count = listings.len(), "Extracted career page listings");
        Ok(listings)
    }

    async fn probe(&self, source_url: &str) -> Result<bool, SourceError> {
        // The listing link itself is the cheapest truth: a 404/410 means the
        // posting page was removed.
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

/// Extract candidate listings from a career page document.
fn parse_career_page(
    key: &str,
    school: &str,
    page_url: &str,
    html: &str,
) -> Result<Vec<CandidateListing>, SourceError> {
    let base = Url::parse(page_url).map_err(|e| SourceError::parse(key, e.to_string()))?;
    let document = Html::parse_document(html);
    let anchors =
        Selector::parse("a[href]").map_err(|e| SourceError::parse(key, e.to_string()))?;

    let mut seen = std::collections::HashSet::new();
    let mut listings = Vec::new();

    for anchor in document.select(&anchors) {
        let text = anchor.text().collect::<String>();
        let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() || !looks_like_job(&title) {
            continue;
        }

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(link) = base.join(href) else {
            continue;
        };
        if link.as_str() == base.as_str() || !seen.insert(link.to_string()) {
            continue;
        }

        listings.push(CandidateListing {
            position: title,
            school_name: school.to_string(),
            application_url: link.to_string(),
            source_url: link.to_string(),
            location: None,
            category: None,
            contract_type: None,
            salary: None,
            description: None,
        });
    }

    Ok(listings)
}

fn looks_like_job(title: &str) -> bool {
    let lower = title.to_lowercase();
    JOB_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
