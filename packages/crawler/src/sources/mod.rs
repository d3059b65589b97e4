//! Source adapters: one per supported ATS family, plus generic career pages.
//!
//! Adapters are polymorphic over a single capability — list the current
//! postings for one configured source — and are registered explicitly in a
//! [`SourceRegistry`] that is handed to the orchestrator at construction
//! time. Adding an ATS family means implementing [`SourceAdapter`], not
//! touching the orchestrator.

pub mod bamboohr;
pub mod career_page;
pub mod greenhouse;
pub mod lever;

pub use bamboohr::BambooHrAdapter;
pub use career_page::CareerPageAdapter;
pub use greenhouse::GreenhouseAdapter;
pub use lever::LeverAdapter;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::types::CandidateListing;

/// One registered listing source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable key recorded on every record this adapter produces, and used
    /// by the stale checker to route probes back here.
    fn key(&self) -> &str;

    /// Fetch and normalize the source's current postings.
    ///
    /// No side effects beyond the network call; adapters never write to
    /// storage. `limit` caps the number of listings returned.
    async fn fetch_listings(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateListing>, SourceError>;

    /// Lightweight existence check for a previously ingested listing.
    ///
    /// Returns `Ok(false)` when the source answered and the listing is gone;
    /// `Err` when the source could not be consulted at all. The stale checker
    /// treats both as a failed check.
    async fn probe(&self, source_url: &str) -> Result<bool, SourceError>;
}

/// Declarative source configuration, deserialized from `CRAWL_SOURCES`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceSpec {
    Greenhouse { board: String, school: String },
    Lever { site: String, school: String },
    Bamboohr { subdomain: String, school: String },
    CareerPage { url: String, school: String },
}

/// Explicitly constructed adapter list passed into the orchestrator and the
/// stale checker. No global registration.
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    /// Build the registry from configuration, sharing one HTTP client.
    pub fn from_specs(specs: &[SourceSpec], client: reqwest::Client) -> Self {
        let adapters = specs
            .iter()
            .map(|spec| -> Arc<dyn SourceAdapter> {
                match spec {
                    SourceSpec::Greenhouse { board, school } => {
                        Arc::new(GreenhouseAdapter::new(client.clone(), board, school))
                    }
                    SourceSpec::Lever { site, school } => {
                        Arc::new(LeverAdapter::new(client.clone(), site, school))
                    }
                    SourceSpec::Bamboohr { subdomain, school } => {
                        Arc::new(BambooHrAdapter::new(client.clone(), subdomain, school))
                    }
                    SourceSpec::CareerPage { url, school } => {
                        Arc::new(CareerPageAdapter::new(client.clone(), url, school))
                    }
                }
            })
            .collect();
        Self { adapters }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SourceAdapter>> {
        self.adapters.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.key() == key)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Shared HTTP client for all adapters.
///
/// Browser-like headers to avoid naive bot detection on school career pages;
/// the per-request timeout is the per-source latency bound, kept well under
/// the run deadline.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"
            .parse()
            .context("invalid Accept header")?,
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        "en-US,en;q=0.5".parse().context("invalid Accept-Language header")?,
    );

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .context("Failed to create HTTP client")
}

/// Shared helper: does an HTTP status mean "listing gone" as opposed to
/// "source unavailable"? 404/410 are definitive answers; anything else
/// non-successful is a fetch failure.
pub(crate) fn gone_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE
}
