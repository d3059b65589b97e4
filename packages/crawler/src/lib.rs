//! Job listing crawl pipeline.
//!
//! Ingests listings from third-party ATS boards and school career pages,
//! deduplicates them by content fingerprint, and retires listings that are
//! no longer live at their source. The job board itself (UI, auth, billing)
//! lives elsewhere and only consumes the records and run summaries this
//! crate persists.

pub mod config;
pub mod crawl;
pub mod error;
pub mod fingerprint;
pub mod runs;
pub mod sources;
pub mod stale;
pub mod storage;
pub mod types;

pub use config::Config;
pub use crawl::Crawler;
pub use error::SourceError;
pub use fingerprint::ContentHash;
pub use runs::RunReporter;
pub use sources::{SourceAdapter, SourceRegistry, SourceSpec};
pub use stale::StaleChecker;
pub use storage::{ListingRepository, PostgresRepository};
pub use types::{
    CandidateListing, CrawlRun, InsertOutcome, JobId, JobRecord, JobStatus, NewJobRecord,
    RunResults, SourceResult, StaleCheckResults, StaleOutcome,
};
