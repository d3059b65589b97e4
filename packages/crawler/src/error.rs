use thiserror::Error;

/// Errors a source adapter can produce.
///
/// Both variants are recovered at the per-source boundary: the orchestrator
/// records them as text against the failing source and moves on. Persistence
/// failures are not part of this taxonomy; those propagate as
/// `anyhow::Error` and are fatal to the whole invocation.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure, timeout, or non-success HTTP status.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Payload did not match the shape the adapter expects.
    #[error("unrecognized payload from {source_key}: {message}")]
    Parse { source_key: String, message: String },
}

impl SourceError {
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn parse(source_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_key: source_key.into(),
            message: message.into(),
        }
    }

    /// Wrap a reqwest error, keeping the requested URL for the audit trail.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.to_string()
        };
        Self::Fetch {
            url: url.to_string(),
            message,
        }
    }
}
