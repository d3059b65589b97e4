//! Content fingerprinting for duplicate detection.
//!
//! A listing's identity is the (position, school, application URL) triple.
//! Inputs are normalized before hashing so cosmetic re-crawls of an unchanged
//! listing always produce the same fingerprint; description or salary edits
//! do not participate and therefore never create a new record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 identity hash of a listing.
///
/// Only used as an equality key, never decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Fingerprint a listing by its identity triple.
    pub fn of_listing(position: &str, school_name: &str, application_url: &str) -> Self {
        let input = format!(
            "{}\n{}\n{}",
            normalize(position),
            normalize(school_name),
            normalize(application_url)
        );
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize one identity field: trim, collapse runs of whitespace, lowercase.
fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
