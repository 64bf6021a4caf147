//! Error types for eta-export.

use thiserror::Error;

/// Failure that aborts a whole acquisition run.
///
/// Per-page failures never surface here; they are absorbed as empty pages.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Failed to read host page: {0}")]
    HostPage(String),
    #[error("Invalid page URL {url}: {source}")]
    InvalidPageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
