//! Error types for the swarm harness.
//!
//! Only setup problems surface as errors. Anything that goes wrong while a
//! wave is in flight is recorded as a failed [`Sample`](crate::Sample).

use thiserror::Error;

/// Errors surfaced by the harness.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// The configured base URL does not parse.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The base URL could not be reached before the run started.
    #[error("target {url} is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client for a session could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// A report was requested over an empty sample set.
    #[error("no samples were recorded; nothing to report")]
    NoSamples,

    /// Writing the report artifact failed.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// A run parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SwarmError>;
