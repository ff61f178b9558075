//! Per-request outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Status code recorded when no response was received at all.
pub const NO_RESPONSE: u16 = 0;

/// HTTP verbs the prober issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed request outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock instant the request was issued.
    pub timestamp: DateTime<Utc>,
    pub method: HttpMethod,
    /// Path including query string, e.g. `/produtos?page=1`.
    pub endpoint: String,
    /// Step label plus session identifier.
    pub description: String,
    /// Request start to response headers (or failure), in milliseconds.
    pub latency_ms: f64,
    /// Observed status, or [`NO_RESPONSE`].
    pub status_code: u16,
    pub success: bool,
}

impl Sample {
    /// Build a sample from a probe outcome.
    ///
    /// `status` is `None` when the request never produced a response.
    pub fn new(
        timestamp: DateTime<Utc>,
        method: HttpMethod,
        endpoint: impl Into<String>,
        description: impl Into<String>,
        elapsed: Duration,
        status: Option<u16>,
    ) -> Self {
        let status_code = status.unwrap_or(NO_RESPONSE);
        Self {
            timestamp,
            method,
            endpoint: endpoint.into(),
            description: description.into(),
            latency_ms: round_ms(elapsed),
            status_code,
            success: status.is_some_and(is_success_status),
        }
    }
}

/// A response counts as successful when its status is in `[200, 400)`.
pub fn is_success_status(code: u16) -> bool {
    (200..400).contains(&code)
}

/// Milliseconds rounded to two decimals.
fn round_ms(d: Duration) -> f64 {
    (d.as_secs_f64() * 100_000.0).round() / 100.0
}
