//! Timed single-request probes.
//!
//! The prober is the failure boundary of the harness: transport errors,
//! timeouts and error statuses all end here as a failed [`Sample`]. Nothing
//! above this layer ever sees a `reqwest::Error`.

use crate::context::SessionContext;
use crate::recorder::SampleRecorder;
use crate::sample::{HttpMethod, Sample};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Form fields submitted with a POST probe.
pub type FormFields = [(String, String)];

/// An unrecorded request: when it was sent, how long it took and what came back.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub timestamp: DateTime<Utc>,
    pub elapsed: Duration,
    /// `None` without a response.
    pub status: Option<u16>,
    pub body: Option<String>,
}

/// Issues requests relative to a base URL and records every outcome.
#[derive(Debug, Clone)]
pub struct EndpointProber {
    base_url: String,
    recorder: SampleRecorder,
}

impl EndpointProber {
    pub fn new(base_url: impl Into<String>, recorder: SampleRecorder) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, recorder }
    }

    pub fn recorder(&self) -> &SampleRecorder {
        &self.recorder
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request through `ctx`, record it and return the sample.
    ///
    /// `payload` is sent form-encoded on POST and ignored on GET.
    pub async fn probe(
        &self,
        ctx: &SessionContext,
        method: HttpMethod,
        endpoint: &str,
        payload: Option<&FormFields>,
        description: &str,
    ) -> Sample {
        let fetched = self.send(ctx, method, endpoint, payload, false).await;
        self.record(Sample::new(
            fetched.timestamp,
            method,
            endpoint,
            description,
            fetched.elapsed,
            fetched.status,
        ))
    }

    /// GET `endpoint` through `ctx` without recording a sample.
    ///
    /// For pages the session needs to read but that are not measured on
    /// their own, such as the login form. The body is read after the timer
    /// stops.
    pub async fn fetch_text(&self, ctx: &SessionContext, endpoint: &str) -> Fetched {
        self.send(ctx, HttpMethod::Get, endpoint, None, true).await
    }

    /// Record an already-built sample, e.g. for a request that was never sent.
    pub fn record(&self, sample: Sample) -> Sample {
        tracing::trace!(
            method = %sample.method,
            endpoint = %sample.endpoint,
            status = sample.status_code,
            latency_ms = sample.latency_ms,
            "probe recorded"
        );
        self.recorder.record(sample.clone());
        sample
    }

    async fn send(
        &self,
        ctx: &SessionContext,
        method: HttpMethod,
        endpoint: &str,
        payload: Option<&FormFields>,
        want_body: bool,
    ) -> Fetched {
        let url = format!("{}{}", self.base_url, endpoint);
        let request = match method {
            HttpMethod::Get => ctx.client().get(&url),
            HttpMethod::Post => match payload {
                Some(fields) => ctx.client().post(&url).form(fields),
                None => ctx.client().post(&url),
            },
        };

        let timestamp = Utc::now();
        let start = Instant::now();
        let outcome = request.send().await;
        let elapsed = start.elapsed();

        let (status, body) = match outcome {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = if want_body {
                    response.text().await.ok()
                } else {
                    // Drain so the connection can go back to the pool.
                    let _ = response.bytes().await;
                    None
                };
                (Some(status), body)
            }
            Err(e) => {
                tracing::debug!(
                    session = %ctx.id(),
                    %method,
                    endpoint,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    error = %e,
                    "request failed without a response"
                );
                (None, None)
            }
        };

        Fetched {
            timestamp,
            elapsed,
            status,
            body,
        }
    }
}
