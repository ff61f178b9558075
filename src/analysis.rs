//! Aggregation of a finished run's samples into a [`Report`].
//!
//! [`Report::generate`] is pure: the same samples, context and generation
//! time always give the same report. Samples may arrive in any order; every
//! grouping and ordering here is explicit.

use crate::config::ReportKind;
use crate::error::{Result, SwarmError};
use crate::sample::Sample;
use crate::stats::{self, LatencySummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Number of anomalies shown in the report.
pub const RECENT_ANOMALIES: usize = 5;
/// Number of most-accessed endpoints listed.
pub const TOP_ENDPOINTS: usize = 5;
/// Number of trailing requests listed in the basic report.
pub const RECENT_REQUESTS: usize = 10;
/// Standard deviations above the mean that make a sample anomalous.
pub const ANOMALY_SIGMAS: f64 = 2.0;

/// Qualitative verdict on mean latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    Degraded,
    Critical,
    /// No request succeeded; latency says nothing useful.
    TotalFailure,
}

/// Upper bounds (exclusive, ms) of each latency grade; anything above is critical.
const LATENCY_GRADES: [(f64, Grade); 3] = [
    (200.0, Grade::Excellent),
    (500.0, Grade::Good),
    (1000.0, Grade::Degraded),
];

impl Grade {
    /// Grade for a run; a run with zero successes is always `TotalFailure`.
    pub fn classify(mean_latency_ms: f64, successes: usize) -> Self {
        if successes == 0 {
            return Grade::TotalFailure;
        }
        LATENCY_GRADES
            .iter()
            .find(|(limit, _)| mean_latency_ms < *limit)
            .map(|(_, grade)| *grade)
            .unwrap_or(Grade::Critical)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::Excellent => "EXCELENTE",
            Grade::Good => "BOM",
            Grade::Degraded => "ATENÇÃO",
            Grade::Critical => "CRÍTICO",
            Grade::TotalFailure => "FALHA TOTAL",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Grade::Excellent => "Sistema operando com performance ótima",
            Grade::Good => "Performance aceitável, monitoramento recomendado",
            Grade::Degraded => "Performance degradada, otimização necessária",
            Grade::Critical => "Performance inaceitável, ação imediata necessária",
            Grade::TotalFailure => "Nenhum request foi bem-sucedido; verifique disponibilidade e login",
        }
    }
}

/// Qualitative verdict on the success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessGrade {
    Excellent,
    Good,
    Critical,
}

impl SuccessGrade {
    pub fn classify(success_rate: f64) -> Self {
        if success_rate >= 99.0 {
            SuccessGrade::Excellent
        } else if success_rate >= 95.0 {
            SuccessGrade::Good
        } else {
            SuccessGrade::Critical
        }
    }
}

/// Latency at one percentile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub latency_ms: f64,
}

impl PercentileValue {
    /// `P50`, `P99.9`, ...
    pub fn label(&self) -> String {
        format!("P{}", self.percentile)
    }
}

/// Statistics for one exact endpoint string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub count: usize,
    pub successes: usize,
    pub success_rate: f64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Mean latency is above the report kind's threshold.
    pub needs_optimization: bool,
}

/// Requests issued within one wall-clock minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputBucket {
    /// Start of the minute.
    pub minute: DateTime<Utc>,
    pub requests: usize,
    pub mean_ms: f64,
    pub max_ms: f64,
}

/// A sample well above the run's typical latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub description: String,
    pub latency_ms: f64,
}

/// Where the samples came from; shown in the report header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportContext {
    pub kind: ReportKind,
    pub base_url: String,
}

/// Read-only aggregate of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub kind: ReportKind,
    pub base_url: String,
    pub generated_at: DateTime<Utc>,

    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    /// Percentage, 0-100.
    pub success_rate: f64,
    pub latency: LatencySummary,
    /// Time between the first and last issued request.
    #[serde(with = "duration_millis")]
    pub span: Duration,
    /// Average request rate over `span`; `None` when all samples share one instant.
    pub requests_per_minute: Option<f64>,

    pub percentiles: Vec<PercentileValue>,
    /// Sorted by endpoint.
    pub endpoints: Vec<EndpointStats>,
    /// Endpoints over the slow threshold, slowest first.
    pub slow_endpoints: Vec<EndpointStats>,
    /// Most requested endpoints with their share of traffic, busiest first.
    pub top_endpoints: Vec<(String, usize)>,
    pub status_codes: BTreeMap<u16, usize>,

    /// Chronological.
    pub throughput: Vec<ThroughputBucket>,
    pub anomaly_threshold_ms: f64,
    /// Chronological; every anomalous sample.
    pub anomalies: Vec<Anomaly>,
    /// Last requests by issue time.
    pub recent: Vec<Sample>,

    pub grade: Grade,
    pub success_grade: SuccessGrade,
}

impl Report {
    /// Aggregate a completed sample set.
    ///
    /// Fails with [`SwarmError::NoSamples`] on empty input.
    pub fn generate(
        samples: &[Sample],
        context: &ReportContext,
        generated_at: DateTime<Utc>,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(SwarmError::NoSamples);
        }

        let kind = context.kind;
        let latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
        let latency = LatencySummary::from_latencies(&latencies);

        let total = samples.len();
        let successes = samples.iter().filter(|s| s.success).count();
        let success_rate = successes as f64 / total as f64 * 100.0;

        let sorted = stats::sorted(&latencies);
        let percentiles = kind
            .percentiles()
            .iter()
            .filter_map(|&p| {
                stats::percentile(&sorted, p).map(|latency_ms| PercentileValue {
                    percentile: p,
                    latency_ms,
                })
            })
            .collect();

        let endpoints = endpoint_stats(samples, kind.slow_endpoint_threshold_ms());
        let mut slow_endpoints: Vec<_> = endpoints
            .iter()
            .filter(|e| e.needs_optimization)
            .cloned()
            .collect();
        slow_endpoints.sort_by(|a, b| {
            b.mean_ms
                .total_cmp(&a.mean_ms)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });

        let mut top_endpoints: Vec<_> = endpoints
            .iter()
            .map(|e| (e.endpoint.clone(), e.count))
            .collect();
        top_endpoints.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_endpoints.truncate(TOP_ENDPOINTS);

        let mut status_codes = BTreeMap::new();
        for s in samples {
            *status_codes.entry(s.status_code).or_insert(0) += 1;
        }

        let mut chronological: Vec<&Sample> = samples.iter().collect();
        chronological.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
                .then_with(|| a.description.cmp(&b.description))
                .then_with(|| a.latency_ms.total_cmp(&b.latency_ms))
                .then_with(|| a.status_code.cmp(&b.status_code))
        });

        let first = chronological[0].timestamp;
        let last = chronological[chronological.len() - 1].timestamp;
        let span = (last - first).to_std().unwrap_or_default();
        let requests_per_minute = if span.is_zero() {
            None
        } else {
            Some(total as f64 / (span.as_secs_f64() / 60.0))
        };

        let anomaly_threshold_ms = latency.mean + ANOMALY_SIGMAS * latency.std_dev;
        let anomalies = chronological
            .iter()
            .filter(|s| s.latency_ms > anomaly_threshold_ms)
            .map(|s| Anomaly {
                timestamp: s.timestamp,
                endpoint: s.endpoint.clone(),
                description: s.description.clone(),
                latency_ms: s.latency_ms,
            })
            .collect();

        let recent = chronological
            .iter()
            .skip(total.saturating_sub(RECENT_REQUESTS))
            .map(|s| (*s).clone())
            .collect();

        let grade = Grade::classify(latency.mean, successes);
        let success_grade = SuccessGrade::classify(success_rate);

        Ok(Self {
            kind,
            base_url: context.base_url.clone(),
            generated_at,
            total,
            successes,
            failures: total - successes,
            success_rate,
            latency,
            span,
            requests_per_minute,
            percentiles,
            endpoints,
            slow_endpoints,
            top_endpoints,
            status_codes,
            throughput: throughput(&chronological),
            anomaly_threshold_ms,
            anomalies,
            recent,
            grade,
            success_grade,
        })
    }

    /// The most recent anomalies, oldest first.
    pub fn recent_anomalies(&self) -> &[Anomaly] {
        let skip = self.anomalies.len().saturating_sub(RECENT_ANOMALIES);
        &self.anomalies[skip..]
    }

    /// More than 5% of requests were anomalous.
    pub fn is_unstable(&self) -> bool {
        self.anomalies.len() as f64 > self.total as f64 * 0.05
    }
}

fn endpoint_stats(samples: &[Sample], slow_threshold_ms: f64) -> Vec<EndpointStats> {
    let mut groups: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
    for s in samples {
        groups.entry(s.endpoint.as_str()).or_default().push(s);
    }

    groups
        .into_iter()
        .map(|(endpoint, group)| {
            let latencies: Vec<f64> = group.iter().map(|s| s.latency_ms).collect();
            let summary = LatencySummary::from_latencies(&latencies);
            let successes = group.iter().filter(|s| s.success).count();
            EndpointStats {
                endpoint: endpoint.to_string(),
                count: group.len(),
                successes,
                success_rate: successes as f64 / group.len() as f64 * 100.0,
                mean_ms: summary.mean,
                min_ms: summary.min,
                max_ms: summary.max,
                needs_optimization: summary.mean > slow_threshold_ms,
            }
        })
        .collect()
}

fn throughput(chronological: &[&Sample]) -> Vec<ThroughputBucket> {
    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for s in chronological {
        let minute = s.timestamp.timestamp().div_euclid(60);
        buckets.entry(minute).or_default().push(s.latency_ms);
    }

    buckets
        .into_iter()
        .filter_map(|(minute, latencies)| {
            let start = DateTime::from_timestamp(minute * 60, 0)?;
            Some(ThroughputBucket {
                minute: start,
                requests: latencies.len(),
                mean_ms: stats::mean(&latencies),
                max_ms: latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
        })
        .collect()
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
