//! # cntryl-swarm
//!
//! A wave-based synthetic user load generator for session-backed web
//! applications.
//!
//! Each synthetic user logs in through the application's login form (with
//! its anti-forgery token), then walks a scripted navigation path with its
//! own cookie jar. Users are launched in concurrent waves for a bounded
//! time; every request becomes a latency [`Sample`], and the run ends with
//! a markdown report of percentiles, per-endpoint hotspots, throughput and
//! latency anomalies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cntryl_swarm::{run_swarm, ConsoleReporter, SwarmConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> cntryl_swarm::Result<()> {
//! let config = SwarmConfig::mixed()
//!     .base_url("http://localhost:5000")
//!     .duration(Duration::from_secs(60));
//!
//! let outcome = run_swarm(config, Arc::new(ConsoleReporter::new())).await?;
//! if let Some(path) = outcome.report_path {
//!     println!("report at {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

mod analysis;
mod config;
mod context;
mod error;
mod harness;
mod probe;
mod profile;
mod recorder;
mod render;
mod report;
mod sample;
mod scheduler;
mod session;
mod token;

pub mod stats;

pub use analysis::{
    Anomaly, EndpointStats, Grade, PercentileValue, Report, ReportContext, SuccessGrade,
    ThroughputBucket,
};
pub use config::{Credentials, ReportKind, Routes, SwarmConfig, WaveDelay};
pub use context::{SessionContext, SessionId};
pub use error::{Result, SwarmError};
pub use harness::{run_swarm, SwarmOutcome};
pub use probe::{EndpointProber, Fetched, FormFields};
pub use profile::{BehaviorProfile, ProfileMix, ProfileSpec, Script, Step, SEARCH_TERMS};
pub use recorder::SampleRecorder;
pub use render::{file_name, render, write_report};
pub use report::{ConsoleReporter, JsonReporter, MultiReporter, Reporter, SilentReporter};
pub use sample::{is_success_status, HttpMethod, Sample, NO_RESPONSE};
pub use scheduler::{RunSummary, WaveScheduler};
pub use session::{LoginFailure, SessionOutcome, SessionRunner, SessionSimulator};
pub use stats::LatencySummary;
pub use token::{PatternTokenExtractor, TokenExtractor};
