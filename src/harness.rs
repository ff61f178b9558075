//! End-to-end run: preflight, waves, report.
//!
//! This is the only place the pieces are wired together. The binary and
//! the integration tests both go through [`run_swarm`].

use crate::analysis::{Report, ReportContext};
use crate::config::SwarmConfig;
use crate::error::{Result, SwarmError};
use crate::probe::EndpointProber;
use crate::recorder::SampleRecorder;
use crate::render;
use crate::report::Reporter;
use crate::scheduler::{RunSummary, WaveScheduler};
use crate::session::SessionSimulator;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a completed run.
#[derive(Debug)]
pub struct SwarmOutcome {
    pub summary: RunSummary,
    /// Number of samples recorded.
    pub samples: usize,
    /// `None` when nothing was recorded.
    pub report: Option<Report>,
    pub report_path: Option<PathBuf>,
}

/// Run a full swarm against `config.base_url` and write the report.
///
/// Fails before the first wave on invalid configuration or an unreachable
/// target, and afterwards only if the report cannot be written. An empty
/// sample set is not an error: the reporter is told and no file is created.
pub async fn run_swarm(config: SwarmConfig, reporter: Arc<dyn Reporter>) -> Result<SwarmOutcome> {
    config.validate()?;
    preflight(&config).await?;

    let config = Arc::new(config);
    reporter.run_start(&config);
    tracing::info!(
        target_url = %config.base_url,
        duration_secs = config.duration.as_secs(),
        sessions_per_wave = config.sessions_per_wave,
        "swarm starting"
    );

    let recorder = SampleRecorder::new();
    let prober = EndpointProber::new(config.base_url.clone(), recorder.clone());
    let simulator = Arc::new(SessionSimulator::new(
        Arc::clone(&config),
        prober,
        Arc::clone(&reporter),
    ));

    let mut scheduler = WaveScheduler::new(simulator, Arc::clone(&reporter))
        .profile(config.profile)
        .wave_delay(config.wave_delay);
    if let Some(seed) = config.seed {
        scheduler = scheduler.seed(seed);
    }
    let summary = scheduler
        .run(
            config.duration,
            config.sessions_per_wave,
            config.mix.as_ref(),
        )
        .await;

    let samples = recorder.snapshot();
    reporter.run_end(&summary, samples.len());

    let context = ReportContext {
        kind: config.report,
        base_url: config.base_url.clone(),
    };
    let report = match Report::generate(&samples, &context, Utc::now()) {
        Ok(report) => report,
        Err(SwarmError::NoSamples) => {
            tracing::warn!("run finished without samples; skipping report");
            reporter.no_samples();
            return Ok(SwarmOutcome {
                summary,
                samples: 0,
                report: None,
                report_path: None,
            });
        }
        Err(e) => return Err(e),
    };

    let path = render::write_report(&config.output_dir, &report)?;
    tracing::info!(path = %path.display(), "report written");
    reporter.report_written(&report, &path);

    Ok(SwarmOutcome {
        summary,
        samples: samples.len(),
        report: Some(report),
        report_path: Some(path),
    })
}

/// Any HTTP response counts as reachable; only transport failures abort.
async fn preflight(config: &SwarmConfig) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(SwarmError::Client)?;

    match client.get(&config.base_url).send().await {
        Ok(response) => {
            tracing::debug!(status = response.status().as_u16(), "preflight ok");
            Ok(())
        }
        Err(source) => Err(SwarmError::Unreachable {
            url: config.base_url.clone(),
            source,
        }),
    }
}
