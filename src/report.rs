//! Pluggable progress reporters for swarm runs.
//!
//! All reporters implement the `Reporter` trait and are designed to be:
//! - Non-panicking: write errors are logged but never propagate
//! - Atomic: output is written in complete lines, so concurrent sessions
//!   finishing at the same time cannot interleave their lines

use crate::analysis::Report;
use crate::config::{ReportKind, SwarmConfig};
use crate::context::SessionId;
use crate::profile::BehaviorProfile;
use crate::scheduler::RunSummary;
use crate::session::SessionOutcome;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Receives run lifecycle events.
///
/// `session_end` is called from session tasks, concurrently.
pub trait Reporter: Send + Sync {
    /// Called once, after validation and before the first wave.
    fn run_start(&self, _config: &SwarmConfig) {}

    /// Called before a wave's sessions are spawned.
    fn wave_start(&self, _wave: u64, _profiles: &[BehaviorProfile]) {}

    /// Called when one session finishes, whatever the outcome.
    fn session_end(&self, _id: SessionId, _profile: BehaviorProfile, _outcome: &SessionOutcome) {}

    /// Called after the last wave has drained.
    fn run_end(&self, _summary: &RunSummary, _samples: usize) {}

    /// Called once the report artifact is on disk.
    fn report_written(&self, _report: &Report, _path: &Path) {}

    /// Called instead of `report_written` when nothing was recorded.
    fn no_samples(&self) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}

const RULE: &str = "---------------------------------------------------------------";

/// Console reporter that prints progress to stdout.
pub struct ConsoleReporter {
    show_sessions: bool,
    output_lock: Mutex<()>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            show_sessions: true,
            output_lock: Mutex::new(()),
        }
    }

    /// Print one line per finished session (on by default).
    pub fn show_sessions(mut self, show: bool) -> Self {
        self.show_sessions = show;
        self
    }

    fn write_stdout(&self, message: &str) {
        let _guard = self.output_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", message) {
            tracing::warn!(error = %e, "failed to write to stdout");
        }
    }

    fn session_line(id: SessionId, profile: BehaviorProfile, outcome: &SessionOutcome) -> String {
        match outcome {
            SessionOutcome::Completed {
                steps,
                failed_steps: 0,
            } => format!("  [{}] {:<6} logged in, {} steps ok", id, profile.name(), steps),
            SessionOutcome::Completed {
                steps,
                failed_steps,
            } => format!(
                "  [{}] {:<6} logged in, {}/{} steps failed",
                id, profile.name(), failed_steps, steps
            ),
            SessionOutcome::LoginFailed(reason) => {
                format!("  [{}] {:<6} login failed: {}", id, profile.name(), reason)
            }
            SessionOutcome::ContextUnavailable => {
                format!("  [{}] {:<6} could not start", id, profile.name())
            }
        }
    }

    fn summary_block(report: &Report, path: &Path) -> String {
        let mut lines = vec![
            RULE.to_string(),
            format!("Total requests: {}", report.total),
            format!("Success rate:   {:.1}%", report.success_rate),
            format!("Mean latency:   {:.2} ms", report.latency.mean),
            format!("Max latency:    {:.2} ms", report.latency.max),
        ];
        if report.kind == ReportKind::Advanced {
            for p in [95.0, 99.0] {
                if let Some(v) = report.percentiles.iter().find(|v| v.percentile == p) {
                    lines.push(format!("{:<16}{:.2} ms", format!("{}:", v.label()), v.latency_ms));
                }
            }
            lines.push(format!("Anomalies:      {}", report.anomalies.len()));
            lines.push(format!("Slow endpoints: {}", report.slow_endpoints.len()));
        }
        lines.push(format!("Grade:          {}", report.grade.label()));
        lines.push(format!("Report:         {}", path.display()));
        lines.push(RULE.to_string());
        lines.join("\n")
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn run_start(&self, config: &SwarmConfig) {
        let load = match &config.mix {
            Some(mix) => format!("mix {}", mix),
            None => format!("profile {}", config.profile),
        };
        let header = format!(
            "{RULE}\n\
             Swarm target: {}\n\
             Duration: {}s, Sessions/wave: {}, {}\n\
             {RULE}",
            config.base_url,
            config.duration.as_secs(),
            config.sessions_per_wave,
            load
        );
        self.write_stdout(&header);
    }

    fn wave_start(&self, wave: u64, profiles: &[BehaviorProfile]) {
        let names: Vec<_> = profiles.iter().map(|p| p.name()).collect();
        self.write_stdout(&format!(
            "Wave {}: {} sessions [{}]",
            wave,
            profiles.len(),
            names.join(", ")
        ));
    }

    fn session_end(&self, id: SessionId, profile: BehaviorProfile, outcome: &SessionOutcome) {
        if self.show_sessions {
            self.write_stdout(&Self::session_line(id, profile, outcome));
        }
    }

    fn run_end(&self, summary: &RunSummary, samples: usize) {
        self.write_stdout(&format!(
            "Completed {} waves ({} sessions) in {:.2}s, {} requests recorded",
            summary.waves,
            summary.sessions,
            summary.elapsed.as_secs_f64(),
            samples
        ));
    }

    fn report_written(&self, report: &Report, path: &Path) {
        self.write_stdout(&Self::summary_block(report, path));
    }

    fn no_samples(&self) {
        self.write_stdout("No requests were recorded; no report written.");
    }
}

/// Prints the finished report as pretty JSON.
pub struct JsonReporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonReporter {
    /// Write to stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Reporter for JsonReporter {
    fn report_written(&self, report: &Report, _path: &Path) {
        let json = match serde_json::to_string_pretty(report) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize report");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{}", json).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "failed to write JSON report");
        }
    }
}

/// Combines multiple reporters.
///
/// A panicking reporter does not stop the others from seeing the event.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    fn each(&self, f: impl Fn(&dyn Reporter)) {
        for r in &self.reporters {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(r.as_ref())));
        }
    }
}

impl Reporter for MultiReporter {
    fn run_start(&self, config: &SwarmConfig) {
        self.each(|r| r.run_start(config));
    }

    fn wave_start(&self, wave: u64, profiles: &[BehaviorProfile]) {
        self.each(|r| r.wave_start(wave, profiles));
    }

    fn session_end(&self, id: SessionId, profile: BehaviorProfile, outcome: &SessionOutcome) {
        self.each(|r| r.session_end(id, profile, outcome));
    }

    fn run_end(&self, summary: &RunSummary, samples: usize) {
        self.each(|r| r.run_end(summary, samples));
    }

    fn report_written(&self, report: &Report, path: &Path) {
        self.each(|r| r.report_written(report, path));
    }

    fn no_samples(&self) {
        self.each(|r| r.no_samples());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ReportContext;
    use crate::sample::{HttpMethod, Sample};
    use crate::session::LoginFailure;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn id() -> SessionId {
        SessionId { wave: 2, ordinal: 3 }
    }

    #[test]
    fn should_describe_each_session_outcome() {
        let ok = ConsoleReporter::session_line(
            id(),
            BehaviorProfile::Heavy,
            &SessionOutcome::Completed {
                steps: 9,
                failed_steps: 0,
            },
        );
        assert_eq!(ok, "  [2-3] heavy  logged in, 9 steps ok");

        let partial = ConsoleReporter::session_line(
            id(),
            BehaviorProfile::Fast,
            &SessionOutcome::Completed {
                steps: 3,
                failed_steps: 1,
            },
        );
        assert!(partial.contains("1/3 steps failed"));

        let failed = ConsoleReporter::session_line(
            id(),
            BehaviorProfile::Normal,
            &SessionOutcome::LoginFailed(LoginFailure::MissingToken),
        );
        assert!(failed.contains("login failed"));
    }

    fn report_for(kind: ReportKind) -> Report {
        let at = Utc::now();
        let samples: Vec<_> = (0..20u64)
            .map(|i| {
                let status = if i == 0 { None } else { Some(200) };
                Sample::new(
                    at,
                    HttpMethod::Get,
                    "/dashboard",
                    "Dashboard - Normal User 1-1",
                    Duration::from_millis(if i == 19 { 15_000 } else { 10 + i }),
                    status,
                )
            })
            .collect();
        let ctx = ReportContext {
            kind,
            base_url: "http://localhost:5000".to_string(),
        };
        Report::generate(&samples, &ctx, at).unwrap()
    }

    #[test]
    fn should_add_tail_latency_and_hotspots_to_advanced_summary() {
        let report = report_for(ReportKind::Advanced);
        let block = ConsoleReporter::summary_block(&report, Path::new("r.md"));

        assert!(block.contains("Total requests: 20\n"));
        assert!(block.contains("P95:            "));
        assert!(block.contains("P99:            15000.00 ms\n"));
        assert!(block.contains("Anomalies:      1\n"));
        assert!(block.contains("Slow endpoints: 1\n"));
        assert!(block.contains("Report:         r.md\n"));
    }

    #[test]
    fn should_keep_basic_summary_short() {
        let block = ConsoleReporter::summary_block(&report_for(ReportKind::Basic), Path::new("r.md"));
        assert!(block.contains("Success rate:   95.0%\n"));
        assert!(!block.contains("P99"));
        assert!(!block.contains("Anomalies"));
    }

    struct Counting(Arc<AtomicUsize>);

    impl Reporter for Counting {
        fn no_samples(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;

    impl Reporter for Panicking {
        fn no_samples(&self) {
            panic!("reporter bug");
        }
    }

    #[test]
    fn should_reach_every_reporter_when_one_panics() {
        let count = Arc::new(AtomicUsize::new(0));
        let multi = MultiReporter::new(vec![
            Box::new(Counting(count.clone())),
            Box::new(Panicking),
            Box::new(Counting(count.clone())),
        ]);
        multi.no_samples();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn should_print_report_as_json() {
        let sample = Sample::new(
            Utc::now(),
            HttpMethod::Get,
            "/dashboard",
            "Dashboard - Normal User 1-1",
            Duration::from_millis(12),
            Some(200),
        );
        let report = Report::generate(
            &[sample],
            &ReportContext {
                kind: ReportKind::Basic,
                base_url: "http://localhost:5000".to_string(),
            },
            Utc::now(),
        )
        .unwrap();

        let buf = SharedBuf::default();
        let reporter = JsonReporter::new(Box::new(buf.clone()));
        reporter.report_written(&report, Path::new("r.md"));

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["kind"], "basic");
        assert_eq!(value["grade"], "excellent");
    }
}
