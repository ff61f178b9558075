//! cntryl-swarm: drive a session-backed web application with waves of
//! synthetic users and write a latency report.
//!
//! Configuration is layered: built-in defaults (or the `--mixed` preset),
//! then `SWARM_*` environment variables, then command-line flags.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cntryl_swarm::{
    run_swarm, BehaviorProfile, ConsoleReporter, JsonReporter, MultiReporter, ProfileMix,
    ReportKind, Reporter, Routes, SwarmConfig, WaveDelay,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "cntryl-swarm",
    version,
    about = "Wave-based synthetic user load generator",
    long_about = "
cntryl-swarm logs synthetic users into a web application through its login
form and walks them through scripted navigation in concurrent waves. Every
request is timed; at the end a markdown report with percentiles, endpoint
hotspots, throughput and anomalies is written to the output directory.

Example:
    cntryl-swarm run                                  # 30s, 3 normal users per wave
    cntryl-swarm run --mixed --duration 120           # 2:1:1 mix, advanced report
    cntryl-swarm run --profile heavy --sessions 10
    cntryl-swarm run --mix normal=1,fast=3 --json
    cntryl-swarm profiles                             # Show profile scripts
"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a load test and write the report
    Run(RunArgs),
    /// List behavior profiles and their scripts
    Profiles,
}

#[derive(Debug, Parser)]
struct RunArgs {
    // ========================================================================
    // Target
    // ========================================================================
    /// Root URL of the application under test
    #[arg(long)]
    url: Option<String>,

    /// Login e-mail
    #[arg(long)]
    email: Option<String>,

    /// Login password
    #[arg(long)]
    password: Option<String>,

    /// Submit the login form with "remember me" checked
    #[arg(long)]
    remember: bool,

    /// Login form route
    #[arg(long)]
    login_path: Option<String>,

    // ========================================================================
    // Load Shape
    // ========================================================================
    /// Start from the mixed-load preset (2:1:1 mix, 1-3s pauses, advanced report)
    #[arg(long)]
    mixed: bool,

    /// Stop launching waves after this many seconds
    #[arg(long, short = 'd')]
    duration: Option<u64>,

    /// Concurrent sessions per wave
    #[arg(long, short = 's')]
    sessions: Option<usize>,

    /// Profile for every session
    #[arg(long, value_enum, conflicts_with = "mix")]
    profile: Option<BehaviorProfile>,

    /// Weighted profile mix, e.g. "2:1:1" or "normal=2,heavy=1"
    #[arg(long)]
    mix: Option<ProfileMix>,

    /// Pause between waves in milliseconds (lower bound with --wave-delay-max-ms)
    #[arg(long)]
    wave_delay_ms: Option<u64>,

    /// Upper bound for a random pause between waves, in milliseconds
    #[arg(long, requires = "wave_delay_ms")]
    wave_delay_max_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Seed for profile shuffling and random pauses
    #[arg(long)]
    seed: Option<u64>,

    // ========================================================================
    // Output Control
    // ========================================================================
    /// Report layout
    #[arg(long, value_enum)]
    report: Option<ReportKind>,

    /// Directory the report is written to
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Print the report as JSON on stdout instead of console progress
    #[arg(long)]
    json: bool,

    /// Verbose output (debug logs, per-session lines)
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Quiet mode (warnings and the final summary only)
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    quiet: bool,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run(args) => run(args).await,
        Commands::Profiles => {
            list_profiles();
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let verbosity = Verbosity::from_args(&args);
    init_tracing(verbosity);

    let config = build_config(&args)?;
    config.validate().context("invalid run configuration")?;

    // Console progress would corrupt the JSON document on stdout.
    let reporters: Vec<Box<dyn Reporter>> = if args.json {
        vec![Box::new(JsonReporter::stdout())]
    } else {
        vec![Box::new(
            ConsoleReporter::new().show_sessions(!verbosity.is_quiet()),
        )]
    };
    let reporter: Arc<dyn Reporter> = Arc::new(MultiReporter::new(reporters));

    let target = config.base_url.clone();
    let outcome = run_swarm(config, reporter)
        .await
        .with_context(|| format!("swarm against {} failed", target))?;

    if outcome.report.is_none() {
        tracing::warn!(waves = outcome.summary.waves, "no requests recorded");
    }
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

fn build_config(args: &RunArgs) -> Result<SwarmConfig> {
    let base = if args.mixed {
        SwarmConfig::mixed()
    } else {
        SwarmConfig::default()
    };
    let mut config = base.with_env();

    if let Some(url) = &args.url {
        config.base_url = url.clone();
    }
    if let Some(secs) = args.duration {
        config.duration = Duration::from_secs(secs);
    }
    if let Some(n) = args.sessions {
        config.sessions_per_wave = n;
    }
    if let Some(profile) = args.profile {
        config = config.profile(profile);
    }
    if let Some(mix) = args.mix {
        config = config.mix(mix);
    }
    match (args.wave_delay_ms, args.wave_delay_max_ms) {
        (Some(min), Some(max)) => {
            if max < min {
                bail!("--wave-delay-max-ms ({}) is below --wave-delay-ms ({})", max, min);
            }
            config.wave_delay =
                WaveDelay::Between(Duration::from_millis(min), Duration::from_millis(max));
        }
        (Some(ms), None) => config.wave_delay = WaveDelay::Fixed(Duration::from_millis(ms)),
        _ => {}
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(kind) = args.report {
        config.report = kind;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(email) = &args.email {
        config.credentials.email = email.clone();
    }
    if let Some(password) = &args.password {
        config.credentials.password = password.clone();
    }
    if args.remember {
        config.credentials.remember_me = true;
    }
    if let Some(login) = &args.login_path {
        config.routes.login = login.clone();
    }

    Ok(config)
}

fn list_profiles() {
    let routes = Routes::default();
    let mut rng = StdRng::seed_from_u64(0);
    for profile in BehaviorProfile::ALL {
        let script = profile.script(&routes, &mut rng);
        println!(
            "{} ({} steps, {} ms think time)",
            profile,
            script.steps.len(),
            script.think_time.as_millis()
        );
        for step in &script.steps {
            println!("  {:<4} {:<28} {}", step.method.as_str(), step.endpoint, step.label);
        }
    }
    println!();
    println!("Default mix: {}", ProfileMix::default());
}

// ============================================================================
// Verbosity Control
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn from_args(args: &RunArgs) -> Self {
        if args.quiet {
            Verbosity::Quiet
        } else if args.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn is_quiet(&self) -> bool {
        *self == Verbosity::Quiet
    }

    fn default_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "cntryl_swarm=debug,info",
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbosity: Verbosity) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| verbosity.default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
