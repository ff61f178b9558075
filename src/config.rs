//! Configuration for a swarm run.

use crate::error::{Result, SwarmError};
use crate::profile::{BehaviorProfile, ProfileMix};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Paths of the collaborator application the sessions navigate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Serves the login form on GET and accepts credentials on POST.
    pub login: String,
    pub dashboard: String,
    /// Paginated, searchable product listing.
    pub listing: String,
    pub create_form: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            dashboard: "/dashboard".to_string(),
            listing: "/produtos".to_string(),
            create_form: "/produtos/novo".to_string(),
        }
    }
}

/// Login form fields submitted by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "admin@gestokpro.com".to_string(),
            password: "admin".to_string(),
            remember_me: false,
        }
    }
}

/// Pause between the end of one wave and the next duration check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveDelay {
    Fixed(Duration),
    /// Uniformly random in `[min, max]`.
    Between(Duration, Duration),
}

impl WaveDelay {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            WaveDelay::Fixed(d) => d,
            WaveDelay::Between(min, max) if max > min => rng.gen_range(min..=max),
            WaveDelay::Between(min, _) => min,
        }
    }
}

impl Default for WaveDelay {
    fn default() -> Self {
        WaveDelay::Fixed(Duration::from_secs(2))
    }
}

/// Which report layout to produce at the end of the run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Summary, P50-P99, per-endpoint breakdown, last requests.
    #[default]
    Basic,
    /// Adds the wide percentile table, throughput, anomalies and recommendations.
    Advanced,
}

impl ReportKind {
    /// Mean latency above which an endpoint is listed for optimization.
    pub fn slow_endpoint_threshold_ms(&self) -> f64 {
        match self {
            ReportKind::Basic => 200.0,
            ReportKind::Advanced => 500.0,
        }
    }

    pub fn percentiles(&self) -> &'static [f64] {
        match self {
            ReportKind::Basic => &[50.0, 90.0, 95.0, 99.0],
            ReportKind::Advanced => &[10.0, 25.0, 50.0, 75.0, 80.0, 85.0, 90.0, 95.0, 99.0, 99.9],
        }
    }

    /// Artifact name prefix.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            ReportKind::Basic => "stress_test_report",
            ReportKind::Advanced => "advanced_stress_report",
        }
    }
}

/// Configuration for a swarm run.
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Root URL of the application under test.
    pub base_url: String,
    /// No new wave starts once this much time has passed.
    pub duration: Duration,
    pub sessions_per_wave: usize,
    /// Profile used by every session when `mix` is not set.
    pub profile: BehaviorProfile,
    /// Draw each session's profile from a weighted pool.
    pub mix: Option<ProfileMix>,
    pub wave_delay: WaveDelay,
    /// Per-request timeout.
    pub request_timeout: Duration,
    pub routes: Routes,
    pub credentials: Credentials,
    /// Directory the report artifact is written to.
    pub output_dir: PathBuf,
    pub report: ReportKind,
    /// Seed for profile shuffling and wave delays; random when unset.
    pub seed: Option<u64>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            duration: Duration::from_secs(30),
            sessions_per_wave: 3,
            profile: BehaviorProfile::Normal,
            mix: None,
            wave_delay: WaveDelay::default(),
            request_timeout: Duration::from_secs(30),
            routes: Routes::default(),
            credentials: Credentials::default(),
            output_dir: PathBuf::from("."),
            report: ReportKind::Basic,
            seed: None,
        }
    }
}

impl SwarmConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for a mixed-load run: 2:1:1 mix, 1-3s random pause, advanced report.
    pub fn mixed() -> Self {
        Self {
            duration: Duration::from_secs(45),
            sessions_per_wave: ProfileMix::default().total() as usize,
            mix: Some(ProfileMix::default()),
            wave_delay: WaveDelay::Between(Duration::from_secs(1), Duration::from_secs(3)),
            report: ReportKind::Advanced,
            ..Self::default()
        }
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `SWARM_BASE_URL`: target root URL
    /// - `SWARM_DURATION_SECS`: run duration bound
    /// - `SWARM_SESSIONS`: sessions per wave
    /// - `SWARM_PROFILE`: `normal`, `heavy` or `fast`
    /// - `SWARM_MIX`: weighted mix, e.g. `2:1:1`
    /// - `SWARM_WAVE_DELAY_MS`: fixed pause between waves
    /// - `SWARM_TIMEOUT_SECS`: per-request timeout
    /// - `SWARM_OUTPUT_DIR`: report directory
    /// - `SWARM_REPORT`: `basic` or `advanced`
    /// - `SWARM_EMAIL` / `SWARM_PASSWORD`: login credentials
    /// - `SWARM_SEED`: RNG seed
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay the `SWARM_*` environment variables on `self`.
    ///
    /// See [`from_env`](Self::from_env) for the variables read.
    pub fn with_env(self) -> Self {
        let mut cfg = self;

        if let Ok(v) = std::env::var("SWARM_BASE_URL") {
            cfg.base_url = v;
        }
        if let Ok(v) = std::env::var("SWARM_DURATION_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                cfg.duration = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("SWARM_SESSIONS") {
            if let Ok(n) = v.parse() {
                cfg.sessions_per_wave = n;
            }
        }
        if let Ok(v) = std::env::var("SWARM_PROFILE") {
            if let Ok(p) = v.parse() {
                cfg.profile = p;
            }
        }
        if let Ok(v) = std::env::var("SWARM_MIX") {
            if let Ok(mix) = v.parse() {
                cfg.mix = Some(mix);
            }
        }
        if let Ok(v) = std::env::var("SWARM_WAVE_DELAY_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                cfg.wave_delay = WaveDelay::Fixed(Duration::from_millis(ms));
            }
        }
        if let Ok(v) = std::env::var("SWARM_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                cfg.request_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("SWARM_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SWARM_REPORT") {
            match v.to_ascii_lowercase().as_str() {
                "basic" => cfg.report = ReportKind::Basic,
                "advanced" => cfg.report = ReportKind::Advanced,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("SWARM_EMAIL") {
            cfg.credentials.email = v;
        }
        if let Ok(v) = std::env::var("SWARM_PASSWORD") {
            cfg.credentials.password = v;
        }
        if let Ok(v) = std::env::var("SWARM_SEED") {
            if let Ok(seed) = v.parse() {
                cfg.seed = Some(seed);
            }
        }

        cfg
    }

    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the run duration bound.
    pub fn duration(mut self, d: Duration) -> Self {
        self.duration = d;
        self
    }

    /// Set sessions per wave.
    pub fn sessions_per_wave(mut self, n: usize) -> Self {
        self.sessions_per_wave = n;
        self
    }

    /// Use a single profile for every session.
    pub fn profile(mut self, profile: BehaviorProfile) -> Self {
        self.profile = profile;
        self.mix = None;
        self
    }

    /// Draw profiles from a weighted mix.
    pub fn mix(mut self, mix: ProfileMix) -> Self {
        self.mix = Some(mix);
        self
    }

    /// Set the inter-wave delay.
    pub fn wave_delay(mut self, delay: WaveDelay) -> Self {
        self.wave_delay = delay;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout = d;
        self
    }

    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the report output directory.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn report(mut self, kind: ReportKind) -> Self {
        self.report = kind;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject parameters that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| SwarmError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SwarmError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.sessions_per_wave == 0 {
            return Err(SwarmError::InvalidConfig(
                "sessions per wave must be at least 1".to_string(),
            ));
        }
        if self.duration.is_zero() {
            return Err(SwarmError::InvalidConfig(
                "duration must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(SwarmError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(mix) = &self.mix {
            if mix.is_empty() {
                return Err(SwarmError::InvalidConfig(
                    "profile mix must have at least one non-zero weight".to_string(),
                ));
            }
        }
        if let WaveDelay::Between(min, max) = self.wave_delay {
            if min > max {
                return Err(SwarmError::InvalidConfig(format!(
                    "wave delay range is inverted ({:?} > {:?})",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    // The process environment is shared by every test thread.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 12] = [
        "SWARM_BASE_URL",
        "SWARM_DURATION_SECS",
        "SWARM_SESSIONS",
        "SWARM_PROFILE",
        "SWARM_MIX",
        "SWARM_WAVE_DELAY_MS",
        "SWARM_TIMEOUT_SECS",
        "SWARM_OUTPUT_DIR",
        "SWARM_REPORT",
        "SWARM_EMAIL",
        "SWARM_PASSWORD",
        "SWARM_SEED",
    ];

    fn with_vars<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for name in VARS {
            std::env::remove_var(name);
        }
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        let out = f();
        for name in VARS {
            std::env::remove_var(name);
        }
        out
    }

    #[test]
    fn should_apply_env_vars_when_set() {
        let cfg = with_vars(
            &[
                ("SWARM_BASE_URL", "http://staging:8000"),
                ("SWARM_DURATION_SECS", "90"),
                ("SWARM_SESSIONS", "7"),
                ("SWARM_PROFILE", "heavy"),
                ("SWARM_MIX", "3:0:1"),
                ("SWARM_WAVE_DELAY_MS", "250"),
                ("SWARM_TIMEOUT_SECS", "4"),
                ("SWARM_OUTPUT_DIR", "/tmp/reports"),
                ("SWARM_REPORT", "Advanced"),
                ("SWARM_EMAIL", "ops@example.com"),
                ("SWARM_PASSWORD", "s3cret"),
                ("SWARM_SEED", "99"),
            ],
            SwarmConfig::from_env,
        );

        assert_eq!(cfg.base_url, "http://staging:8000");
        assert_eq!(cfg.duration, Duration::from_secs(90));
        assert_eq!(cfg.sessions_per_wave, 7);
        assert_eq!(cfg.profile, BehaviorProfile::Heavy);
        assert_eq!(cfg.mix, Some(ProfileMix::new(3, 0, 1)));
        assert_eq!(cfg.wave_delay, WaveDelay::Fixed(Duration::from_millis(250)));
        assert_eq!(cfg.request_timeout, Duration::from_secs(4));
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(cfg.report, ReportKind::Advanced);
        assert_eq!(cfg.credentials.email, "ops@example.com");
        assert_eq!(cfg.credentials.password, "s3cret");
        assert_eq!(cfg.seed, Some(99));
    }

    #[test]
    fn should_keep_defaults_when_env_values_unparseable() {
        let cfg = with_vars(
            &[
                ("SWARM_DURATION_SECS", "soon"),
                ("SWARM_SESSIONS", "-3"),
                ("SWARM_PROFILE", "sleepy"),
                ("SWARM_MIX", "2:x:1"),
                ("SWARM_WAVE_DELAY_MS", "1.5"),
                ("SWARM_TIMEOUT_SECS", ""),
                ("SWARM_REPORT", "verbose"),
                ("SWARM_SEED", "abc"),
            ],
            SwarmConfig::from_env,
        );
        let defaults = SwarmConfig::default();

        assert_eq!(cfg.duration, defaults.duration);
        assert_eq!(cfg.sessions_per_wave, defaults.sessions_per_wave);
        assert_eq!(cfg.profile, defaults.profile);
        assert_eq!(cfg.mix, None);
        assert_eq!(cfg.wave_delay, defaults.wave_delay);
        assert_eq!(cfg.request_timeout, defaults.request_timeout);
        assert_eq!(cfg.report, defaults.report);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn should_overlay_env_on_mixed_preset() {
        let cfg = with_vars(&[("SWARM_SESSIONS", "8")], || SwarmConfig::mixed().with_env());

        assert_eq!(cfg.sessions_per_wave, 8);
        assert_eq!(cfg.mix, Some(ProfileMix::default()));
        assert_eq!(cfg.report, ReportKind::Advanced);
    }

    #[test]
    fn should_use_defaults_when_env_not_set() {
        let cfg = SwarmConfig::default();
        assert_eq!(cfg.base_url, "http://localhost:5000");
        assert_eq!(cfg.sessions_per_wave, 3);
        assert_eq!(cfg.wave_delay, WaveDelay::Fixed(Duration::from_secs(2)));
        assert!(cfg.mix.is_none());
        assert_eq!(cfg.report, ReportKind::Basic);
    }

    #[test]
    fn should_build_config_with_builder() {
        let cfg = SwarmConfig::new()
            .base_url("http://app:8080/")
            .duration(Duration::from_secs(10))
            .sessions_per_wave(5)
            .profile(BehaviorProfile::Fast)
            .report(ReportKind::Advanced)
            .seed(42);

        assert_eq!(cfg.duration, Duration::from_secs(10));
        assert_eq!(cfg.sessions_per_wave, 5);
        assert_eq!(cfg.profile, BehaviorProfile::Fast);
        assert_eq!(cfg.report, ReportKind::Advanced);
        assert_eq!(cfg.seed, Some(42));
    }

    #[test]
    fn should_use_mixed_defaults() {
        let cfg = SwarmConfig::mixed();
        assert_eq!(cfg.mix, Some(ProfileMix::default()));
        assert_eq!(cfg.sessions_per_wave, 4);
        assert_eq!(cfg.report, ReportKind::Advanced);
    }

    #[test]
    fn should_reject_zero_sessions() {
        let cfg = SwarmConfig::new().sessions_per_wave(0);
        assert!(matches!(cfg.validate(), Err(SwarmError::InvalidConfig(_))));
    }

    #[test]
    fn should_reject_base_url_when_not_http() {
        let cfg = SwarmConfig::new().base_url("not a url");
        assert!(matches!(
            cfg.validate(),
            Err(SwarmError::InvalidBaseUrl { .. })
        ));
        let cfg = SwarmConfig::new().base_url("ftp://host");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn should_reject_zero_duration() {
        let cfg = SwarmConfig::new().duration(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(SwarmConfig::default().validate().is_ok());
        assert!(SwarmConfig::mixed().validate().is_ok());
    }

    #[test]
    fn should_sample_delay_within_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let delay = WaveDelay::Between(Duration::from_secs(1), Duration::from_secs(3));
        for _ in 0..100 {
            let d = delay.sample(&mut rng);
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(3));
        }
        assert_eq!(
            WaveDelay::Fixed(Duration::from_millis(5)).sample(&mut rng),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn should_pick_thresholds_per_report_kind() {
        assert_eq!(ReportKind::Basic.slow_endpoint_threshold_ms(), 200.0);
        assert_eq!(ReportKind::Advanced.slow_endpoint_threshold_ms(), 500.0);
        assert_eq!(ReportKind::Basic.percentiles().len(), 4);
        assert_eq!(ReportKind::Advanced.percentiles().len(), 10);
    }
}
