#![allow(dead_code)]

use cntryl_swarm::{
    BehaviorProfile, Report, Reporter, RunSummary, SessionId, SessionOutcome, SwarmConfig,
    WaveDelay,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "IjQ2ZDk.tok-123";
pub const SESSION_COOKIE: &str = "session=abc123";

pub fn login_page() -> String {
    format!(
        r#"<html><body><form method="post">
<input id="csrf_token" name="csrf_token" type="hidden" value="{}">
<input name="email"><input name="password" type="password">
</form></body></html>"#,
        TOKEN
    )
}

/// URL of a local port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn config_for(server: &MockServer) -> SwarmConfig {
    SwarmConfig::default()
        .base_url(server.uri())
        .profile(BehaviorProfile::Fast)
        .wave_delay(WaveDelay::Fixed(Duration::from_millis(50)))
        .request_timeout(Duration::from_secs(5))
}

/// Login form with a token, a login submission that sets a session cookie,
/// and authenticated pages that only answer when the cookie comes back.
pub async fn mount_app(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("csrf_token=IjQ2ZDk.tok-123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; Path=/", SESSION_COOKIE)),
        )
        .mount(server)
        .await;

    for route in ["/dashboard", "/produtos", "/produtos/novo"] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("cookie", SESSION_COOKIE))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(server)
            .await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RunStart,
    Wave(u64, usize),
    Session(SessionId, BehaviorProfile, SessionOutcome),
    RunEnd(u64, usize),
    Written(PathBuf),
    NoSamples,
}

/// Remembers every event it sees.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, e: Event) {
        self.events.lock().unwrap().push(e);
    }
}

impl Reporter for RecordingReporter {
    fn run_start(&self, _config: &SwarmConfig) {
        self.push(Event::RunStart);
    }

    fn wave_start(&self, wave: u64, profiles: &[BehaviorProfile]) {
        self.push(Event::Wave(wave, profiles.len()));
    }

    fn session_end(&self, id: SessionId, profile: BehaviorProfile, outcome: &SessionOutcome) {
        self.push(Event::Session(id, profile, outcome.clone()));
    }

    fn run_end(&self, summary: &RunSummary, samples: usize) {
        self.push(Event::RunEnd(summary.waves, samples));
    }

    fn report_written(&self, _report: &Report, path: &Path) {
        self.push(Event::Written(path.to_path_buf()));
    }

    fn no_samples(&self) {
        self.push(Event::NoSamples);
    }
}
