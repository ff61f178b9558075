mod common;

use cntryl_swarm::{
    run_swarm, BehaviorProfile, Grade, ReportKind, SilentReporter, SwarmError, WaveDelay,
};
use common::{Event, RecordingReporter};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn should_write_advanced_report_after_run() {
    let server = MockServer::start().await;
    common::mount_app(&server).await;
    let out = tempfile::tempdir().unwrap();
    let config = common::config_for(&server)
        .duration(Duration::from_millis(300))
        .sessions_per_wave(2)
        .report(ReportKind::Advanced)
        .output_dir(out.path());
    let reporter = Arc::new(RecordingReporter::default());

    let outcome = run_swarm(config, reporter.clone()).await.unwrap();

    assert!(outcome.summary.waves >= 1);
    assert_eq!(outcome.summary.sessions as u64, outcome.summary.waves * 2);
    // Fast sessions: login, three steps.
    assert_eq!(outcome.samples, outcome.summary.sessions * 4);

    let path = outcome.report_path.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("advanced_stress_report_"));
    assert!(name.ends_with(".md"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains(&format!("- **Total de Requests:** {}\n", outcome.samples)));
    assert!(text.contains("- **Taxa de Sucesso:** 100.0%\n"));
    assert!(text.contains("- **Tempo de Resposta Médio:** "));

    let events = reporter.events();
    assert_eq!(events.first(), Some(&Event::RunStart));
    assert_eq!(events.last(), Some(&Event::Written(path.clone())));
    let sessions = events
        .iter()
        .filter(|e| matches!(e, Event::Session(..)))
        .count();
    assert_eq!(sessions, outcome.summary.sessions);
}

#[tokio::test]
async fn should_report_total_failure_when_every_login_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let out = tempfile::tempdir().unwrap();
    let config = common::config_for(&server)
        .duration(Duration::from_millis(1))
        .sessions_per_wave(3)
        .output_dir(out.path());

    let outcome = run_swarm(config, Arc::new(SilentReporter)).await.unwrap();

    assert_eq!(outcome.summary.waves, 1);
    assert_eq!(outcome.samples, 3);
    let report = outcome.report.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.success_rate, 0.0);
    assert_eq!(report.grade, Grade::TotalFailure);
    assert!(report.anomalies.is_empty());

    let text = std::fs::read_to_string(outcome.report_path.unwrap()).unwrap();
    assert!(text.contains("- **Taxa de Sucesso:** 0.0%\n"));
    assert!(text.contains("FALHA TOTAL"));
}

#[tokio::test]
async fn should_report_total_failure_when_credentials_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::login_page()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let out = tempfile::tempdir().unwrap();
    let config = common::config_for(&server)
        .duration(Duration::from_millis(1))
        .sessions_per_wave(3)
        .output_dir(out.path());

    let outcome = run_swarm(config, Arc::new(SilentReporter)).await.unwrap();

    assert_eq!(outcome.summary.waves, 1);
    assert_eq!(outcome.samples, 3);
    let report = outcome.report.unwrap();
    assert_eq!(report.successes, 0);
    assert_eq!(report.success_rate, 0.0);
    assert_eq!(report.status_codes.get(&401), Some(&3));
    assert_eq!(report.grade, Grade::TotalFailure);
    assert!(report.anomalies.is_empty());
}

#[tokio::test]
async fn should_mix_profiles_within_each_wave() {
    let server = MockServer::start().await;
    common::mount_app(&server).await;
    let out = tempfile::tempdir().unwrap();
    let config = common::config_for(&server)
        .mix(Default::default())
        .duration(Duration::from_millis(1))
        .sessions_per_wave(4)
        .wave_delay(WaveDelay::Fixed(Duration::ZERO))
        .seed(42)
        .output_dir(out.path());
    let reporter = Arc::new(RecordingReporter::default());

    let outcome = run_swarm(config, reporter.clone()).await.unwrap();

    assert_eq!(outcome.summary.waves, 1);
    let mut profiles: Vec<_> = reporter
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Session(_, profile, outcome) => {
                assert!(outcome.logged_in());
                Some(profile)
            }
            _ => None,
        })
        .collect();
    profiles.sort_by_key(|p| p.name());
    assert_eq!(
        profiles,
        vec![
            BehaviorProfile::Fast,
            BehaviorProfile::Heavy,
            BehaviorProfile::Normal,
            BehaviorProfile::Normal,
        ]
    );
    // 2 normal (1 + 5), 1 heavy (1 + 9), 1 fast (1 + 3).
    assert_eq!(outcome.samples, 6 + 6 + 10 + 4);
}

#[tokio::test]
async fn should_fail_before_first_wave_when_target_unreachable() {
    let out = tempfile::tempdir().unwrap();
    let config = cntryl_swarm::SwarmConfig::default()
        .base_url(common::closed_port_url())
        .output_dir(out.path());
    let reporter = Arc::new(RecordingReporter::default());

    let err = run_swarm(config, reporter.clone()).await.unwrap_err();

    assert!(matches!(err, SwarmError::Unreachable { .. }));
    assert!(reporter.events().is_empty());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn should_reject_invalid_base_url() {
    let config = cntryl_swarm::SwarmConfig::default().base_url("ftp://localhost/");
    let err = run_swarm(config, Arc::new(SilentReporter)).await.unwrap_err();
    assert!(matches!(err, SwarmError::InvalidBaseUrl { .. }));
}
