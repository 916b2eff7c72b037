mod support;

use anyhow::Result;
use loadtest_client::response::Verdict;
use loadtest_client::scenario::fixture::UserFixture;
use loadtest_client::scenario::tasks::{
    get_platform_by_location, hello_world, upload_file, FILE_UPLOAD, HELLO_WORLD,
};
use loadtest_client::scenario::user::{SimulatedUser, UserExit};
use loadtest_client::scenario::{ScenarioDefinition, TaskOutcome};
use loadtest_client::stats::StatsCollector;
use loadtest_client::swarm::seed::rng_for;
use loadtest_client::TaskError;
use loadtest_env::{LoadTestConfig, ScenarioConfig};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::{Recorded, RecordingSession};
use tokio::sync::watch;
use uuid::Uuid;

fn scenario_for(fixture: &Path) -> ScenarioConfig {
    let mut s = LoadTestConfig::default().scenario;
    s.fixture_path = fixture.to_string_lossy().into_owned();
    s
}

fn fixture_file(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "{}", contents).unwrap();
    f
}

fn reported(outcome: TaskOutcome) -> loadtest_client::response::RequestOutcome {
    match outcome {
        TaskOutcome::Reported(o) => o,
        other => panic!("expected a reported outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_sends_one_multipart_post() -> Result<()> {
    support::setup_logger();
    let file = fixture_file("platform:/ru,/ru/svrd");
    let fixture = UserFixture::on_start(&scenario_for(file.path()))?;

    for status in [200u16, 201, 202] {
        let session = RecordingSession::new().with_status("/api/upload", status);
        let outcome = reported(upload_file(&session, &fixture).await?);
        assert_eq!(outcome.name, FILE_UPLOAD);
        assert_eq!(outcome.verdict, Verdict::Success);

        let calls = session.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Recorded::Post { path, file } => {
                assert_eq!(path, "/api/upload");
                assert_eq!(file.field, "file");
                assert_eq!(file.file_name, "data.txt");
                assert_eq!(file.content_type, "text/plain");
                assert_eq!(file.bytes, b"platform:/ru,/ru/svrd");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_upload_failure_status_is_reported() -> Result<()> {
    let file = fixture_file("x");
    let fixture = UserFixture::on_start(&scenario_for(file.path()))?;
    let session = RecordingSession::new().with_status("/api/upload", 500);

    let outcome = reported(upload_file(&session, &fixture).await?);
    assert_eq!(outcome.status, 500);
    assert_eq!(outcome.verdict, Verdict::Failure("Upload failed: 500".into()));
    Ok(())
}

#[tokio::test]
async fn test_upload_without_fixture_sends_nothing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fixture = UserFixture::on_start(&scenario_for(&dir.path().join("data.txt")))?;
    let session = RecordingSession::new();

    for _ in 0..100 {
        assert_eq!(upload_file(&session, &fixture).await?, TaskOutcome::Skipped);
    }
    assert!(session.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_upload_error_is_isolated() -> Result<()> {
    support::setup_logger();
    let file = fixture_file("x");
    let path = file.path().to_path_buf();
    let fixture = UserFixture::on_start(&scenario_for(&path))?;
    // gone between the startup check and the task
    drop(file);

    let session = RecordingSession::new();
    match upload_file(&session, &fixture).await? {
        TaskOutcome::Isolated { name, .. } => assert_eq!(name, FILE_UPLOAD),
        other => panic!("expected isolated fault, got {:?}", other),
    }
    assert!(session.calls().is_empty());

    // transport errors are isolated too
    let file = fixture_file("x");
    let fixture = UserFixture::on_start(&scenario_for(file.path()))?;
    let outcome = upload_file(&RecordingSession::broken(), &fixture).await?;
    assert!(matches!(outcome, TaskOutcome::Isolated { .. }));
    Ok(())
}

#[tokio::test]
async fn test_homepage_verdict_follows_status() -> Result<()> {
    let ok = reported(hello_world(&RecordingSession::new()).await?);
    assert_eq!(ok.name, HELLO_WORLD);
    assert_eq!(ok.verdict, Verdict::Success);

    let session = RecordingSession::new().with_status("/", 404);
    let missing = reported(hello_world(&session).await?);
    assert_eq!(
        missing.verdict,
        Verdict::Failure("Failed with status 404".into())
    );
    assert_eq!(session.calls(), vec![Recorded::Get("/".into())]);
    Ok(())
}

#[tokio::test]
async fn test_homepage_transport_error_propagates() {
    let err = hello_world(&RecordingSession::broken()).await.err().unwrap();
    assert!(matches!(err, TaskError::Transport(_)));
}

#[tokio::test]
async fn test_search_picks_candidates_uniformly() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fixture = UserFixture::on_start(&scenario_for(&dir.path().join("data.txt")))?;
    let session = RecordingSession::new();
    let mut rng = rng_for(42, "search");

    let n = 1000;
    for _ in 0..n {
        let outcome = reported(get_platform_by_location(&session, &fixture, &mut rng).await?);
        assert!(outcome.is_success());
    }

    let mut counts: HashMap<String, u32> = HashMap::new();
    for call in session.calls() {
        let Recorded::Get(path) = call else {
            panic!("search must only GET");
        };
        let location = path
            .strip_prefix("/api/search?location=")
            .expect("search path")
            .to_string();
        *counts.entry(location).or_insert(0) += 1;
    }

    assert_eq!(counts.len(), 3);
    for loc in ["ru", "ru/svrd", "ru/chelobl"] {
        let share = counts[loc] as f64 / n as f64;
        assert!((share - 1.0 / 3.0).abs() < 0.06, "{} share {}", loc, share);
    }
    Ok(())
}

#[tokio::test]
async fn test_search_failure_names_location() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut scenario = scenario_for(&dir.path().join("data.txt"));
    scenario.locations = vec!["ru/svrd".to_string()];
    let fixture = UserFixture::on_start(&scenario)?;
    let session = RecordingSession::new().with_status("/api/search", 400);

    let outcome = reported(get_platform_by_location(&session, &fixture, &mut rng_for(1, "s")).await?);
    assert_eq!(
        outcome.verdict,
        Verdict::Failure("Search failed for ru/svrd: 400".into())
    );
    Ok(())
}

fn start_user(
    scenario: &ScenarioConfig,
    session: RecordingSession,
    stats: &StatsCollector,
) -> Result<SimulatedUser> {
    let def = Arc::new(ScenarioDefinition::from_config(scenario)?);
    Ok(SimulatedUser::start(
        Uuid::nil(),
        def,
        Box::new(session),
        rng_for(5, "user/0"),
        stats.clone(),
    )?)
}

#[tokio::test]
async fn test_user_keeps_cycling_after_upload_error() -> Result<()> {
    support::setup_logger();
    let file = fixture_file("x");
    let scenario = scenario_for(file.path());
    let stats = StatsCollector::new();
    let mut user = start_user(&scenario, RecordingSession::new(), &stats)?;
    assert!(user.fixture().file_exists());
    drop(file);

    for _ in 0..60 {
        user.step().await?;
    }

    let report = stats.report();
    assert!(report.isolated_faults > 0);
    // swallowed errors stay out of pass/fail by default
    assert!(report.get(FILE_UPLOAD).is_none());
    assert!(report.get(HELLO_WORLD).is_some());
    assert_eq!(report.total_failures(), 0);
    Ok(())
}

#[tokio::test]
async fn test_isolated_faults_can_be_reported_as_failures() -> Result<()> {
    let file = fixture_file("x");
    let mut scenario = scenario_for(file.path());
    scenario.report_isolated_faults = true;
    let stats = StatsCollector::new();
    let mut user = start_user(&scenario, RecordingSession::new(), &stats)?;
    drop(file);

    for _ in 0..60 {
        user.step().await?;
    }

    let report = stats.report();
    let upload = report.get(FILE_UPLOAD).expect("upload failures recorded");
    assert_eq!(upload.failures, report.isolated_faults);
    assert_eq!(upload.successes, 0);
    Ok(())
}

#[tokio::test]
async fn test_user_aborts_on_unhandled_transport_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut scenario = scenario_for(&dir.path().join("data.txt"));
    scenario.wait_min_secs = 0.01;
    scenario.wait_max_secs = 0.02;
    let stats = StatsCollector::new();
    let user = start_user(&scenario, RecordingSession::broken(), &stats)?;

    let (_stop_tx, stop_rx) = watch::channel(false);
    let exit = tokio::time::timeout(Duration::from_secs(5), user.run(stop_rx)).await?;
    assert!(matches!(exit, UserExit::Aborted(TaskError::Transport(_))));
    assert_eq!(stats.report().aborted_users, 1);
    Ok(())
}

#[tokio::test]
async fn test_user_stops_during_wait() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut scenario = scenario_for(&dir.path().join("data.txt"));
    scenario.wait_min_secs = 30.0;
    scenario.wait_max_secs = 30.0;
    let stats = StatsCollector::new();
    let session = RecordingSession::new();
    let user = start_user(&scenario, session.clone(), &stats)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(user.run(stop_rx));
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(true)?;

    let exit = tokio::time::timeout(Duration::from_secs(2), handle).await??;
    assert!(matches!(exit, UserExit::Stopped));
    // exactly one cycle ran before the long wait; upload is skipped without a fixture
    assert!(session.calls().len() <= 1);
    Ok(())
}

#[test]
fn test_startup_check_error_fails_user_start() {
    let file = fixture_file("x");
    let scenario = scenario_for(&file.path().join("data.txt"));
    let stats = StatsCollector::new();
    let err = start_user(&scenario, RecordingSession::new(), &stats)
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<TaskError>(),
        Some(TaskError::Startup { .. })
    ));
    assert_eq!(stats.report().started_users, 0);
}
