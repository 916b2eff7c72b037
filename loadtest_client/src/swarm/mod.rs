use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use loadtest_env::{LoadTestConfig, StartupFailurePolicy};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::scenario::user::{SimulatedUser, UserExit};
use crate::scenario::ScenarioDefinition;
use crate::session::{HttpSession, ReqwestSession};
use crate::stats::StatsCollector;
use crate::swarm::manifest::{save_run_summary, RunSummary, UserExitCounts};
use crate::swarm::schedule::spawn_schedule_constant;
use crate::swarm::seed::{user_rng, uuid_for};
use crate::TaskError;

pub mod manifest;
pub mod schedule;
pub mod seed;
pub mod weighted;

/// Builds the HTTP session for user `index`.
pub type SessionFactory =
    Arc<dyn Fn(u64) -> Result<Box<dyn HttpSession>, TaskError> + Send + Sync>;

fn resolve_seed(cfg: &LoadTestConfig) -> u64 {
    cfg.swarm
        .seed
        .or_else(loadtest_env::env::swarm_seed)
        .unwrap_or(42)
}

/// Run the scenario against `target.host` with real HTTP sessions.
pub async fn run_swarm(cfg: &LoadTestConfig) -> anyhow::Result<RunSummary> {
    let host = cfg.target.host.clone();
    let timeout = cfg.target.request_timeout_secs.map(Duration::from_secs);
    let factory: SessionFactory = Arc::new(
        move |_index: u64| -> Result<Box<dyn HttpSession>, TaskError> {
            let session = ReqwestSession::new(&host, timeout)?;
            Ok(Box::new(session))
        },
    );
    run_swarm_with(cfg, factory).await
}

pub async fn run_swarm_with(
    cfg: &LoadTestConfig,
    make_session: SessionFactory,
) -> anyhow::Result<RunSummary> {
    cfg.validate()?;
    let seed = resolve_seed(cfg);
    let scenario = Arc::new(ScenarioDefinition::from_config(&cfg.scenario)?);
    let policy = cfg.scenario.startup_failure_policy;

    info!(
        "Starting swarm: target={}, users={}, spawn_rate={}/s, run_time={}s, seed={}",
        cfg.target.host, cfg.swarm.users, cfg.swarm.spawn_rate, cfg.swarm.run_time_secs, seed
    );

    let (wait_min, wait_max) = scenario.wait_bounds();
    for (name, p) in scenario.task_mix() {
        info!("Task mix: {} {:.1}%", name, p * 100.0);
    }
    info!("Wait between tasks: {:?}..{:?}", wait_min, wait_max);

    let stats = StatsCollector::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let schedule_ms =
        spawn_schedule_constant(seed, "swarm", cfg.swarm.users, cfg.swarm.spawn_rate, 0)?;

    let t0 = Instant::now();
    let mut handles = Vec::with_capacity(schedule_ms.len());
    for (i, ms) in schedule_ms.iter().enumerate() {
        let index = i as u64;
        let when = t0 + Duration::from_millis(*ms);
        let scenario = scenario.clone();
        let stats = stats.clone();
        let make_session = make_session.clone();
        let stop_tx = stop_tx.clone();
        let mut stop_rx = stop_rx.clone();

        handles.push(tokio::spawn(async move {
            // honor the spawn schedule, but never start a user after stop
            tokio::select! {
                _ = tokio::time::sleep_until(when.into()) => {}
                _ = stop_rx.changed() => return UserExit::Stopped,
            }
            let stopped = *stop_rx.borrow();
            if stopped {
                return UserExit::Stopped;
            }

            let user_id = uuid_for(seed, "user", index);
            let rng = user_rng(seed, index);
            let started = make_session(index).and_then(|session| {
                SimulatedUser::start(user_id, scenario, session, rng, stats.clone())
            });

            match started {
                Ok(user) => user.run(stop_rx).await,
                Err(e) => {
                    error!("[{}] startup failed: {}", user_id, e);
                    stats.user_aborted();
                    if policy == StartupFailurePolicy::AbortRun {
                        warn!("Startup failure policy is abort_run, stopping the run");
                        let _ = stop_tx.send(true);
                    }
                    UserExit::StartupFailed(e)
                }
            }
        }));
    }

    // Hold the run window, or less if a user stopped the run
    let window = Duration::from_secs(cfg.swarm.run_time_secs);
    info!("Swarm run window: {:?}", window);
    let mut window_rx = stop_rx.clone();
    let stopped_early = tokio::select! {
        _ = tokio::time::sleep(window) => false,
        _ = window_rx.changed() => true,
    };
    if stopped_early {
        warn!("Run stopped before the window elapsed");
    }
    let _ = stop_tx.send(true);

    // in-flight requests may finish until the grace deadline, then the user is cancelled
    let grace = Duration::from_secs(cfg.swarm.stop_grace_secs);
    let deadline = tokio::time::Instant::now() + grace;
    let mut user_exits = UserExitCounts::default();
    for mut handle in handles {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(UserExit::Stopped)) => user_exits.stopped += 1,
            Ok(Ok(UserExit::Aborted(_))) => user_exits.aborted += 1,
            Ok(Ok(UserExit::StartupFailed(_))) => user_exits.startup_failed += 1,
            Ok(Err(e)) => {
                warn!("user task panicked: {}", e);
                user_exits.aborted += 1;
            }
            Err(_) => {
                handle.abort();
                user_exits.cancelled += 1;
            }
        }
    }
    if user_exits.cancelled > 0 {
        warn!(
            "{} users still had a request in flight after {:?}, cancelled",
            user_exits.cancelled, grace
        );
    }

    let report = stats.report();
    info!(
        "Swarm finished: {} requests, {} failures, {} isolated faults",
        report.total_requests(),
        report.total_failures(),
        report.isolated_faults
    );

    let summary = RunSummary {
        timestamp: chrono::Utc::now(),
        seed,
        config: cfg.clone(),
        stats: report,
        user_exits,
        stopped_early,
    };

    if let Some(out_path) = cfg.swarm.result_path.as_deref() {
        if let Err(e) = save_run_summary(Path::new(out_path), &summary) {
            warn!("Failed to save run summary to {}: {}", out_path, e);
        } else {
            info!("Saved run summary to {}", out_path);
        }
    }

    Ok(summary)
}
