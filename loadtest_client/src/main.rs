use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use loadtest_client::{setup_logger, swarm};
use loadtest_env::{LoadTestConfig, StartupFailurePolicy};
use tracing::{info, warn};

/// Drive the ad platform service with weighted simulated users.
#[derive(Parser, Debug)]
#[command(name = "loadtest", version, about)]
struct Cli {
    /// Extra TOML configuration file, applied over defaults and the user config dir
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// One user for ten seconds with debug logs (ignores --config)
    #[arg(long)]
    smoke: bool,

    /// Target base URL, e.g. http://localhost:5001
    #[arg(long)]
    host: Option<String>,

    /// Number of simulated users
    #[arg(short, long)]
    users: Option<u64>,

    /// Users started per second
    #[arg(short = 'r', long)]
    spawn_rate: Option<f64>,

    /// Run window in seconds
    #[arg(short = 't', long)]
    run_time: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Upload fixture path
    #[arg(long)]
    fixture: Option<String>,

    /// Stop the whole run when a user's startup check fails
    #[arg(long)]
    abort_run_on_startup_failure: bool,

    /// Count swallowed upload errors as failed requests
    #[arg(long)]
    report_isolated_faults: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    result: Option<String>,

    /// Write the default configuration to the user config dir and exit
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    fn apply(&self, cfg: &mut LoadTestConfig) {
        if let Some(host) = &self.host {
            cfg.target.host = host.clone();
        }
        if let Some(users) = self.users {
            cfg.swarm.users = users;
        }
        if let Some(rate) = self.spawn_rate {
            cfg.swarm.spawn_rate = rate;
        }
        if let Some(t) = self.run_time {
            cfg.swarm.run_time_secs = t;
        }
        if let Some(seed) = self.seed {
            cfg.swarm.seed = Some(seed);
        }
        if let Some(fixture) = &self.fixture {
            cfg.scenario.fixture_path = fixture.clone();
        }
        if self.abort_run_on_startup_failure {
            cfg.scenario.startup_failure_policy = StartupFailurePolicy::AbortRun;
        }
        if self.report_isolated_faults {
            cfg.scenario.report_isolated_faults = true;
        }
        if let Some(result) = &self.result {
            cfg.swarm.result_path = Some(result.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    loadtest_env::init()?;

    if cli.write_default_config {
        loadtest_env::create_default_config()?;
        return Ok(());
    }

    let mut cfg = if cli.smoke {
        LoadTestConfig::smoke()
    } else {
        LoadTestConfig::load_with(cli.config.as_deref())?
    };
    cli.apply(&mut cfg);

    let _guard = setup_logger(&cfg.logging);
    info!("Target host: {}", cfg.target.host);

    let summary = swarm::run_swarm(&cfg).await?;
    println!("\n{}", summary.stats);

    if !summary.passed() {
        warn!(
            "Run finished with {} failed requests, {} aborted users, {} startup failures (stopped early: {})",
            summary.stats.total_failures(),
            summary.user_exits.aborted,
            summary.user_exits.startup_failed,
            summary.stopped_early
        );
        bail!("load test did not pass");
    }
    Ok(())
}
