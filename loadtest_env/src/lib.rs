use anyhow::{bail, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load test configuration shared by the client binary and its tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestConfig {
    pub target: TargetConfig,
    pub scenario: ScenarioConfig,
    pub swarm: SwarmSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the service under test, e.g. http://localhost:5001
    pub host: String,
    /// Per-request timeout for the HTTP client. None leaves the client default.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub wait_min_secs: f64,
    pub wait_max_secs: f64,
    pub weights: TaskWeights,
    pub fixture_path: String,
    pub locations: Vec<String>,
    pub startup_failure_policy: StartupFailurePolicy,
    /// Count swallowed upload errors as failures instead of only tallying them.
    pub report_isolated_faults: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskWeights {
    pub homepage: u32,
    pub upload: u32,
    pub search: u32,
}

/// What happens when the startup fixture check itself errors (not merely a missing file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupFailurePolicy {
    /// Only the affected simulated user stops.
    AbortUser,
    /// The whole run is stopped.
    AbortRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmSettings {
    pub users: u64,
    /// Users started per second.
    pub spawn_rate: f64,
    pub run_time_secs: u64,
    pub seed: Option<u64>,
    /// Optional JSON summary output path.
    pub result_path: Option<String>,
    /// How long users may finish in-flight requests after stop before they are cancelled.
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
}

fn default_stop_grace_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub filename: String,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig {
                host: "http://localhost:5001".to_string(),
                request_timeout_secs: None,
            },
            scenario: ScenarioConfig {
                wait_min_secs: 0.5,
                wait_max_secs: 3.0,
                weights: TaskWeights {
                    homepage: 1,
                    upload: 2,
                    search: 3,
                },
                fixture_path: "/root/TestAPI/TestAPI.PythonTests/TestData/data.txt".to_string(),
                locations: vec![
                    "ru".to_string(),
                    "ru/svrd".to_string(),
                    "ru/chelobl".to_string(),
                ],
                startup_failure_policy: StartupFailurePolicy::AbortUser,
                report_isolated_faults: false,
            },
            swarm: SwarmSettings {
                users: 10,
                spawn_rate: 2.0,
                run_time_secs: 60,
                seed: None,
                result_path: None,
                stop_grace_secs: default_stop_grace_secs(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                filename: "loadtest.log".to_string(),
            },
        }
    }
}

impl LoadTestConfig {
    /// Defaults, then `loadtest.toml` in the config dir, then `LOADTEST_` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Same layering as [`LoadTestConfig::load`], with an extra required file
    /// applied before the environment overrides.
    pub fn load_with(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = Self::get_config_dir().join("loadtest.toml");

        info!("Loading configuration from: {:?}", config_file);

        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(config_file).required(false));

        if let Some(path) = extra {
            info!("Applying configuration file: {:?}", path);
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        // LOADTEST_TARGET__HOST, LOADTEST_SWARM__USERS, ...
        let settings = builder
            .add_source(
                Environment::with_prefix("LOADTEST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: LoadTestConfig = settings.try_deserialize()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: LoadTestConfig = toml::from_str(s)?;
        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = Self::get_config_dir();
        std::fs::create_dir_all(&config_dir)?;

        let config_file = config_dir.join("loadtest.toml");
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(config_file, toml_string)?;

        Ok(())
    }

    fn get_config_dir() -> PathBuf {
        if let Ok(config_home) = std_env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_home).join("loadtest")
        } else if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".config").join("loadtest")
        } else {
            PathBuf::from("./config")
        }
    }

    /// One user for a few seconds with verbose logs; useful to check that the target is up.
    pub fn smoke() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.swarm.users = 1;
        config.swarm.spawn_rate = 1.0;
        config.swarm.run_time_secs = 10;
        config
    }

    /// Reject values the scenario cannot run with.
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = url::Url::parse(&self.target.host) {
            bail!("target.host {:?} is not a valid URL: {}", self.target.host, e);
        }

        let s = &self.scenario;
        if !(s.wait_min_secs.is_finite() && s.wait_max_secs.is_finite()) {
            bail!("scenario wait bounds must be finite");
        }
        if s.wait_min_secs < 0.0 || s.wait_min_secs > s.wait_max_secs {
            bail!(
                "scenario wait bounds must satisfy 0 <= min <= max (got {}..{})",
                s.wait_min_secs,
                s.wait_max_secs
            );
        }
        let w = s.weights;
        if w.homepage == 0 || w.upload == 0 || w.search == 0 {
            bail!("task weights must be positive integers (got {:?})", w);
        }
        if s.locations.is_empty() {
            bail!("scenario.locations must not be empty");
        }

        if !(self.swarm.spawn_rate.is_finite() && self.swarm.spawn_rate > 0.0) {
            bail!("swarm.spawn_rate must be > 0 (got {})", self.swarm.spawn_rate);
        }
        Ok(())
    }
}

/// 환경 변수 헬퍼 함수들
pub mod env {
    /// Seed from the `SWARM_SEED` environment variable, if set and numeric.
    pub fn swarm_seed() -> Option<u64> {
        std::env::var("SWARM_SEED")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
    }
}

/// `.env` 파일 로드. 설정 자체는 [`LoadTestConfig::load_with`]가 읽는다.
pub fn init() -> Result<()> {
    dotenv::dotenv().ok();
    Ok(())
}

pub fn create_default_config() -> Result<()> {
    let config = LoadTestConfig::default();
    config.save()?;
    info!("Default configuration file created");
    Ok(())
}
