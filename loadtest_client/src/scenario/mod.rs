//! One simulated user's behavior against the ad platform service: wait policy,
//! weighted task set and the startup hook.

use loadtest_env::ScenarioConfig;
use rand::Rng;
use std::time::Duration;

use crate::response::RequestOutcome;
use crate::session::HttpSession;
use crate::swarm::weighted::WeightedSampler;
use crate::TaskError;

pub mod fixture;
pub mod tasks;
pub mod user;
pub mod wait;

use fixture::UserFixture;
use wait::WaitTime;

/// What a task hands back to the user loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// A request was made and a verdict was decided.
    Reported(RequestOutcome),
    /// Precondition not met, nothing was sent.
    Skipped,
    /// An error was caught at the task boundary and logged.
    Isolated { name: &'static str, reason: String },
}

/// Err ends the simulated user.
pub type TaskResult = Result<TaskOutcome, TaskError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioTask {
    Homepage,
    Upload,
    Search,
}

impl ScenarioTask {
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioTask::Homepage => tasks::HELLO_WORLD,
            ScenarioTask::Upload => tasks::FILE_UPLOAD,
            ScenarioTask::Search => tasks::SEARCH_BY_LOCATION,
        }
    }

    pub async fn run<R: Rng + Send + ?Sized>(
        &self,
        session: &dyn HttpSession,
        fixture: &UserFixture,
        rng: &mut R,
    ) -> TaskResult {
        match self {
            ScenarioTask::Homepage => tasks::hello_world(session).await,
            ScenarioTask::Upload => tasks::upload_file(session, fixture).await,
            ScenarioTask::Search => tasks::get_platform_by_location(session, fixture, rng).await,
        }
    }
}

/// Immutable scenario shared by every user of a run.
#[derive(Debug, Clone)]
pub struct ScenarioDefinition {
    config: ScenarioConfig,
    tasks: WeightedSampler<ScenarioTask>,
    wait: WaitTime,
}

impl ScenarioDefinition {
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, TaskError> {
        let w = config.weights;
        let tasks = WeightedSampler::new(vec![
            (ScenarioTask::Homepage, w.homepage),
            (ScenarioTask::Upload, w.upload),
            (ScenarioTask::Search, w.search),
        ])?;
        let wait = WaitTime::between(config.wait_min_secs, config.wait_max_secs)?;
        if config.locations.is_empty() {
            return Err(TaskError::Config(
                "at least one search location is required".into(),
            ));
        }

        Ok(Self {
            config: config.clone(),
            tasks,
            wait,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn on_start(&self) -> Result<UserFixture, TaskError> {
        UserFixture::on_start(&self.config)
    }

    pub fn next_task<R: Rng + ?Sized>(&self, rng: &mut R) -> ScenarioTask {
        *self.tasks.sample(rng)
    }

    pub fn wait_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.wait.sample(rng)
    }

    pub fn wait_bounds(&self) -> (Duration, Duration) {
        self.wait.bounds()
    }

    /// Selection probability of every task, in declaration order.
    pub fn task_mix(&self) -> Vec<(&'static str, f64)> {
        self.tasks
            .items()
            .iter()
            .enumerate()
            .map(|(i, task)| (task.name(), self.tasks.probability(i).unwrap_or(0.0)))
            .collect()
    }
}
