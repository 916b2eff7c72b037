use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::fixture::UserFixture;
use super::{ScenarioDefinition, TaskOutcome};
use crate::response::{RequestOutcome, Verdict};
use crate::session::HttpSession;
use crate::stats::StatsCollector;
use crate::TaskError;

/// How a simulated user's lifetime ended.
#[derive(Debug)]
pub enum UserExit {
    Stopped,
    /// A task returned an error the scenario does not isolate.
    Aborted(TaskError),
    /// The startup hook or session setup failed; no task ran.
    StartupFailed(TaskError),
}

pub struct SimulatedUser {
    pub user_id: Uuid,
    scenario: Arc<ScenarioDefinition>,
    session: Box<dyn HttpSession>,
    fixture: UserFixture,
    rng: ChaCha20Rng,
    stats: StatsCollector,
}

impl SimulatedUser {
    /// Runs the startup hook. The user only exists if the hook succeeded.
    pub fn start(
        user_id: Uuid,
        scenario: Arc<ScenarioDefinition>,
        session: Box<dyn HttpSession>,
        rng: ChaCha20Rng,
        stats: StatsCollector,
    ) -> Result<Self, TaskError> {
        let fixture = scenario.on_start()?;
        debug!(
            "[{}] started, upload fixture present: {}",
            user_id,
            fixture.file_exists()
        );
        stats.user_started();

        Ok(Self {
            user_id,
            scenario,
            session,
            fixture,
            rng,
            stats,
        })
    }

    pub fn fixture(&self) -> &UserFixture {
        &self.fixture
    }

    /// Task loop: pick, run, report, wait. Returns once `stop` flips to true
    /// (checked between tasks and during the wait) or a task fails hard.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> UserExit {
        loop {
            let stopped = *stop.borrow();
            if stopped {
                return UserExit::Stopped;
            }

            if let Err(e) = self.step().await {
                error!("[{}] user aborted: {}", self.user_id, e);
                self.stats.user_aborted();
                return UserExit::Aborted(e);
            }

            let pause = self.scenario.wait_time(&mut self.rng);
            if wait_or_stop(pause, &mut stop).await {
                info!("[{}] stop requested", self.user_id);
                return UserExit::Stopped;
            }
        }
    }

    /// Execute one weighted task selection and report its outcome.
    pub async fn step(&mut self) -> Result<(), TaskError> {
        let task = self.scenario.next_task(&mut self.rng);
        debug!("[{}] running {}", self.user_id, task.name());

        let outcome = task
            .run(self.session.as_ref(), &self.fixture, &mut self.rng)
            .await?;
        self.report(outcome);
        Ok(())
    }

    fn report(&self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Reported(o) => self.stats.record(&o),
            TaskOutcome::Skipped => {}
            TaskOutcome::Isolated { name, reason } => {
                self.stats.isolated_fault();
                if self.scenario.config().report_isolated_faults {
                    warn!("[{}] reporting isolated fault as failure", self.user_id);
                    self.stats.record(&RequestOutcome {
                        name: name.to_string(),
                        status: 0,
                        elapsed: Duration::ZERO,
                        verdict: Verdict::Failure(reason),
                    });
                }
            }
        }
    }
}

/// Sleep for `pause` unless the stop flag is raised first. True means stop.
async fn wait_or_stop(pause: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(pause) => {}
        changed = stop.changed() => {
            // a dropped sender also ends the run
            if changed.is_err() {
                return true;
            }
        }
    }
    let stopped = *stop.borrow();
    stopped
}
