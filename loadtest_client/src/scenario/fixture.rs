use loadtest_env::ScenarioConfig;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::swarm::weighted::WeightedSampler;
use crate::TaskError;

/// Per-user state built once by the startup hook and read-only afterwards.
#[derive(Debug, Clone)]
pub struct UserFixture {
    upload_file_path: PathBuf,
    file_exists: bool,
    locations: WeightedSampler<String>,
}

impl UserFixture {
    /// Startup hook. A missing fixture file only disables uploads; an error
    /// from the existence check itself is returned as [`TaskError::Startup`].
    pub fn on_start(scenario: &ScenarioConfig) -> Result<Self, TaskError> {
        let path = PathBuf::from(&scenario.fixture_path);
        let file_exists = match path.try_exists() {
            Ok(exists) => exists,
            Err(source) => return Err(TaskError::Startup { path, source }),
        };

        if !file_exists {
            warn!(
                "File {} not found! Upload tasks will be skipped.",
                path.display()
            );
        } else {
            debug!("Upload fixture found at {}", path.display());
        }

        Ok(Self {
            upload_file_path: path,
            file_exists,
            locations: WeightedSampler::uniform(scenario.locations.clone())?,
        })
    }

    pub fn upload_file_path(&self) -> &Path {
        &self.upload_file_path
    }

    pub fn file_exists(&self) -> bool {
        self.file_exists
    }

    pub fn candidate_locations(&self) -> &[String] {
        self.locations.items()
    }

    pub fn pick_location<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.locations.sample(rng)
    }
}
