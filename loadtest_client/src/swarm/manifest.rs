use anyhow::Result;
use chrono::{DateTime, Utc};
use loadtest_env::LoadTestConfig;
use serde::Serialize;
use std::path::Path;

use crate::stats::StatsReport;

#[derive(Debug, Serialize, Default, Clone, PartialEq, Eq)]
pub struct UserExitCounts {
    /// Ran until the stop signal.
    pub stopped: u64,
    /// Loop ended by an unhandled task error.
    pub aborted: u64,
    /// Never reached the task loop (startup hook or session setup failed).
    pub startup_failed: u64,
    /// Still inside a request when the stop grace period ran out.
    pub cancelled: u64,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub seed: u64,
    pub config: LoadTestConfig,
    pub stats: StatsReport,
    pub user_exits: UserExitCounts,
    /// True when the run was cut short by the startup failure policy.
    pub stopped_early: bool,
}

impl RunSummary {
    /// No failed requests and every user ran until stop.
    pub fn passed(&self) -> bool {
        self.stats.total_failures() == 0
            && !self.stopped_early
            && self.user_exits.aborted == 0
            && self.user_exits.startup_failed == 0
    }
}

pub fn save_run_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let payload = serde_json::to_vec_pretty(summary)?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsCollector;

    fn summary(user_exits: UserExitCounts) -> RunSummary {
        RunSummary {
            timestamp: Utc::now(),
            seed: 1,
            config: LoadTestConfig::default(),
            stats: StatsCollector::new().report(),
            user_exits,
            stopped_early: false,
        }
    }

    #[test]
    fn test_aborted_users_fail_the_run() {
        let clean = summary(UserExitCounts {
            stopped: 2,
            ..Default::default()
        });
        assert!(clean.passed());

        let aborted = summary(UserExitCounts {
            aborted: 1,
            ..Default::default()
        });
        assert!(!aborted.passed());

        let startup = summary(UserExitCounts {
            startup_failed: 1,
            ..Default::default()
        });
        assert!(!startup.passed());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.json");
        save_run_summary(&path, &summary(UserExitCounts::default())).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_reports_unwritable_directory() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let path = blocker.path().join("out").join("summary.json");
        let err = save_run_summary(&path, &summary(UserExitCounts::default())).unwrap_err();
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }
}
