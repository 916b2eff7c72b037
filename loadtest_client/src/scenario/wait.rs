use rand::Rng;
use std::time::Duration;

use crate::TaskError;

/// Pause between two task executions, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitTime {
    min_secs: f64,
    max_secs: f64,
}

impl WaitTime {
    pub fn between(min_secs: f64, max_secs: f64) -> Result<Self, TaskError> {
        if !(min_secs.is_finite() && max_secs.is_finite()) || min_secs < 0.0 {
            return Err(TaskError::Config(format!(
                "wait time bounds must be finite and non-negative (got {}..{})",
                min_secs, max_secs
            )));
        }
        if min_secs > max_secs {
            return Err(TaskError::Config(format!(
                "wait time min {} is greater than max {}",
                min_secs, max_secs
            )));
        }
        Ok(Self { min_secs, max_secs })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = if (self.max_secs - self.min_secs).abs() < f64::EPSILON {
            self.min_secs
        } else {
            rng.gen_range(self.min_secs..=self.max_secs)
        };
        Duration::from_secs_f64(secs)
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs_f64(self.min_secs),
            Duration::from_secs_f64(self.max_secs),
        )
    }
}
