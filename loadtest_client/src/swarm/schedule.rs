use crate::swarm::seed::rng_for;
use crate::TaskError;
use rand::Rng;

pub type SpawnScheduleMs = Vec<u64>;

/// Generate a constant-rate spawn schedule with optional per-user jitter (in ms).
///
/// Deterministic: fully determined by (global_seed, namespace, user_count, rate, jitter_ms).
/// - global_seed: test seed
/// - namespace: disambiguator for the jitter stream. Use "spawn" if unsure.
/// - user_count: total users to spawn
/// - rate: target users started per second
/// - jitter_ms: uniform random jitter added to each spawn time in [0, jitter_ms]
pub fn spawn_schedule_constant(
    global_seed: u64,
    namespace: &str,
    user_count: u64,
    rate: f64,
    jitter_ms: u64,
) -> Result<SpawnScheduleMs, TaskError> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(TaskError::Config(format!(
            "spawn rate must be > 0 (got {})",
            rate
        )));
    }

    let mut schedule = Vec::with_capacity(user_count as usize);
    // Base deterministic times (no jitter): floor(1000 * i / rate)
    for i in 0..user_count {
        let base_ms = ((i as f64) * 1000.0 / rate).floor() as u64;
        // Per-index RNG to avoid cross-correlation and to isolate jitter stream
        let mut rng = rng_for(global_seed, &format!("spawn/{}/{}", namespace, i));
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..=jitter_ms)
        };
        schedule.push(base_ms + jitter);
    }
    Ok(schedule)
}
