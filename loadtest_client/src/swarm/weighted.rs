use rand::Rng;

use crate::TaskError;

/// Discrete sampler over integer weights.
///
/// Picks index `i` with probability `weight[i] / sum(weights)` by drawing
/// `v` in `[0, total)` and walking the cumulative intervals.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    items: Vec<T>,
    // cumulative upper bounds, strictly increasing
    cumulative: Vec<u64>,
    total: u64,
}

impl<T> WeightedSampler<T> {
    pub fn new(entries: Vec<(T, u32)>) -> Result<Self, TaskError> {
        if entries.is_empty() {
            return Err(TaskError::Config("weighted set must not be empty".into()));
        }

        let mut items = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut acc: u64 = 0;
        for (i, (item, weight)) in entries.into_iter().enumerate() {
            if weight == 0 {
                return Err(TaskError::Config(format!(
                    "weight at position {} must be a positive integer",
                    i
                )));
            }
            acc += weight as u64;
            items.push(item);
            cumulative.push(acc);
        }

        Ok(Self {
            items,
            cumulative,
            total: acc,
        })
    }

    /// Every item equally likely.
    pub fn uniform(items: Vec<T>) -> Result<Self, TaskError> {
        Self::new(items.into_iter().map(|i| (i, 1)).collect())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        let v = rng.gen_range(0..self.total);
        // first bucket whose upper bound is above v
        let idx = self.cumulative.partition_point(|&upper| upper <= v);
        &self.items[idx]
    }

    pub fn probability(&self, index: usize) -> Option<f64> {
        let upper = *self.cumulative.get(index)?;
        let lower = if index == 0 {
            0
        } else {
            self.cumulative[index - 1]
        };
        Some((upper - lower) as f64 / self.total as f64)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}
