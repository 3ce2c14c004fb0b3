//! Binary weighted coin.

use std::fmt;
use std::sync::Arc;

use crate::random::{self, RandomSource};
use crate::{MimirError, Result};

/// Default upper bound of a fresh coin.
pub const DEFAULT_UPPER_LIMIT: u32 = 100;

/// Boolean biased by a threshold over an upper bound.
///
/// [`determine()`](Self::determine) draws `n` uniformly from
/// `[1, upper_limit]` and reports `n > step`. So `step == upper_limit`
/// always yields `false`, and the smallest legal step (1) yields `true`
/// with probability `(upper_limit - 1) / upper_limit`.
#[derive(Clone)]
pub struct WeightedCoin {
    upper_limit: u32,
    step: u32,
    random: Arc<dyn RandomSource>,
}

impl WeightedCoin {
    /// A fair coin (`100 / 50`) on the default per-thread generator.
    pub fn new() -> Self {
        Self::with_random(random::default_source())
    }

    /// A fair coin drawing from the given source.
    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        Self {
            upper_limit: DEFAULT_UPPER_LIMIT,
            step: DEFAULT_UPPER_LIMIT / 2,
            random,
        }
    }

    /// Set the upper limit; the step becomes `upper_limit / 2`.
    pub fn bound(&mut self, upper_limit: u32) -> Result<()> {
        self.bound_with_step(upper_limit, upper_limit / 2)
    }

    /// Set both the upper limit and the step.
    ///
    /// Fails with `InvalidArgument` unless `upper_limit >= step >= 1`. On
    /// failure the previous configuration is kept.
    pub fn bound_with_step(&mut self, upper_limit: u32, step: u32) -> Result<()> {
        validate(upper_limit, step)?;
        self.upper_limit = upper_limit;
        self.step = step;
        Ok(())
    }

    /// Builder form of [`bound_with_step()`](Self::bound_with_step).
    pub fn bounded(mut self, upper_limit: u32, step: u32) -> Result<Self> {
        self.bound_with_step(upper_limit, step)?;
        Ok(self)
    }

    pub fn upper_limit(&self) -> u32 {
        self.upper_limit
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Flip the coin.
    pub fn determine(&self) -> bool {
        let n = self
            .random
            .next(1, u64::from(self.upper_limit) + 1);
        n > u64::from(self.step)
    }
}

fn validate(upper_limit: u32, step: u32) -> Result<()> {
    if upper_limit == 0 {
        return Err(MimirError::InvalidArgument(
            "coin upper limit must be at least 1".into(),
        ));
    }
    if step == 0 {
        return Err(MimirError::InvalidArgument(format!(
            "coin step must be at least 1 (upper limit {upper_limit})"
        )));
    }
    if step > upper_limit {
        return Err(MimirError::InvalidArgument(format!(
            "coin step {step} exceeds upper limit {upper_limit}"
        )));
    }
    Ok(())
}

impl Default for WeightedCoin {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WeightedCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedCoin")
            .field("upper_limit", &self.upper_limit)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}
