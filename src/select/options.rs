//! Weighted option set: pick one name with probability proportional to its weight.
//!
//! # Budget model
//!
//! A set starts with a weight budget `max` (default 100). Every registered
//! option takes part of the budget; whatever is left (`remaining`) belongs to
//! a synthetic default option that is never stored in the list but is
//! returned whenever a draw lands in the unallocated tail.
//!
//! ```text
//!   max = 100, options = [c:10, b:20, a:50]       remaining = 20
//!
//!   0         10                30                          80        100
//!   ├── c ────┼──── b ──────────┼──────────── a ────────────┼─ default ┤
//! ```
//!
//! A draw `n` in `[0, max)` selects the first option whose cumulative weight
//! exceeds `n`. Boundaries are disjoint and cover the whole range, so the
//! walk is an exact weighted pick.
//!
//! # Step
//!
//! Each set also carries a `step` used by
//! [`is_above_threshold()`](WeightedOptionSet::is_above_threshold). By default
//! it is derived from the *number* of options (`len / divisor`, divisor 2)
//! and recomputed on every insertion. Setting it explicitly freezes it.

use std::fmt;
use std::sync::Arc;

use crate::random::{self, RandomSource};
use crate::{MimirError, Result};

/// Default weight budget of a new set.
pub const DEFAULT_MAX: u32 = 100;

/// Name reserved for the option absorbing unallocated weight.
pub const DEFAULT_OPTION_NAME: &str = "default";

/// Default divisor for the derived step.
pub const DEFAULT_STEP_DIVISOR: u32 = 2;

/// A name competing for a weighted pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOption {
    name: String,
    weight: u32,
}

impl NamedOption {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

/// Outcome of a weighted draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick<'a> {
    /// Winning option name (the default name when the tail was hit).
    pub name: &'a str,
    /// Weight of the winner; for the default option this is `remaining`.
    pub weight: u32,
    /// Position in the ordered option list. The default option sits one past
    /// the last registered option.
    pub position: usize,
    /// Whether the unallocated tail was hit.
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepRule {
    /// `step = len / divisor`, recomputed on insertion.
    Derived { divisor: u32 },
    /// Set explicitly; insertions leave it alone.
    Frozen,
}

/// Named options with integer weights plus an implicit default option.
///
/// Not internally synchronized: draws take `&self`, mutation takes
/// `&mut self`.
#[derive(Clone)]
pub struct WeightedOptionSet {
    max: u32,
    remaining: u32,
    options: Vec<NamedOption>,
    default_name: String,
    step: usize,
    step_rule: StepRule,
    random: Arc<dyn RandomSource>,
}

impl WeightedOptionSet {
    /// Empty set with a budget of [`DEFAULT_MAX`].
    pub fn new() -> Self {
        Self::with_max(DEFAULT_MAX)
    }

    /// Empty set with the given budget.
    pub fn with_max(max: u32) -> Self {
        Self {
            max,
            remaining: max,
            options: Vec::new(),
            default_name: DEFAULT_OPTION_NAME.to_string(),
            step: 0,
            step_rule: StepRule::Derived {
                divisor: DEFAULT_STEP_DIVISOR,
            },
            random: random::default_source(),
        }
    }

    /// `names.len()` options sharing a budget of [`DEFAULT_MAX`] equally.
    pub fn equal_options<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::equal_options_with_max(names, DEFAULT_MAX)
    }

    /// Options sharing `max` equally; the integer-division remainder is
    /// folded into the last option so nothing is left to the default.
    pub fn equal_options_with_max<I, S>(names: I, max: u32) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let count = u32::try_from(names.len())
            .map_err(|_| MimirError::OutOfRange("too many options".into()))?;
        if count == 0 {
            return Err(MimirError::InvalidArgument(
                "equal_options needs at least one name".into(),
            ));
        }
        let weight = max / count;
        if weight == 0 {
            return Err(MimirError::OutOfRange(format!(
                "budget {max} cannot give {count} options a positive weight"
            )));
        }
        let remainder = max - weight * count;

        let mut set = Self::with_max(max);
        let last = names.len() - 1;
        for (i, name) in names.into_iter().enumerate() {
            let w = if i == last { weight + remainder } else { weight };
            set.add_option(name, w)?;
        }
        Ok(set)
    }

    /// Options all weighted `weight`; the budget becomes `len * weight`.
    pub fn identical_options<I, S>(names: I, weight: u32) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(MimirError::InvalidArgument(
                "identical_options needs at least one name".into(),
            ));
        }
        let max = u32::try_from(names.len())
            .ok()
            .and_then(|n| n.checked_mul(weight))
            .ok_or_else(|| MimirError::OutOfRange("option budget overflows u32".into()))?;

        let mut set = Self::with_max(max);
        for name in names {
            set.add_option(name, weight)?;
        }
        Ok(set)
    }

    /// Replace the random source.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Rename the default option. Fails if the name is empty or already
    /// used by a registered option.
    pub fn with_default_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MimirError::InvalidArgument(
                "default option name must not be empty".into(),
            ));
        }
        if self.contains(&name) {
            return Err(MimirError::InvalidArgument(format!(
                "default option name '{name}' is already a registered option"
            )));
        }
        self.default_name = name;
        Ok(self)
    }

    /// Builder form of [`add_option()`](Self::add_option).
    pub fn with_option(mut self, name: impl Into<String>, weight: u32) -> Result<Self> {
        self.add_option(name, weight)?;
        Ok(self)
    }

    /// Register an option, taking `weight` out of the remaining budget.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: empty name, duplicate name, or the default name
    /// - `InvalidState`: budget already exhausted
    /// - `OutOfRange`: zero weight, or more weight than is left
    pub fn add_option(&mut self, name: impl Into<String>, weight: u32) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(MimirError::InvalidArgument(
                "option name must not be empty".into(),
            ));
        }
        if name == self.default_name {
            return Err(MimirError::InvalidArgument(format!(
                "'{name}' is reserved for the default option"
            )));
        }
        if self.contains(&name) {
            return Err(MimirError::InvalidArgument(format!(
                "option '{name}' is already registered"
            )));
        }
        if self.remaining == 0 {
            return Err(MimirError::InvalidState(format!(
                "weight budget of {} is exhausted",
                self.max
            )));
        }
        if weight == 0 || weight > self.remaining {
            return Err(MimirError::OutOfRange(format!(
                "weight {weight} for '{name}' must be in 1..={}",
                self.remaining
            )));
        }

        self.remaining -= weight;
        // After every option of equal weight, so equal weights keep insertion order.
        let at = self.options.partition_point(|o| o.weight <= weight);
        self.options.insert(at, NamedOption { name, weight });
        self.refresh_step();
        Ok(())
    }

    /// Draw one option.
    ///
    /// Fails with `InvalidState` when the budget is zero.
    pub fn determine(&self) -> Result<Pick<'_>> {
        if self.max == 0 {
            return Err(MimirError::InvalidState(
                "cannot draw from an option set with a zero budget".into(),
            ));
        }
        let n = self.random.next(0, u64::from(self.max));
        Ok(self.pick_at(n))
    }

    /// Resolve a draw `n` in `[0, max)` to its option.
    fn pick_at(&self, n: u64) -> Pick<'_> {
        let mut boundary = 0u64;
        for (position, option) in self.options.iter().enumerate() {
            boundary += u64::from(option.weight);
            if boundary > n {
                return Pick {
                    name: &option.name,
                    weight: option.weight,
                    position,
                    is_default: false,
                };
            }
        }
        Pick {
            name: &self.default_name,
            weight: self.remaining,
            position: self.options.len(),
            is_default: true,
        }
    }

    /// Collapse a weighted draw onto a boolean: `position > step`.
    ///
    /// The result depends on the *position* of the winner in the
    /// ascending-weight list, compared against a step that by default is
    /// `len / 2`. Adding options therefore moves the threshold even when the
    /// weights of the existing options do not change, and two sets with the
    /// same weight distribution but a different number of options behave
    /// differently. Freeze the step with [`set_step()`](Self::set_step)
    /// when this coupling is unwanted.
    pub fn is_above_threshold(&self) -> Result<bool> {
        let pick = self.determine()?;
        Ok(pick.position > self.step)
    }

    /// Change the budget.
    ///
    /// With no options registered the budget moves freely. Otherwise it
    /// cannot drop below what is already allocated (`OutOfRange`).
    pub fn set_max(&mut self, new_max: u32) -> Result<()> {
        if self.options.is_empty() {
            self.max = new_max;
            self.remaining = new_max;
            return Ok(());
        }
        let allocated = self.allocated();
        if new_max < allocated {
            return Err(MimirError::OutOfRange(format!(
                "cannot shrink budget to {new_max}, {allocated} is already allocated"
            )));
        }
        self.remaining = new_max - allocated;
        self.max = new_max;
        Ok(())
    }

    /// Multiply the budget and every weight by `factor`.
    ///
    /// With `scale_step` the step is multiplied too and becomes frozen.
    /// Nothing changes when the call fails.
    pub fn scale(&mut self, factor: u32, scale_step: bool) -> Result<()> {
        if factor == 0 {
            return Err(MimirError::OutOfRange("scale factor must be positive".into()));
        }
        let overflow = || MimirError::OutOfRange(format!("scaling by {factor} overflows u32"));

        let max = self.max.checked_mul(factor).ok_or_else(overflow)?;
        let remaining = self.remaining.checked_mul(factor).ok_or_else(overflow)?;
        let weights = self
            .options
            .iter()
            .map(|o| o.weight.checked_mul(factor))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(overflow)?;
        let step = if scale_step {
            Some(
                self.step
                    .checked_mul(factor as usize)
                    .ok_or_else(overflow)?,
            )
        } else {
            None
        };

        self.max = max;
        self.remaining = remaining;
        for (option, weight) in self.options.iter_mut().zip(weights) {
            option.weight = weight;
        }
        if let Some(step) = step {
            self.step = step;
            self.step_rule = StepRule::Frozen;
        }
        Ok(())
    }

    /// Set the step explicitly; later insertions no longer recompute it.
    pub fn set_step(&mut self, step: usize) {
        self.step = step;
        self.step_rule = StepRule::Frozen;
    }

    /// Derive the step as `len / divisor` again.
    pub fn set_divisor(&mut self, divisor: u32) -> Result<()> {
        if divisor == 0 {
            return Err(MimirError::InvalidArgument(
                "step divisor must be positive".into(),
            ));
        }
        self.step_rule = StepRule::Derived { divisor };
        self.refresh_step();
        Ok(())
    }

    fn refresh_step(&mut self) {
        if let StepRule::Derived { divisor } = self.step_rule {
            self.step = self.options.len() / divisor as usize;
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn allocated(&self) -> u32 {
        self.max - self.remaining
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Whether the step is frozen (set explicitly rather than derived).
    pub fn step_is_frozen(&self) -> bool {
        self.step_rule == StepRule::Frozen
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered options in ascending weight order.
    pub fn options(&self) -> &[NamedOption] {
        &self.options
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&NamedOption> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl Default for WeightedOptionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WeightedOptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedOptionSet")
            .field("max", &self.max)
            .field("remaining", &self.remaining)
            .field("options", &self.options)
            .field("default_name", &self.default_name)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}
