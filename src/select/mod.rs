//! Weighted random selectors.
//!
//! - [`WeightedCoin`]: biased boolean, used by the selection policy to pick
//!   between the cache and the source.
//! - [`WeightedOptionSet`]: weighted pick among named options, used by the
//!   composite generator to pick a source.

pub mod coin;
pub mod options;

pub use coin::WeightedCoin;
pub use options::{NamedOption, Pick, WeightedOptionSet};
