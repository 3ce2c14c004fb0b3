//! Quote generators.
//!
//! - [`SelectionPolicy`]: one source behind a blockable cache; a weighted
//!   coin picks cache or download per request.
//! - [`CompositeGenerator`]: several policies behind a weighted pick keyed
//!   by source name.

pub mod composite;
pub mod policy;

pub use composite::{CompositeBuilder, CompositeGenerator};
pub use policy::SelectionPolicy;
