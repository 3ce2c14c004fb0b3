//! Public types for the Mimir API.

mod mode;
mod quote;

pub use mode::SelectionMode;
pub use quote::{Quote, TextQuote};
