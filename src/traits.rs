//! Core QuoteGenerator trait

use async_trait::async_trait;

use crate::Result;
use crate::types::{Quote, SelectionMode};

/// Anything that hands out random quotes.
///
/// Implemented by [`SelectionPolicy`](crate::SelectionPolicy) (one source
/// behind a cache) and [`CompositeGenerator`](crate::CompositeGenerator)
/// (several policies behind a weighted pick), so callers can switch between
/// single- and multi-source setups without code changes.
#[async_trait]
pub trait QuoteGenerator<Q: Quote>: Send + Sync {
    /// A random quote.
    async fn get_random_quote(&self, mode: SelectionMode) -> Result<Q>;

    /// A random quote carrying `tag`.
    async fn get_random_quote_tagged(&self, tag: &str, mode: SelectionMode) -> Result<Q>;

    /// A random quote carrying any of `tags`.
    async fn get_random_quote_tags(&self, tags: &[&str], mode: SelectionMode) -> Result<Q>;
}
