//! Caching subsystem.
//!
//! - [`QuoteCache`]: deduplicating store keyed on [`Quote::id()`], with a
//!   tag index and lazy (tombstone) removal. See [`quote`] module docs for
//!   the arena layout.
//!
//! - [`BlockableCache`]: decorator that can freeze a cache, turning writes
//!   into no-ops or errors while reads keep working.
//!
//! Both implement the capability traits below, so the selection policy can
//! be written against either.

pub mod blockable;
pub mod quote;

pub use blockable::{BlockMode, BlockableCache};
pub use quote::QuoteCache;

use crate::Result;
use crate::types::Quote;

/// Core read/write access to a quote cache.
///
/// Write methods return `Ok(true)` when the cache changed. Removals are
/// lazy: they are applied before the next non-removal call returns.
pub trait Cacheable<Q: Quote>: Send + Sync {
    /// Store `quote`; an existing entry with the same id is only overwritten
    /// when `replace` is set.
    fn cache_quote(&self, quote: Q, replace: bool) -> Result<bool>;

    /// Snapshot of every live quote.
    fn get_cached(&self) -> Vec<Q>;

    /// Uniformly random live quote, optionally removing it.
    ///
    /// Fails with `InvalidState` when the cache is empty.
    fn get_random_quote(&self, remove: bool) -> Result<Q>;

    fn remove_quote(&self, quote: &Q) -> Result<bool>;

    fn remove_quote_by_id(&self, id: &Q::Id) -> Result<bool>;

    fn is_cached(&self, id: &Q::Id) -> bool;

    fn num_cached(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.num_cached() == 0
    }

    fn clear(&self) -> Result<()>;
}

/// Tag-scoped queries. Empty tags are rejected with `InvalidArgument`.
pub trait TagQueryable<Q: Quote>: Send + Sync {
    fn get_cached_by_tag(&self, tag: &str) -> Result<Vec<Q>>;

    /// Union over `tags`, each quote at most once.
    fn get_cached_by_tags(&self, tags: &[&str]) -> Result<Vec<Q>>;

    /// Uniformly random quote carrying `tag`; `None` when there is none.
    fn try_get_random_quote(&self, tag: &str, remove: bool) -> Result<Option<Q>>;

    /// Uniformly random quote carrying any of `tags`.
    fn try_get_random_quote_any(&self, tags: &[&str], remove: bool) -> Result<Option<Q>>;

    /// Remove every quote indexed under `tag`.
    fn remove_quotes(&self, tag: &str) -> Result<bool>;

    fn has_tag(&self, tag: &str) -> bool;

    fn has_any_tag(&self, tags: &[&str]) -> bool;

    /// Every indexed tag, sorted.
    fn tags(&self) -> Vec<String>;
}
