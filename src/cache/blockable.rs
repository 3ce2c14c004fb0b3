//! Freezable decorator over [`QuoteCache`].
//!
//! While blocked, every write (`cache_quote`, `remove_quote*`,
//! `remove_quotes`, `clear`, and the `remove` flag of random reads) is
//! either skipped (`Ok(false)`) or rejected with `InvalidState`, depending
//! on `throw_if_blocked`. Reads are always delegated.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::{Cacheable, QuoteCache, TagQueryable};
use crate::types::Quote;
use crate::{MimirError, Result};

/// What happens to the cached quotes when a cache is blocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockMode {
    /// Drop every cached quote, then freeze. The cache stays empty until
    /// it is unblocked and written to again.
    #[default]
    Reset,
    /// Freeze with the current contents left readable.
    Retain,
}

/// A [`QuoteCache`] that can be frozen.
pub struct BlockableCache<Q: Quote> {
    inner: QuoteCache<Q>,
    blocked: AtomicBool,
    throw_if_blocked: bool,
}

impl<Q: Quote> BlockableCache<Q> {
    /// Wrap `inner`; writes to a blocked cache are silently skipped.
    pub fn new(inner: QuoteCache<Q>) -> Self {
        Self {
            inner,
            blocked: AtomicBool::new(false),
            throw_if_blocked: false,
        }
    }

    /// Reject writes to a blocked cache with `InvalidState` instead of
    /// skipping them.
    pub fn throw_if_blocked(mut self, throw: bool) -> Self {
        self.throw_if_blocked = throw;
        self
    }

    /// Freeze the cache and clear it ([`BlockMode::Reset`]).
    pub fn block(&self) {
        self.block_with(BlockMode::Reset);
    }

    /// Freeze the cache.
    pub fn block_with(&self, mode: BlockMode) {
        self.blocked.store(true, Ordering::SeqCst);
        if mode == BlockMode::Reset {
            // Straight to the inner cache: the guard would refuse now.
            self.inner.reset();
        }
        info!(?mode, "quote cache blocked");
    }

    pub fn unblock(&self) {
        self.blocked.store(false, Ordering::SeqCst);
        info!("quote cache unblocked");
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    pub fn throws_if_blocked(&self) -> bool {
        self.throw_if_blocked
    }

    /// The wrapped cache, bypassing the freeze.
    pub fn inner(&self) -> &QuoteCache<Q> {
        &self.inner
    }

    /// `Ok(true)` when writes may proceed, `Ok(false)` when they should be
    /// skipped.
    fn writable(&self, operation: &'static str) -> Result<bool> {
        if !self.is_blocked() {
            return Ok(true);
        }
        if self.throw_if_blocked {
            return Err(MimirError::InvalidState(format!(
                "cache is blocked, refusing {operation}"
            )));
        }
        debug!(operation, "write to blocked cache skipped");
        Ok(false)
    }
}

impl<Q: Quote> Cacheable<Q> for BlockableCache<Q> {
    fn cache_quote(&self, quote: Q, replace: bool) -> Result<bool> {
        if !self.writable("cache_quote")? {
            return Ok(false);
        }
        self.inner.cache_quote(quote, replace)
    }

    fn get_cached(&self) -> Vec<Q> {
        self.inner.get_cached()
    }

    fn get_random_quote(&self, remove: bool) -> Result<Q> {
        let remove = remove && self.writable("get_random_quote")?;
        self.inner.get_random_quote(remove)
    }

    fn remove_quote(&self, quote: &Q) -> Result<bool> {
        if !self.writable("remove_quote")? {
            return Ok(false);
        }
        self.inner.remove_quote(quote)
    }

    fn remove_quote_by_id(&self, id: &Q::Id) -> Result<bool> {
        if !self.writable("remove_quote_by_id")? {
            return Ok(false);
        }
        self.inner.remove_quote_by_id(id)
    }

    fn is_cached(&self, id: &Q::Id) -> bool {
        self.inner.is_cached(id)
    }

    fn num_cached(&self) -> usize {
        self.inner.num_cached()
    }

    fn clear(&self) -> Result<()> {
        if self.writable("clear")? {
            self.inner.clear()?;
        }
        Ok(())
    }
}

impl<Q: Quote> TagQueryable<Q> for BlockableCache<Q> {
    fn get_cached_by_tag(&self, tag: &str) -> Result<Vec<Q>> {
        self.inner.get_cached_by_tag(tag)
    }

    fn get_cached_by_tags(&self, tags: &[&str]) -> Result<Vec<Q>> {
        self.inner.get_cached_by_tags(tags)
    }

    fn try_get_random_quote(&self, tag: &str, remove: bool) -> Result<Option<Q>> {
        let remove = remove && self.writable("try_get_random_quote")?;
        self.inner.try_get_random_quote(tag, remove)
    }

    fn try_get_random_quote_any(&self, tags: &[&str], remove: bool) -> Result<Option<Q>> {
        let remove = remove && self.writable("try_get_random_quote_any")?;
        self.inner.try_get_random_quote_any(tags, remove)
    }

    fn remove_quotes(&self, tag: &str) -> Result<bool> {
        if !self.writable("remove_quotes")? {
            return Ok(false);
        }
        self.inner.remove_quotes(tag)
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.inner.has_tag(tag)
    }

    fn has_any_tag(&self, tags: &[&str]) -> bool {
        self.inner.has_any_tag(tags)
    }

    fn tags(&self) -> Vec<String> {
        self.inner.tags()
    }
}

impl<Q: Quote> Default for BlockableCache<Q> {
    fn default() -> Self {
        Self::new(QuoteCache::new())
    }
}

impl<Q: Quote> fmt::Debug for BlockableCache<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockableCache")
            .field("inner", &self.inner)
            .field("blocked", &self.is_blocked())
            .field("throw_if_blocked", &self.throw_if_blocked)
            .finish()
    }
}
