//! Single-source selection policy: cache or download, per request.
//!
//! # Routing
//!
//! ```text
//!                    request (mode, lookup)
//!                             │
//!            ┌────────────────┼───────────────────┐
//!         Cached            Mixed              Download
//!            │                │                   │
//!            │     cache can answer lookup?       │
//!            │        no ──────────────────────►  │
//!            │        yes: coin.determine()       │
//!            │          true ──────────────────►  │
//!            │          false                     │
//!            ▼            ▼                       ▼
//!        read cache ◄─────┘               source.download_one(tag)
//!            │                                    │
//!   hit: return quote                    cache result unless blocked
//!   miss: Cached → InvalidState                   │
//!         Mixed  → download ─────────────────►  return quote
//! ```
//!
//! "Can answer" means non-empty for untagged requests and "at least one
//! cached quote carries one of the tags" for tagged ones. Neither a tag miss
//! nor an empty cache is an error in Mixed mode.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::cache::{BlockableCache, Cacheable, QuoteCache, TagQueryable};
use crate::providers::QuoteSource;
use crate::random::{self, RandomSource};
use crate::select::WeightedCoin;
use crate::telemetry;
use crate::traits::QuoteGenerator;
use crate::types::{Quote, SelectionMode};
use crate::{MimirError, Result};

/// What a request asks for.
#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Any,
    Tag(&'a str),
    Tags(&'a [&'a str]),
}

impl Lookup<'_> {
    fn validate(&self) -> Result<()> {
        let bad = match self {
            Lookup::Any => false,
            Lookup::Tag(tag) => tag.is_empty(),
            Lookup::Tags(tags) => tags.is_empty() || tags.iter().any(|t| t.is_empty()),
        };
        if bad {
            return Err(MimirError::InvalidArgument(format!(
                "malformed tag lookup {self:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Cache,
    Download,
}

impl Route {
    fn as_str(&self) -> &'static str {
        match self {
            Route::Cache => "cache",
            Route::Download => "download",
        }
    }
}

/// One quote source behind a blockable cache, with a weighted coin deciding
/// between the two.
pub struct SelectionPolicy<Q: Quote> {
    source: Arc<dyn QuoteSource<Q>>,
    cache: BlockableCache<Q>,
    coin: WeightedCoin,
    random: Arc<dyn RandomSource>,
}

impl<Q: Quote> SelectionPolicy<Q> {
    /// Empty cache, fair coin, default per-thread generator.
    pub fn new(source: Arc<dyn QuoteSource<Q>>) -> Self {
        Self {
            source,
            cache: BlockableCache::new(QuoteCache::new()),
            coin: WeightedCoin::new(),
            random: random::default_source(),
        }
    }

    pub fn with_cache(mut self, cache: BlockableCache<Q>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_coin(mut self, coin: WeightedCoin) -> Self {
        self.coin = coin;
        self
    }

    /// Generator used to choose one tag of a multi-tag download.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn cache(&self) -> &BlockableCache<Q> {
        &self.cache
    }

    pub fn coin(&self) -> &WeightedCoin {
        &self.coin
    }

    pub fn coin_mut(&mut self) -> &mut WeightedCoin {
        &mut self.coin
    }

    pub async fn get_random_quote(&self, mode: SelectionMode) -> Result<Q> {
        self.serve(mode, Lookup::Any).await
    }

    pub async fn get_random_quote_tagged(&self, tag: &str, mode: SelectionMode) -> Result<Q> {
        self.serve(mode, Lookup::Tag(tag)).await
    }

    pub async fn get_random_quote_tags(&self, tags: &[&str], mode: SelectionMode) -> Result<Q> {
        self.serve(mode, Lookup::Tags(tags)).await
    }

    /// Seed the cache with a batch from the source.
    ///
    /// Returns how many quotes were new to the cache. Nothing is cached
    /// while the cache is blocked.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn prefetch(&self, tag: Option<&str>) -> Result<usize> {
        let quotes = self.timed_download(|| self.source.download_many(tag)).await?;
        if self.cache.is_blocked() {
            debug!(fetched = quotes.len(), "cache blocked, prefetch not stored");
            return Ok(0);
        }
        let mut added = 0;
        for quote in quotes {
            if self.cache.cache_quote(quote, false)? {
                added += 1;
            }
        }
        debug!(added, "prefetched quotes");
        Ok(added)
    }

    #[instrument(skip(self), fields(source = self.source.name()))]
    async fn serve(&self, mode: SelectionMode, lookup: Lookup<'_>) -> Result<Q> {
        lookup.validate()?;

        let answerable = match lookup {
            Lookup::Any => !self.cache.is_empty(),
            Lookup::Tag(tag) => self.cache.has_tag(tag),
            Lookup::Tags(tags) => self.cache.has_any_tag(tags),
        };
        let route = match mode {
            SelectionMode::Cached => Route::Cache,
            SelectionMode::Download => Route::Download,
            SelectionMode::Mixed if !answerable => Route::Download,
            SelectionMode::Mixed if self.coin.determine() => Route::Download,
            SelectionMode::Mixed => Route::Cache,
        };
        debug!(answerable, route = route.as_str(), "routed request");

        if route == Route::Cache {
            if let Some(quote) = self.read_cache(lookup)? {
                self.count(telemetry::CACHE_HITS_TOTAL);
                self.record(Route::Cache, true);
                return Ok(quote);
            }
            self.count(telemetry::CACHE_MISSES_TOTAL);
            if mode == SelectionMode::Cached {
                self.record(Route::Cache, false);
                return Err(MimirError::InvalidState(format!(
                    "no cached quote matches {lookup:?}"
                )));
            }
        } else if !answerable {
            self.count(telemetry::CACHE_MISSES_TOTAL);
        }

        let result = self.download(lookup).await;
        self.record(Route::Download, result.is_ok());
        result
    }

    fn read_cache(&self, lookup: Lookup<'_>) -> Result<Option<Q>> {
        match lookup {
            Lookup::Any => match self.cache.get_random_quote(false) {
                Ok(quote) => Ok(Some(quote)),
                // emptied between the routing check and the read
                Err(MimirError::InvalidState(_)) => Ok(None),
                Err(e) => Err(e),
            },
            Lookup::Tag(tag) => self.cache.try_get_random_quote(tag, false),
            Lookup::Tags(tags) => self.cache.try_get_random_quote_any(tags, false),
        }
    }

    async fn download(&self, lookup: Lookup<'_>) -> Result<Q> {
        let tag = match lookup {
            Lookup::Any => None,
            Lookup::Tag(tag) => Some(tag),
            Lookup::Tags(tags) => Some(tags[self.random.index(tags.len())]),
        };
        let quote = self
            .timed_download(|| self.source.download_one(tag))
            .await?;

        if !self.cache.is_blocked() {
            if let Err(e) = self.cache.cache_quote(quote.clone(), false) {
                warn!(source = self.source.name(), error = %e, "failed to cache downloaded quote");
            }
        }
        Ok(quote)
    }

    async fn timed_download<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = f().await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::DOWNLOADS_TOTAL,
            "source" => self.source.name().to_owned(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::DOWNLOAD_DURATION_SECONDS,
            "source" => self.source.name().to_owned(),
        )
        .record(start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            warn!(source = self.source.name(), error = %e, "download failed");
        }
        result
    }

    fn count(&self, name: &'static str) {
        metrics::counter!(name, "source" => self.source.name().to_owned()).increment(1);
    }

    fn record(&self, route: Route, ok: bool) {
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "source" => self.source.name().to_owned(),
            "route" => route.as_str(),
            "status" => if ok { "ok" } else { "error" },
        )
        .increment(1);
    }
}

#[async_trait]
impl<Q: Quote> QuoteGenerator<Q> for SelectionPolicy<Q> {
    async fn get_random_quote(&self, mode: SelectionMode) -> Result<Q> {
        SelectionPolicy::get_random_quote(self, mode).await
    }

    async fn get_random_quote_tagged(&self, tag: &str, mode: SelectionMode) -> Result<Q> {
        SelectionPolicy::get_random_quote_tagged(self, tag, mode).await
    }

    async fn get_random_quote_tags(&self, tags: &[&str], mode: SelectionMode) -> Result<Q> {
        SelectionPolicy::get_random_quote_tags(self, tags, mode).await
    }
}

impl<Q: Quote> fmt::Debug for SelectionPolicy<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionPolicy")
            .field("source", &self.source.name())
            .field("cache", &self.cache)
            .field("coin", &self.coin)
            .finish_non_exhaustive()
    }
}
