//! Builder for configuring generator instances

use std::sync::Arc;

use crate::cache::{BlockableCache, QuoteCache};
use crate::config::{Config, SourceConfig, SourceKind};
use crate::generator::{CompositeGenerator, SelectionPolicy};
use crate::providers::{QuoteSource, RetryConfig, RetryingSource};
use crate::random::RandomSource;
use crate::select::WeightedCoin;
use crate::{MimirError, Result, TextQuote};

/// Main entry point for creating generator instances.
pub struct Mimir;

impl Mimir {
    /// Create a new builder for configuring the generator.
    pub fn builder() -> MimirBuilder {
        MimirBuilder::new()
    }
}

enum SourceEntry {
    Bundled(SourceConfig),
    Custom(Arc<dyn QuoteSource<TextQuote>>, u32),
}

/// Builder for a [`CompositeGenerator<TextQuote>`].
///
/// ```rust,no_run
/// use mimir::{Mimir, SelectionMode};
///
/// # async fn run() -> mimir::Result<()> {
/// let generator = Mimir::builder()
///     .kanye(1)
///     .tronald(3)
///     .coin(100, 80)
///     .build()?;
///
/// let quote = generator.get_random_quote(SelectionMode::Mixed).await?;
/// println!("{quote}");
/// # Ok(())
/// # }
/// ```
pub struct MimirBuilder {
    sources: Vec<SourceEntry>,
    coin_upper_limit: u32,
    coin_step: Option<u32>,
    retry: Option<RetryConfig>,
    throw_if_blocked: bool,
    random: Option<Arc<dyn RandomSource>>,
}

impl MimirBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            coin_upper_limit: crate::select::coin::DEFAULT_UPPER_LIMIT,
            coin_step: None,
            retry: None,
            throw_if_blocked: false,
            random: None,
        }
    }

    /// Start from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::new();
        builder.coin_upper_limit = config.coin.upper_limit;
        builder.coin_step = config.coin.step;
        builder.retry = config.retry.clone();
        builder.throw_if_blocked = config.cache.throw_if_blocked;
        for source in &config.sources {
            builder = builder.source(source.clone());
        }
        builder
    }

    /// Add kanye.rest with the given routing weight.
    pub fn kanye(self, weight: u32) -> Self {
        self.source(SourceConfig::new(SourceKind::Kanye, weight))
    }

    /// Add the Tronald Dump API with the given routing weight.
    pub fn tronald(self, weight: u32) -> Self {
        self.source(SourceConfig::new(SourceKind::Tronald, weight))
    }

    /// Add a bundled source from its configuration.
    pub fn source(mut self, config: SourceConfig) -> Self {
        self.sources.push(SourceEntry::Bundled(config));
        self
    }

    /// Add any source implementation.
    pub fn custom_source(mut self, source: Arc<dyn QuoteSource<TextQuote>>, weight: u32) -> Self {
        self.sources.push(SourceEntry::Custom(source, weight));
        self
    }

    /// Bound every source's coin; `step` is the download threshold.
    pub fn coin(mut self, upper_limit: u32, step: u32) -> Self {
        self.coin_upper_limit = upper_limit;
        self.coin_step = Some(step);
        self
    }

    /// Wrap every source in a [`RetryingSource`].
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Fail writes to a blocked cache instead of skipping them.
    pub fn throw_if_blocked(mut self, throw: bool) -> Self {
        self.throw_if_blocked = throw;
        self
    }

    /// Generator shared by every coin, cache and the source draw.
    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    fn make_coin(&self) -> Result<WeightedCoin> {
        let mut coin = match &self.random {
            Some(random) => WeightedCoin::with_random(random.clone()),
            None => WeightedCoin::new(),
        };
        match self.coin_step {
            Some(step) => coin.bound_with_step(self.coin_upper_limit, step)?,
            None => coin.bound(self.coin_upper_limit)?,
        }
        Ok(coin)
    }

    fn make_policy(
        &self,
        source: Arc<dyn QuoteSource<TextQuote>>,
    ) -> Result<SelectionPolicy<TextQuote>> {
        let source: Arc<dyn QuoteSource<TextQuote>> = match &self.retry {
            Some(config) => {
                let mut retrying = RetryingSource::new(source, config.clone());
                if let Some(random) = &self.random {
                    retrying = retrying.with_random(random.clone());
                }
                Arc::new(retrying)
            }
            None => source,
        };
        let inner = match &self.random {
            Some(random) => QuoteCache::with_random(random.clone()),
            None => QuoteCache::new(),
        };
        let mut policy = SelectionPolicy::new(source)
            .with_cache(BlockableCache::new(inner).throw_if_blocked(self.throw_if_blocked))
            .with_coin(self.make_coin()?);
        if let Some(random) = &self.random {
            policy = policy.with_random(random.clone());
        }
        Ok(policy)
    }

    /// Build the generator.
    pub fn build(self) -> Result<CompositeGenerator<TextQuote>> {
        if self.sources.is_empty() {
            return Err(MimirError::NoSource);
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }

        let mut composite = CompositeGenerator::builder();
        if let Some(random) = &self.random {
            composite = composite.random(random.clone());
        }
        for entry in &self.sources {
            let (source, weight) = match entry {
                SourceEntry::Bundled(config) => (bundled(config)?, config.weight),
                SourceEntry::Custom(source, weight) => (source.clone(), *weight),
            };
            composite = composite.source(self.make_policy(source)?, weight);
        }
        composite.build()
    }
}

impl Default for MimirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn bundled(config: &SourceConfig) -> Result<Arc<dyn QuoteSource<TextQuote>>> {
    #[cfg(any(feature = "kanye", feature = "tronald"))]
    let timeout = std::time::Duration::from_secs(config.timeout_secs);

    match config.kind {
        #[cfg(feature = "kanye")]
        SourceKind::Kanye => {
            use crate::providers::KanyeRestClient;
            Ok(Arc::new(match &config.base_url {
                Some(url) => KanyeRestClient::with_options(url, timeout),
                None => KanyeRestClient::with_options(
                    crate::providers::kanye::DEFAULT_BASE_URL,
                    timeout,
                ),
            }))
        }
        #[cfg(feature = "tronald")]
        SourceKind::Tronald => {
            use crate::providers::TronaldDumpClient;
            Ok(Arc::new(match &config.base_url {
                Some(url) => TronaldDumpClient::with_options(url, timeout),
                None => TronaldDumpClient::with_options(
                    crate::providers::tronald::DEFAULT_BASE_URL,
                    timeout,
                ),
            }))
        }
        #[allow(unreachable_patterns)]
        kind => Err(MimirError::Configuration(format!(
            "source '{}' requires the `{}` feature",
            kind.as_str(),
            kind.as_str()
        ))),
    }
}
