//! Weighted routing across several selection policies.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, instrument};

use super::SelectionPolicy;
use crate::random::RandomSource;
use crate::select::WeightedOptionSet;
use crate::telemetry;
use crate::traits::QuoteGenerator;
use crate::types::{Quote, SelectionMode};
use crate::{MimirError, Result};

/// Several [`SelectionPolicy`]s behind a weighted pick.
///
/// Every option name in the set must map to a registered policy. A draw
/// landing on an unknown name (the default option included) is a broken
/// invariant and surfaces as [`MimirError::SourceMismatch`]; it is never
/// retried.
pub struct CompositeGenerator<Q: Quote> {
    options: WeightedOptionSet,
    sources: HashMap<String, SelectionPolicy<Q>>,
}

impl<Q: Quote> CompositeGenerator<Q> {
    /// Pair an option set with the policies it names, checking that they
    /// agree.
    pub fn new(
        options: WeightedOptionSet,
        sources: HashMap<String, SelectionPolicy<Q>>,
    ) -> Result<Self> {
        let generator = Self { options, sources };
        generator.validate()?;
        Ok(generator)
    }

    pub fn builder() -> CompositeBuilder<Q> {
        CompositeBuilder::new()
    }

    /// Check that option names and registered policies correspond one to one.
    pub fn validate(&self) -> Result<()> {
        if self.options.is_empty() {
            return Err(MimirError::NoSource);
        }
        if let Some(name) = self.options.names().find(|n| !self.sources.contains_key(*n)) {
            return Err(MimirError::SourceMismatch(format!(
                "option '{name}' has no registered source"
            )));
        }
        if let Some(name) = self
            .sources
            .keys()
            .find(|n| !self.options.contains(n.as_str()))
        {
            return Err(MimirError::SourceMismatch(format!(
                "source '{name}' has no weight in the option set"
            )));
        }
        Ok(())
    }

    /// Draw the policy that serves the next request.
    pub fn pick_source(&self) -> Result<&SelectionPolicy<Q>> {
        let pick = self.options.determine()?;
        match self.sources.get(pick.name) {
            Some(policy) => {
                metrics::counter!(telemetry::SOURCE_PICKS_TOTAL, "source" => pick.name.to_owned())
                    .increment(1);
                debug!(source = pick.name, position = pick.position, "picked source");
                Ok(policy)
            }
            None => {
                error!(
                    option = pick.name,
                    is_default = pick.is_default,
                    "weighted pick named an unregistered source"
                );
                Err(MimirError::SourceMismatch(format!(
                    "picked '{}' but no such source is registered",
                    pick.name
                )))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_random_quote(&self, mode: SelectionMode) -> Result<Q> {
        self.pick_source()?.get_random_quote(mode).await
    }

    /// Tagged request to a weighted pick of source.
    ///
    /// The source is drawn before the tag is looked at, so a source that
    /// cannot serve tags (kanye.rest) still receives its share of tagged
    /// requests and answers them with [`MimirError::Unsupported`] unless its
    /// cache already holds a matching quote. Build a generator from
    /// tag-capable sources only when every tagged request must succeed.
    #[instrument(skip(self))]
    pub async fn get_random_quote_tagged(&self, tag: &str, mode: SelectionMode) -> Result<Q> {
        self.pick_source()?.get_random_quote_tagged(tag, mode).await
    }

    /// Multi-tag variant of
    /// [`get_random_quote_tagged()`](Self::get_random_quote_tagged), with the
    /// same caveat for sources that cannot serve tags.
    #[instrument(skip(self))]
    pub async fn get_random_quote_tags(&self, tags: &[&str], mode: SelectionMode) -> Result<Q> {
        self.pick_source()?.get_random_quote_tags(tags, mode).await
    }

    /// Prefetch into every registered source's cache.
    ///
    /// Returns the number of new quotes per source. Sources that fail are
    /// reported in the map with their error and do not stop the others.
    pub async fn prefetch_all(&self, tag: Option<&str>) -> HashMap<String, Result<usize>> {
        let mut out = HashMap::with_capacity(self.sources.len());
        for (name, policy) in &self.sources {
            out.insert(name.clone(), policy.prefetch(tag).await);
        }
        out
    }

    pub fn options(&self) -> &WeightedOptionSet {
        &self.options
    }

    pub fn source(&self, name: &str) -> Option<&SelectionPolicy<Q>> {
        self.sources.get(name)
    }

    pub fn source_mut(&mut self, name: &str) -> Option<&mut SelectionPolicy<Q>> {
        self.sources.get_mut(name)
    }

    /// Registered source names, sorted.
    pub fn source_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl<Q: Quote> QuoteGenerator<Q> for CompositeGenerator<Q> {
    async fn get_random_quote(&self, mode: SelectionMode) -> Result<Q> {
        CompositeGenerator::get_random_quote(self, mode).await
    }

    async fn get_random_quote_tagged(&self, tag: &str, mode: SelectionMode) -> Result<Q> {
        CompositeGenerator::get_random_quote_tagged(self, tag, mode).await
    }

    async fn get_random_quote_tags(&self, tags: &[&str], mode: SelectionMode) -> Result<Q> {
        CompositeGenerator::get_random_quote_tags(self, tags, mode).await
    }
}

impl<Q: Quote> fmt::Debug for CompositeGenerator<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeGenerator")
            .field("options", &self.options)
            .field("sources", &self.source_names())
            .finish()
    }
}

/// Assembles a [`CompositeGenerator`] from policies and their weights.
///
/// The option budget is the sum of the weights, so the default option never
/// wins a draw.
pub struct CompositeBuilder<Q: Quote> {
    entries: Vec<(SelectionPolicy<Q>, u32)>,
    random: Option<Arc<dyn RandomSource>>,
}

impl<Q: Quote> CompositeBuilder<Q> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            random: None,
        }
    }

    /// Register a policy under its source name.
    pub fn source(mut self, policy: SelectionPolicy<Q>, weight: u32) -> Self {
        self.entries.push((policy, weight));
        self
    }

    /// Generator for the source draw.
    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn build(self) -> Result<CompositeGenerator<Q>> {
        if self.entries.is_empty() {
            return Err(MimirError::NoSource);
        }
        let total = self
            .entries
            .iter()
            .try_fold(0u32, |acc, (_, w)| acc.checked_add(*w))
            .ok_or_else(|| MimirError::OutOfRange("source weights overflow u32".into()))?;

        let mut options = WeightedOptionSet::with_max(total);
        if let Some(random) = self.random {
            options = options.with_random(random);
        }
        let mut sources = HashMap::with_capacity(self.entries.len());
        for (policy, weight) in self.entries {
            let name = policy.source_name().to_owned();
            options.add_option(name.clone(), weight)?;
            sources.insert(name, policy);
        }
        CompositeGenerator::new(options, sources)
    }
}

impl<Q: Quote> Default for CompositeBuilder<Q> {
    fn default() -> Self {
        Self::new()
    }
}
