//! Tronald Dump API client.
//!
//! See: <https://www.tronalddump.io>. Responses are HAL documents; linked
//! authors and sources live under `_embedded`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::http;
use super::traits::QuoteSource;
use crate::random::{self, RandomSource};
use crate::{MimirError, Result, TextQuote};

/// Default base URL for the Tronald Dump API
pub const DEFAULT_BASE_URL: &str = "https://api.tronalddump.io";

/// Name this source registers under.
pub const SOURCE_NAME: &str = "tronald";

#[derive(Debug, Deserialize)]
struct RawQuote {
    quote_id: String,
    value: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    appeared_at: Option<String>,
    #[serde(default, rename = "_embedded")]
    embedded: Option<QuoteLinks>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteLinks {
    #[serde(default)]
    author: Vec<RawAuthor>,
    #[serde(default)]
    source: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default, rename = "_embedded")]
    embedded: Option<SearchResults>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResults {
    #[serde(default)]
    quotes: Vec<RawQuote>,
}

#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default, rename = "_embedded")]
    embedded: Option<TagList>,
}

#[derive(Debug, Default, Deserialize)]
struct TagList {
    #[serde(default)]
    tag: Vec<String>,
}

impl From<RawQuote> for TextQuote {
    fn from(raw: RawQuote) -> Self {
        let links = raw.embedded.unwrap_or_default();
        let mut quote = TextQuote::new(raw.quote_id, raw.value).with_tags(raw.tags);
        if let Some(author) = links.author.into_iter().next() {
            quote = quote.author(author.name);
        }
        if let Some(url) = links.source.into_iter().find_map(|s| s.url) {
            quote = quote.source_url(url);
        }
        if let Some(at) = raw.appeared_at {
            quote = quote.appeared_at(at);
        }
        quote
    }
}

/// Client for the Tronald Dump API.
///
/// Supports random quotes, tag search and tag listing.
#[derive(Clone)]
pub struct TronaldDumpClient {
    http: Client,
    base_url: String,
    random: Arc<dyn RandomSource>,
}

impl TronaldDumpClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_options(base_url, http::DEFAULT_TIMEOUT)
    }

    pub fn with_options(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: http::client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            random: random::default_source(),
        }
    }

    /// Replace the generator used to pick among tag search results.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Fetch one random quote.
    pub async fn random_quote(&self) -> Result<TextQuote> {
        let url = format!("{}/random/quote", self.base_url);
        let raw: RawQuote = http::get_json(&self.http, &url, &[]).await?;
        Ok(raw.into())
    }

    /// Every quote tagged `tag` (first result page).
    pub async fn search_by_tag(&self, tag: &str) -> Result<Vec<TextQuote>> {
        if tag.is_empty() {
            return Err(MimirError::InvalidArgument("tag must not be empty".into()));
        }
        let url = format!("{}/search/quote", self.base_url);
        let page: SearchPage = http::get_json(&self.http, &url, &[("tag", tag)]).await?;
        let quotes: Vec<TextQuote> = page
            .embedded
            .unwrap_or_default()
            .quotes
            .into_iter()
            .map(TextQuote::from)
            .collect();
        debug!(tag, found = quotes.len(), "tronald tag search");
        Ok(quotes)
    }

    /// Tags known to the API.
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        let url = format!("{}/tag", self.base_url);
        let page: TagPage = http::get_json(&self.http, &url, &[]).await?;
        Ok(page.embedded.unwrap_or_default().tag)
    }
}

impl Default for TronaldDumpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource<TextQuote> for TronaldDumpClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn download_one(&self, tag: Option<&str>) -> Result<TextQuote> {
        let Some(tag) = tag else {
            return self.random_quote().await;
        };
        let mut quotes = self.search_by_tag(tag).await?;
        if quotes.is_empty() {
            return Err(MimirError::EmptyResponse);
        }
        let i = self.random.index(quotes.len());
        Ok(quotes.swap_remove(i))
    }

    async fn download_many(&self, tag: Option<&str>) -> Result<Vec<TextQuote>> {
        match tag {
            Some(tag) => self.search_by_tag(tag).await,
            None => Ok(vec![self.random_quote().await?]),
        }
    }
}
