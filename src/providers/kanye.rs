//! kanye.rest client.
//!
//! See: <https://kanye.rest>. The API serves untagged quotes only; the
//! quote text doubles as its identity.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http;
use super::traits::QuoteSource;
use crate::{MimirError, Result, TextQuote};

/// Default base URL for kanye.rest
pub const DEFAULT_BASE_URL: &str = "https://api.kanye.rest";

const AUTHOR: &str = "Kanye West";

/// Name this source registers under.
pub const SOURCE_NAME: &str = "kanye";

#[derive(Deserialize)]
struct KanyeQuote {
    quote: String,
}

/// Client for the kanye.rest API.
#[derive(Clone)]
pub struct KanyeRestClient {
    http: Client,
    base_url: String,
}

impl KanyeRestClient {
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
        }
    }

    /// Fetch one random quote.
    pub async fn random_quote(&self) -> Result<TextQuote> {
        let url = format!("{}/", self.base_url);
        let body: KanyeQuote = http::get_json(&self.http, &url, &[]).await?;
        to_quote(body.quote)
    }

    /// Fetch the full quote list.
    pub async fn all_quotes(&self) -> Result<Vec<TextQuote>> {
        let url = format!("{}/quotes", self.base_url);
        let body: Vec<String> = http::get_json(&self.http, &url, &[]).await?;
        body.into_iter().map(to_quote).collect()
    }
}

fn to_quote(text: String) -> Result<TextQuote> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(MimirError::EmptyResponse);
    }
    Ok(TextQuote::new(text.clone(), text).author(AUTHOR))
}

impl Default for KanyeRestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource<TextQuote> for KanyeRestClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn download_one(&self, tag: Option<&str>) -> Result<TextQuote> {
        if tag.is_some() {
            return Err(MimirError::Unsupported("tagged kanye.rest quotes"));
        }
        self.random_quote().await
    }

    async fn download_many(&self, tag: Option<&str>) -> Result<Vec<TextQuote>> {
        if tag.is_some() {
            return Err(MimirError::Unsupported("tagged kanye.rest quotes"));
        }
        self.all_quotes().await
    }
}
