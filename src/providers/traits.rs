//! Quote source trait.
//!
//! A source is the "download" side of a generator: the selection policy
//! calls it whenever a request is not answered from the cache. Errors are
//! passed through to the caller untouched; wrap a source in
//! [`RetryingSource`](super::retry::RetryingSource) for retries.
//!
//! # Example
//!
//! ```ignore
//! struct Fixed;
//!
//! #[async_trait]
//! impl QuoteSource<TextQuote> for Fixed {
//!     fn name(&self) -> &str {
//!         "fixed"
//!     }
//!
//!     async fn download_one(&self, tag: Option<&str>) -> Result<TextQuote> {
//!         if tag.is_some() {
//!             return Err(MimirError::Unsupported("tagged quotes"));
//!         }
//!         Ok(TextQuote::new("1", "Stay hungry."))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::Result;
use crate::types::Quote;

/// Something that can fetch fresh quotes.
#[async_trait]
pub trait QuoteSource<Q: Quote>: Send + Sync {
    /// Source name for routing, logging and metrics.
    fn name(&self) -> &str;

    /// Fetch one quote, restricted to `tag` when given.
    async fn download_one(&self, tag: Option<&str>) -> Result<Q>;

    /// Fetch a batch of quotes, restricted to `tag` when given.
    ///
    /// Default implementation returns a single downloaded quote.
    async fn download_many(&self, tag: Option<&str>) -> Result<Vec<Q>> {
        Ok(vec![self.download_one(tag).await?])
    }
}
