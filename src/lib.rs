//! Mimir - random quotes from pluggable sources
//!
//! This crate hands out short text quotes from remote sources, with a
//! tag-indexed deduplicating cache in front of every source and weighted
//! random routing both between cache and source and between sources.
//!
//! # Example
//!
//! ```rust,no_run
//! use mimir::{Mimir, QuoteGenerator, SelectionMode};
//!
//! #[tokio::main]
//! async fn main() -> mimir::Result<()> {
//!     let generator = Mimir::builder()
//!         .kanye(1)
//!         .tronald(1)
//!         .build()?;
//!
//!     let quote = generator.get_random_quote(SelectionMode::Mixed).await?;
//!     println!("{quote}");
//!
//!     // Tags only work on tag-capable sources, so keep kanye.rest out of
//!     // generators that serve tagged requests.
//!     let tagged = Mimir::builder()
//!         .tronald(1)
//!         .build()?
//!         .get_random_quote_tagged("Hillary Clinton", SelectionMode::Download)
//!         .await?;
//!     println!("{tagged}");
//!     Ok(())
//! }
//! ```
//!
//! A generator mixing sources picks the source first. A tagged request that
//! lands on a source without tag support fails with
//! [`MimirError::Unsupported`] unless that source's cache can answer it.
//!
//! # Single source
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mimir::{SelectionMode, SelectionPolicy, TronaldDumpClient, WeightedCoin};
//!
//! let policy = SelectionPolicy::new(Arc::new(TronaldDumpClient::new()))
//!     .with_coin(WeightedCoin::new().bounded(100, 90)?);
//! policy.prefetch(Some("Barack Obama")).await?;
//! let quote = policy.get_random_quote_tagged("Barack Obama", SelectionMode::Cached).await?;
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod providers;
pub mod random;
pub mod select;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use builder::{Mimir, MimirBuilder};
pub use cache::{BlockMode, BlockableCache, Cacheable, QuoteCache, TagQueryable};
pub use config::{CacheOptions, CoinConfig, Config, SourceConfig, SourceKind};
pub use error::{MimirError, Result};
pub use generator::{CompositeBuilder, CompositeGenerator, SelectionPolicy};
pub use providers::{QuoteSource, RetryConfig, RetryingSource};
pub use random::{RandomSource, SeededRandom, SequenceRandom, ThreadRandom};
pub use select::{NamedOption, Pick, WeightedCoin, WeightedOptionSet};
pub use traits::QuoteGenerator;
pub use types::{Quote, SelectionMode, TextQuote};

#[cfg(feature = "kanye")]
pub use providers::KanyeRestClient;
#[cfg(feature = "tronald")]
pub use providers::TronaldDumpClient;
