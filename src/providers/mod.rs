//! Quote sources: the trait, the retry decorator and the bundled HTTP clients.

#[cfg(any(feature = "kanye", feature = "tronald"))]
mod http;
#[cfg(feature = "kanye")]
pub mod kanye;
pub mod retry;
pub mod traits;
#[cfg(feature = "tronald")]
pub mod tronald;

#[cfg(any(feature = "kanye", feature = "tronald"))]
pub use http::DEFAULT_TIMEOUT;
#[cfg(feature = "kanye")]
pub use kanye::KanyeRestClient;
pub use retry::{RetryConfig, RetryingSource};
pub use traits::QuoteSource;
#[cfg(feature = "tronald")]
pub use tronald::TronaldDumpClient;
