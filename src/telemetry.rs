//! Telemetry metric name constants.
//!
//! Centralised metric names for mimir operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `source`: quote source name (e.g. "kanye", "tronald")
//! - `route`: "cache" or "download", how a request was served
//! - `status`: "ok" or "error"

/// Total quote requests served by a selection policy.
///
/// Labels: `source`, `route`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "mimir_requests_total";

/// Total calls into a quote source.
///
/// Labels: `source`, `status`.
pub const DOWNLOADS_TOTAL: &str = "mimir_downloads_total";

/// Source call duration in seconds.
///
/// Labels: `source`.
pub const DOWNLOAD_DURATION_SECONDS: &str = "mimir_download_duration_seconds";

/// Requests answered from the cache.
///
/// Labels: `source`.
pub const CACHE_HITS_TOTAL: &str = "mimir_cache_hits_total";

/// Requests routed to the source because the cache could not answer.
///
/// Labels: `source`.
pub const CACHE_MISSES_TOTAL: &str = "mimir_cache_misses_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `source`, `operation`.
pub const RETRIES_TOTAL: &str = "mimir_retries_total";

/// Source picks made by a composite generator.
///
/// Labels: `source`.
pub const SOURCE_PICKS_TOTAL: &str = "mimir_source_picks_total";
